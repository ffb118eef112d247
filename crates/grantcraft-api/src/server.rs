use crate::{create_router, AppState};
use anyhow::{Context, Result};
use grantcraft_core::Settings;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tracing::{info, warn};

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(settings: Settings) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid listen address {}:{}",
                    settings.server.host, settings.server.port
                )
            })?;
        let state = AppState::new(settings)?;
        Ok(Self { state, addr })
    }

    pub fn from_state(state: AppState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state);

        info!("Starting Grantcraft API server on {}", self.addr);

        let listener = bind_listener(self.addr)?;

        info!("Server listening on http://{}", self.addr);
        info!("OpenAPI document at http://{}/api/openapi.json", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("Server stopped");
        Ok(())
    }
}

/// Binds `addr` with address reuse and keepalive. Failing to set either
/// option is logged and does not stop the server.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let socket = if addr.is_ipv6() {
        TcpSocket::new_v6()
    } else {
        TcpSocket::new_v4()
    }?;

    // Reuse addr to improve rebind under restarts
    if let Err(e) = socket.set_reuseaddr(true) {
        warn!("failed to set SO_REUSEADDR on {}: {}", addr, e);
    }
    if let Err(e) = socket.set_keepalive(true) {
        warn!("failed to enable TCP keepalive on {}: {}", addr, e);
    }

    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {}", addr))?;
    Ok(socket.listen(1024)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
