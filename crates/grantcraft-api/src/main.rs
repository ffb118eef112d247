use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grantcraft_api::{auth, Server};
use grantcraft_core::ConfigManager;
use secrecy::ExposeSecret;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "grantcraft",
    version,
    about = "Grantcraft - NIH/SBIR/STTR application assistant API"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, global = true, env = "GRANTCRAFT_CONFIG_DIR", help = "Configuration directory")]
    config_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "GRANTCRAFT_ENV", help = "Environment name (development, production, ...)")]
    env: Option<String>,

    #[arg(long, global = true, help = "Override server.host")]
    host: Option<String>,

    #[arg(long, global = true, help = "Override server.port")]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Write a default.toml into the configuration directory")]
    InitConfig,

    #[command(about = "Issue a bearer token signed with secrets.jwt_secret")]
    Token {
        #[arg(long, help = "User id; a new one is generated when omitted")]
        user: Option<Uuid>,

        #[arg(long, default_value_t = 24, help = "Validity in hours")]
        hours: i64,
    },
}

fn init_tracing(level: &str) {
    let fallback = format!(
        "grantcraft_api={level},grantcraft_ai={level},grantcraft_core={level},tower_http={level}"
    );
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::InitConfig) = cli.command {
        let dir = ConfigManager::get_config_dir(cli.config_dir);
        let path = ConfigManager::write_default(&dir)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let mut settings = ConfigManager::load(cli.config_dir, cli.env)?.into_settings();
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    settings.validate()?;

    match cli.command {
        Some(Commands::Token { user, hours }) => {
            let secret = settings
                .secrets
                .jwt_secret
                .as_ref()
                .context("secrets.jwt_secret is not configured")?;
            let user = user.unwrap_or_else(Uuid::new_v4);
            let token = auth::issue_token(
                secret.expose_secret().as_bytes(),
                user,
                chrono::Duration::hours(hours),
            )
            .map_err(|e| anyhow::anyhow!("{}", e))?;
            println!("{}", token);
            Ok(())
        }
        _ => {
            init_tracing(&settings.logging.level);
            info!(env = %settings.env, "configuration loaded");

            Server::new(settings)?.run().await
        }
    }
}
