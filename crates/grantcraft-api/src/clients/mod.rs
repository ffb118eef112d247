//! Outbound integrations. Each one sits behind a trait so handlers can be
//! exercised without the network.

pub mod crossref;
pub mod grants_gov;

pub use crossref::CrossrefVerifier;
pub use grants_gov::{GrantListing, GrantsGovClient};

use async_trait::async_trait;
use grantcraft_core::VerificationResult;

#[async_trait]
pub trait ReferenceVerifier: Send + Sync {
    /// Looks `citation` up, by `doi` when one is known.
    async fn verify(&self, citation: &str, doi: Option<&str>) -> anyhow::Result<VerificationResult>;
}

#[async_trait]
pub trait GrantSearch: Send + Sync {
    async fn search(&self, keyword: &str, rows: u32) -> anyhow::Result<Vec<GrantListing>>;
}

pub(crate) fn user_agent(mailto: Option<&str>) -> String {
    match mailto {
        Some(mailto) => format!("grantcraft/{} (mailto:{})", env!("CARGO_PKG_VERSION"), mailto),
        None => format!("grantcraft/{}", env!("CARGO_PKG_VERSION")),
    }
}
