use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use grantcraft_core::{IntegrationsConfig, VerificationResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{user_agent, ReferenceVerifier};

/// Crossref relevance score at or above which a bibliographic match counts.
pub const MATCH_THRESHOLD: f64 = 60.0;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    message: T,
}

#[derive(Debug, Deserialize)]
struct WorkList {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Work {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Vec<String>,
    pub score: Option<f64>,
}

pub struct CrossrefVerifier {
    client: Client,
    base_url: Url,
    mailto: Option<String>,
}

impl CrossrefVerifier {
    pub fn new(config: &IntegrationsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent(config.mailto.as_deref()))
            .build()
            .context("failed to build Crossref HTTP client")?;
        let base_url = Url::parse(config.crossref_url.trim_end_matches('/'))
            .with_context(|| format!("invalid Crossref URL: {}", config.crossref_url))?;
        Ok(Self {
            client,
            base_url,
            mailto: config.mailto.clone(),
        })
    }

    fn works_url(&self, doi: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Crossref URL cannot be a base"))?;
            segments.pop_if_empty().push("works");
            if let Some(doi) = doi {
                segments.push(doi);
            }
        }
        if let Some(mailto) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }
        Ok(url)
    }

    async fn by_doi(&self, doi: &str) -> Result<Option<Work>> {
        let response = self.client.get(self.works_url(Some(doi))?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: Envelope<Work> = response.error_for_status()?.json().await?;
        Ok(Some(envelope.message))
    }

    async fn by_query(&self, citation: &str) -> Result<Option<Work>> {
        let mut url = self.works_url(None)?;
        url.query_pairs_mut()
            .append_pair("query.bibliographic", citation)
            .append_pair("rows", "1");
        let envelope: Envelope<WorkList> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.message.items.into_iter().next())
    }
}

/// Verified when the relevance score clears [`MATCH_THRESHOLD`] or the work
/// carries the DOI the citation asked for.
pub fn to_verification(work: Option<Work>, requested_doi: Option<&str>) -> VerificationResult {
    let Some(work) = work else {
        return VerificationResult {
            verified: false,
            matched_title: None,
            doi: None,
            score: 0.0,
            checked_at: Utc::now(),
        };
    };

    let doi = work.doi.map(|d| d.to_lowercase());
    let doi_matches = match (requested_doi, doi.as_deref()) {
        (Some(requested), Some(found)) => requested.eq_ignore_ascii_case(found),
        _ => false,
    };
    let score = work.score.unwrap_or(if doi_matches { 100.0 } else { 0.0 });

    VerificationResult {
        verified: doi_matches || score >= MATCH_THRESHOLD,
        matched_title: work.title.into_iter().next(),
        doi,
        score,
        checked_at: Utc::now(),
    }
}

#[async_trait]
impl ReferenceVerifier for CrossrefVerifier {
    async fn verify(&self, citation: &str, doi: Option<&str>) -> Result<VerificationResult> {
        let work = match doi {
            Some(doi) => match self.by_doi(doi).await? {
                Some(work) => Some(work),
                // An unknown DOI may still be a typo in an otherwise real citation.
                None => self.by_query(citation).await?,
            },
            None => self.by_query(citation).await?,
        };
        let result = to_verification(work, doi);
        debug!(verified = result.verified, score = result.score, "crossref lookup");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CrossrefVerifier {
        CrossrefVerifier::new(&IntegrationsConfig {
            mailto: Some("lab@example.org".into()),
            ..IntegrationsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn works_urls_escape_the_doi() {
        let v = verifier();
        let url = v.works_url(Some("10.1000/xyz123")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.crossref.org/works/10.1000%2Fxyz123?mailto=lab%40example.org"
        );
        assert_eq!(
            v.works_url(None).unwrap().path(),
            "/works"
        );
    }

    #[test]
    fn score_threshold_decides_bibliographic_matches() {
        let work = |score| Work {
            doi: Some("10.1/ABC".into()),
            title: vec!["A study".into()],
            score: Some(score),
        };
        assert!(to_verification(Some(work(72.5)), None).verified);
        let weak = to_verification(Some(work(31.0)), None);
        assert!(!weak.verified);
        assert_eq!(weak.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(weak.matched_title.as_deref(), Some("A study"));
    }

    #[test]
    fn doi_match_verifies_regardless_of_score() {
        let work = Work {
            doi: Some("10.1/ABC".into()),
            title: vec![],
            score: None,
        };
        let result = to_verification(Some(work), Some("10.1/abc"));
        assert!(result.verified);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn nothing_found_is_unverified() {
        let result = to_verification(None, Some("10.1/abc"));
        assert!(!result.verified);
        assert!(result.matched_title.is_none());
    }
}
