use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use grantcraft_core::IntegrationsConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use utoipa::ToSchema;

use super::{user_agent, GrantSearch};

pub const SEARCH_PATH: &str = "/v1/api/search2";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct GrantListing {
    pub id: String,
    pub number: String,
    pub title: String,
    pub agency: String,
    /// As published, MM/DD/YYYY.
    pub open_date: Option<String>,
    pub close_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    errorcode: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    #[serde(default)]
    opp_hits: Vec<OppHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OppHit {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    number: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    agency: Option<String>,
    #[serde(default)]
    agency_code: Option<String>,
    #[serde(default)]
    open_date: Option<String>,
    #[serde(default)]
    close_date: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<OppHit> for GrantListing {
    fn from(hit: OppHit) -> Self {
        let id = match hit.id {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            id,
            number: hit.number,
            title: hit.title,
            agency: non_empty(hit.agency)
                .or_else(|| non_empty(hit.agency_code))
                .unwrap_or_default(),
            open_date: non_empty(hit.open_date),
            close_date: non_empty(hit.close_date),
        }
    }
}

/// Maps a raw search2 body to listings.
pub fn parse_listings(body: &str) -> Result<Vec<GrantListing>> {
    let response: SearchResponse =
        serde_json::from_str(body).context("unexpected Grants.gov response shape")?;
    if response.errorcode != 0 {
        return Err(anyhow!(
            "Grants.gov returned error {}: {}",
            response.errorcode,
            response.msg.unwrap_or_default()
        ));
    }
    Ok(response
        .data
        .map(|data| data.opp_hits.into_iter().map(GrantListing::from).collect())
        .unwrap_or_default())
}

pub struct GrantsGovClient {
    client: Client,
    endpoint: String,
}

impl GrantsGovClient {
    pub fn new(config: &IntegrationsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent(config.mailto.as_deref()))
            .build()
            .context("failed to build Grants.gov HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", config.grants_gov_url.trim_end_matches('/'), SEARCH_PATH),
        })
    }
}

#[async_trait]
impl GrantSearch for GrantsGovClient {
    async fn search(&self, keyword: &str, rows: u32) -> Result<Vec<GrantListing>> {
        let body = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "keyword": keyword, "rows": rows }))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let listings = parse_listings(&body)?;
        debug!(keyword, hits = listings.len(), "grants.gov search");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_opp_hits() {
        let body = r#"{
            "errorcode": 0,
            "msg": "Webservice Succeeds",
            "data": {
                "hitCount": 2,
                "oppHits": [
                    {"id": "355719", "number": "PA-24-185", "title": "Research Project Grant (R01)",
                     "agency": "National Institutes of Health", "agencyCode": "HHS-NIH11",
                     "openDate": "05/08/2024", "closeDate": "", "oppStatus": "posted"},
                    {"id": 42, "number": "RFA-X", "title": "Other", "agencyCode": "NSF",
                     "openDate": "01/01/2025", "closeDate": "03/01/2025"}
                ]
            }
        }"#;
        let listings = parse_listings(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "355719");
        assert_eq!(listings[0].agency, "National Institutes of Health");
        assert_eq!(listings[0].close_date, None);
        assert_eq!(listings[1].id, "42");
        assert_eq!(listings[1].agency, "NSF");
        assert_eq!(listings[1].close_date.as_deref(), Some("03/01/2025"));
    }

    #[test]
    fn error_code_is_an_error() {
        assert!(parse_listings(r#"{"errorcode": 3, "msg": "bad keyword"}"#).is_err());
        assert!(parse_listings("<html>").is_err());
    }

    #[test]
    fn missing_data_is_empty() {
        assert!(parse_listings(r#"{"errorcode": 0}"#).unwrap().is_empty());
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let client = GrantsGovClient::new(&IntegrationsConfig {
            grants_gov_url: "http://localhost:9000/".into(),
            ..IntegrationsConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:9000/v1/api/search2");
    }
}
