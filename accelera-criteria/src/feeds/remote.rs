//! Remote criteria API (feed B)
//!
//! GET `{base_url}/api/programs/{programId}/criteria` for a program view,
//! GET `{base_url}/api/criteria` for the unscoped view. The response may be
//! a bare array or `{ "criteria": [...] }`. No retries: a failed request is
//! reported to the caller, which treats it as zero records.

use super::CriteriaFeed;
use accelera_common::criteria::raw_list_from_value;
use accelera_common::{FeedSource, ProgramId, RawCriterion};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the application backend's criteria endpoints
pub struct RemoteFeed {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteFeed {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> crate::error::Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            crate::error::Error::BadRequest(format!("Invalid remote base URL {}: {}", base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("accelera-criteria/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Endpoint for a program (or the unscoped list)
    ///
    /// The program id becomes a single, percent-encoded path segment.
    pub fn endpoint(&self, program: Option<&ProgramId>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("Remote base URL cannot have a path: {}", self.base_url))?;
            segments.pop_if_empty();
            match program {
                Some(program) => {
                    segments.extend(["api", "programs", program.canonical().as_str(), "criteria"]);
                }
                None => {
                    segments.extend(["api", "criteria"]);
                }
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl CriteriaFeed for RemoteFeed {
    fn source(&self) -> FeedSource {
        FeedSource::Remote
    }

    async fn fetch(&self, program: Option<&ProgramId>) -> Result<Vec<RawCriterion>> {
        let url = self.endpoint(program)?;
        debug!(url = %url, "Fetching remote criteria");

        let payload: Value = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Remote criteria endpoint {} returned an error", url))?
            .json()
            .await
            .with_context(|| format!("Remote criteria from {} are not JSON", url))?;

        Ok(raw_list_from_value(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(base: &str) -> RemoteFeed {
        RemoteFeed::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_program_endpoint() {
        let url = feed("http://127.0.0.1:5000").endpoint(Some(&ProgramId::from(42))).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/programs/42/criteria");
    }

    #[test]
    fn test_unscoped_endpoint_with_base_path() {
        let url = feed("http://backend.local/v2/").endpoint(None).unwrap();
        assert_eq!(url.as_str(), "http://backend.local/v2/api/criteria");
    }

    #[test]
    fn test_program_id_is_encoded_as_one_segment() {
        let url = feed("http://backend.local")
            .endpoint(Some(&ProgramId::from("spring/2026")))
            .unwrap();
        assert_eq!(url.as_str(), "http://backend.local/api/programs/spring%2F2026/criteria");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(RemoteFeed::new("not a url", Duration::from_secs(1)).is_err());
    }
}
