//! Catalog API client

use std::time::Duration;

use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::track::{CatalogResponse, ResultSet};
use crate::view::ViewQuery;

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("musicui/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one catalog read. The tracks come back in server order.
    pub async fn fetch(&self, query: &ViewQuery) -> Result<ResultSet, CatalogError> {
        let params = request_params(query);
        debug!("catalog: GET {} {:?}", self.endpoint, params);

        let response = self
            .http
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let parsed: CatalogResponse = serde_json::from_slice(&body)?;
        debug!("catalog: {} tracks for {}", parsed.data.len(), query.label());
        Ok(ResultSet::new(parsed.data))
    }
}

/// Query-string pairs for each read.
pub fn request_params(query: &ViewQuery) -> Vec<(&'static str, String)> {
    match query {
        ViewQuery::SearchByName(text) => vec![("filter[name][_contains]", text.clone())],
        ViewQuery::TopTracksOnly => vec![("filter[top_track][_eq]", "true".to_string())],
        ViewQuery::Paged { size, .. } => vec![
            ("limit", size.to_string()),
            ("offset", query.offset().unwrap_or(0).to_string()),
        ],
    }
}

/// Orders catalog responses that may complete out of order.
///
/// Every request takes a number from `issue()`; a response is applied only
/// if `accept()` says it is newer than the last one applied.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    next: u64,
    applied: Option<u64>,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Latest issued number, i.e. the request the view is waiting for.
    pub fn latest(&self) -> u64 {
        self.next
    }

    pub fn accept(&mut self, seq: u64) -> bool {
        match self.applied {
            Some(applied) if seq <= applied => false,
            _ => {
                self.applied = Some(seq);
                true
            }
        }
    }

    /// True while the newest request has not been answered.
    pub fn in_flight(&self) -> bool {
        self.applied.unwrap_or(0) < self.next
    }

    /// Mark a request as answered without applying data (failed fetch).
    pub fn settle(&mut self, seq: u64) {
        if self.applied.map_or(true, |a| seq > a) && seq == self.next {
            self.applied = Some(seq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_search() {
        let p = request_params(&ViewQuery::SearchByName("blue moon".into()));
        assert_eq!(p, vec![("filter[name][_contains]", "blue moon".to_string())]);
    }

    #[test]
    fn test_params_top_tracks() {
        let p = request_params(&ViewQuery::TopTracksOnly);
        assert_eq!(p, vec![("filter[top_track][_eq]", "true".to_string())]);
    }

    #[test]
    fn test_params_paged() {
        let p = request_params(&ViewQuery::Paged { page: 3, size: 10 });
        assert_eq!(
            p,
            vec![("limit", "10".to_string()), ("offset", "20".to_string())]
        );
        let first = request_params(&ViewQuery::Paged { page: 1, size: 10 });
        assert_eq!(first[1], ("offset", "0".to_string()));
    }

    #[test]
    fn test_sequencer_drops_stale_response() {
        let mut seq = FetchSequencer::new();
        let slow = seq.issue();
        let fast = seq.issue();
        assert!(seq.in_flight());
        assert!(seq.accept(fast));
        assert!(!seq.accept(slow));
        assert!(!seq.in_flight());
    }

    #[test]
    fn test_sequencer_in_order() {
        let mut seq = FetchSequencer::new();
        let a = seq.issue();
        assert!(seq.accept(a));
        let b = seq.issue();
        assert!(seq.accept(b));
        assert!(!seq.accept(b));
        assert_eq!(seq.latest(), b);
    }

    #[test]
    fn test_sequencer_settle_failed_latest() {
        let mut seq = FetchSequencer::new();
        let a = seq.issue();
        let b = seq.issue();
        seq.settle(a);
        assert!(seq.in_flight());
        seq.settle(b);
        assert!(!seq.in_flight());
        // a late success for an older request is still discarded
        assert!(!seq.accept(a));
    }
}
