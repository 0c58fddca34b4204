use thiserror::Error;

/// Failure of a single catalog read.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("catalog response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Transitions the playback state machine refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// next/previous without a selection that is part of the current results.
    #[error("invalid playback state: {0}")]
    InvalidState(&'static str),
    /// Progress requested against a zero or unknown duration.
    #[error("progress undefined for a zero or unknown duration")]
    DivisionUndefined,
}
