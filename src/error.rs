//! Error types for content fetching and resolution

use thiserror::Error;

/// Failure while talking to the content API or decoding its answer
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to content API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response was missing fields or could not be decoded
    #[error("malformed content API response: {0}")]
    Malformed(String),

    #[error("cursor does not belong to the configured content API: {0}")]
    ForeignCursor(String),
}

impl FetchError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        FetchError::Malformed(msg.into())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// Failure while resolving a single document
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no {kind} document with uid '{uid}'")]
    NotFound { kind: String, uid: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }
}
