use thiserror::Error;

/// Failures surfaced by the API transport.
///
/// None of these are fatal to a page: the table keeps its last good rows
/// and the caller decides whether to report the error.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, DashError>;
