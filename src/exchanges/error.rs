use std::time::Duration;
use thiserror::Error;

/// Errors raised by price feeds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Symbol does not match `base[:/-_]?quote`
    #[error("invalid ticker symbol format: {0:?}")]
    InvalidSymbol(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("bad price data: {0}")]
    Parse(String),
    #[error("invalid polling interval: {0:?}")]
    InvalidInterval(Duration),
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        FeedError::Http(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Connection(error.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(error: serde_json::Error) -> Self {
        FeedError::Parse(error.to_string())
    }
}
