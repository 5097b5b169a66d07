use std::time::Duration;
use thiserror::Error;

/// Ticker 전체에서 사용하는 오류 타입
#[derive(Error, Debug)]
pub enum TickerError {
    /// Connection, DNS or body read failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured deadline.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// An instrument the source contract requires is absent from the response.
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid quote for {instrument}: {reason}")]
    InvalidQuote { instrument: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// Terminal write failure, or a defect caught while building the table.
    #[error("render error: {0}")]
    Render(String),
}

impl TickerError {
    /// HTTP status code, when the failure came from an upstream response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TickerError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TickerError {
    fn from(err: std::io::Error) -> Self {
        TickerError::Render(err.to_string())
    }
}

impl From<serde_json::Error> for TickerError {
    fn from(err: serde_json::Error) -> Self {
        TickerError::Decode(err.to_string())
    }
}

pub type Result<T, E = TickerError> = std::result::Result<T, E>;
