use thiserror::Error;

/// Failure of a single `fetch` after the retry policy is exhausted.
/// Ends the current region's walk; never fatal to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by remote (HTTP 429)")]
    RateLimited,

    #[error("HTTP error status {0}")]
    HttpError(u16),

    #[error("Network error: {0}")]
    Network(String),
}

/// Raised by a `Transport` before any HTTP status is available.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Network(String),
}

impl From<TransportError> for AcquisitionError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout(msg) => AcquisitionError::Timeout(msg),
            TransportError::Network(msg) => AcquisitionError::Network(msg),
        }
    }
}

/// The extractor could not make sense of a fetched page.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    #[error("__NEXT_DATA__ not found")]
    MissingNextData,

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Unexpected data shape: {0}")]
    UnexpectedShape(String),
}
