use thiserror::Error;

#[derive(Debug, Error)]
pub enum EarshotError {
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("session expired, log in again")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server unavailable (status {0}), it may still be starting up")]
    ServerUnavailable(u16),
}

impl EarshotError {
    /// Failures worth retrying: the request never got a usable answer.
    pub fn is_transient(&self) -> bool {
        matches!(self, EarshotError::Network(_) | EarshotError::Timeout(_))
    }
}

pub type EarshotResult<T> = Result<T, EarshotError>;
