//! Error types for monitoring source operations

use std::fmt;

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while talking to the monitoring API
#[derive(Debug)]
pub enum SourceError {
    /// The request could not be sent or the connection failed
    Transport(reqwest::Error),

    /// The API answered with a non-success HTTP status
    Status(u16),

    /// Login was rejected
    AuthenticationFailed(String),

    /// The API returned a JSON-RPC error object
    Api {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// The response body did not have the expected shape
    InvalidResponse(String),

    /// The client could not be constructed
    InvalidConfig(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(err) => write!(f, "monitoring API unreachable: {}", err),
            SourceError::Status(status) => write!(f, "monitoring API returned HTTP {}", status),
            SourceError::AuthenticationFailed(msg) => {
                write!(f, "monitoring API authentication failed: {}", msg)
            }
            SourceError::Api {
                code,
                message,
                data,
            } => match data {
                Some(data) => write!(f, "monitoring API error {}: {} ({})", code, message, data),
                None => write!(f, "monitoring API error {}: {}", code, message),
            },
            SourceError::InvalidResponse(msg) => {
                write!(f, "invalid monitoring API response: {}", msg)
            }
            SourceError::InvalidConfig(msg) => {
                write!(f, "invalid monitoring source configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::InvalidResponse(err.to_string())
        } else {
            SourceError::Transport(err)
        }
    }
}
