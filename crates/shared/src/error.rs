use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    /// Maps a response status to an error class; `None` for non-error statuses.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=399 => None,
            401 => Some(ErrorCode::Unauthorized),
            403 => Some(ErrorCode::Forbidden),
            404 => Some(ErrorCode::NotFound),
            400 | 422 => Some(ErrorCode::Validation),
            429 => Some(ErrorCode::RateLimited),
            _ => Some(ErrorCode::Internal),
        }
    }
}

/// Failures where the transport never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("request to '{url}' failed: {message}")]
    Connection { url: String, message: String },
    #[error("response body from '{url}' could not be decoded: {message}")]
    Decode { url: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_codes() {
        assert_eq!(ErrorCode::from_status(200), None);
        assert_eq!(ErrorCode::from_status(304), None);
        assert_eq!(ErrorCode::from_status(401), Some(ErrorCode::Unauthorized));
        assert_eq!(ErrorCode::from_status(422), Some(ErrorCode::Validation));
        assert_eq!(ErrorCode::from_status(429), Some(ErrorCode::RateLimited));
        assert_eq!(ErrorCode::from_status(0), Some(ErrorCode::Internal));
        assert_eq!(ErrorCode::from_status(503), Some(ErrorCode::Internal));
    }
}
