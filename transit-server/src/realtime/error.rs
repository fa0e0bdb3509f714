//! Realtime feed error types.

/// The feed bytes could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error parsing GTFS-RT data: {message}")]
pub struct DecodeError {
    pub message: String,
}

impl From<prost::DecodeError> for DecodeError {
    fn from(err: prost::DecodeError) -> Self {
        DecodeError {
            message: err.to_string(),
        }
    }
}

/// Errors fetching a feed from upstream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Network failure, timeout, or unreadable body
    #[error("{0}")]
    Http(String),

    /// Upstream answered with a non-success status
    #[error("HTTP error: {0}")]
    Status(u16),

    /// The HTTP client could not be built
    #[error("client setup failed: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Http(format!("request timed out: {err}"))
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FetchError::Status(503);
        assert_eq!(err.to_string(), "HTTP error: 503");

        let err = DecodeError {
            message: "invalid wire type".into(),
        };
        assert_eq!(
            err.to_string(),
            "Error parsing GTFS-RT data: invalid wire type"
        );
    }
}
