//! Aggregation service error types.

use std::sync::Arc;

use serde::Serialize;

use crate::gtfs::GtfsError;
use crate::realtime::{DecodeError, FetchError};

/// Errors returned by the aggregation service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Unknown feed id, alert type or accessibility data type
    #[error("{0}")]
    InvalidInput(String),

    /// The station or route does not exist in the static schedule
    #[error("{0}")]
    NotFound(String),

    /// Network failure, timeout or non-success status from upstream
    #[error("{0}")]
    Upstream(String),

    /// Upstream body could not be decoded
    #[error("{0}")]
    Decode(String),

    /// Static tables or upstream JSON could not be read
    #[error("{0}")]
    DataSource(String),

    /// Unexpected failure of a composed lookup
    #[error("{context}: {source}")]
    Failed {
        context: &'static str,
        source: Box<ServiceError>,
    },
}

/// Serializable error record handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ServiceError {
    /// Error record for this error. Unexpected failures carry their cause
    /// as `trace`.
    pub fn payload(&self) -> ErrorPayload {
        let trace = match self {
            ServiceError::Failed { source, .. } => Some(format!("{source:?}")),
            _ => None,
        };
        ErrorPayload {
            error: self.to_string(),
            trace,
        }
    }

    /// Mark an upstream or data failure as an unexpected failure of
    /// `context`. Input and not-found errors pass through.
    pub(super) fn in_context(self, context: &'static str) -> Self {
        match self {
            ServiceError::InvalidInput(_)
            | ServiceError::NotFound(_)
            | ServiceError::Failed { .. } => self,
            source => ServiceError::Failed {
                context,
                source: Box::new(source),
            },
        }
    }
}

impl From<GtfsError> for ServiceError {
    fn from(err: GtfsError) -> Self {
        match err {
            GtfsError::NotFound(message) => ServiceError::NotFound(message),
            other => ServiceError::DataSource(other.to_string()),
        }
    }
}

impl From<DecodeError> for ServiceError {
    fn from(err: DecodeError) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

/// Recover the error shared among waiters of one cache load.
impl From<Arc<ServiceError>> for ServiceError {
    fn from(err: Arc<ServiceError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(|shared| (*shared).clone())
    }
}
