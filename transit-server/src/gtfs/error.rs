//! Static schedule error types.

/// Errors loading or querying the static schedule.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GtfsError {
    /// A required table is missing from the data directory
    #[error("GTFS table not found: {path}")]
    MissingTable { path: String },

    /// A table exists but could not be read or parsed
    #[error("failed to read {file}: {message}")]
    Csv { file: String, message: String },

    /// The identifier is valid but nothing in the tables matches it
    #[error("{0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GtfsError::MissingTable {
            path: "data/stops.txt".into(),
        };
        assert_eq!(err.to_string(), "GTFS table not found: data/stops.txt");

        let err = GtfsError::Csv {
            file: "trips.txt".into(),
            message: "missing field `route_id`".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read trips.txt: missing field `route_id`"
        );

        let err = GtfsError::NotFound("No trips found for route: Z".into());
        assert_eq!(err.to_string(), "No trips found for route: Z");
    }
}
