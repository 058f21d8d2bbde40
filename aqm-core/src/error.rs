/// Error types for the AQM core library
use thiserror::Error;

/// Main error type for AQM operations.
///
/// Empty results, unknown thresholds and stale selections are not errors;
/// only an unreachable or malformed data source is.
#[derive(Error, Debug)]
pub enum AqmError {
    /// The data source could not be reached or returned malformed data
    #[error("Data unavailable: {reason}")]
    DataUnavailable { reason: String },

    /// A filter value supplied by a caller could not be parsed
    #[error("Unrecognized {kind}: '{value}'")]
    Unrecognized { kind: &'static str, value: String },
}

impl AqmError {
    /// Shorthand for [`AqmError::DataUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        AqmError::DataUnavailable {
            reason: reason.into(),
        }
    }

    /// True for the data-source failure that callers render as "no data".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AqmError::DataUnavailable { .. })
    }
}

impl From<std::io::Error> for AqmError {
    fn from(err: std::io::Error) -> Self {
        AqmError::unavailable(format!("I/O error: {}", err))
    }
}

impl From<csv::Error> for AqmError {
    fn from(err: csv::Error) -> Self {
        AqmError::unavailable(format!("Malformed CSV: {}", err))
    }
}

/// Type alias for Results using AqmError
pub type Result<T> = std::result::Result<T, AqmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_become_data_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: AqmError = io_err.into();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn unrecognized_is_not_unavailable() {
        let err = AqmError::Unrecognized {
            kind: "averaging period",
            value: "Weekly".to_string(),
        };
        assert!(!err.is_unavailable());
        assert_eq!(err.to_string(), "Unrecognized averaging period: 'Weekly'");
    }
}
