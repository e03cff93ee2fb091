use thiserror::Error;

/// token-analyzer error types
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Failed to parse JSON/JSONL
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Bill store operation failed
    #[error("store error: {0}")]
    Store(String),

    /// KPLC API call failed
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Meter number rejected before any lookup
    #[error("invalid meter number: {0:?}")]
    InvalidMeter(String),
}

/// Result type alias for token-analyzer
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Why a raw transaction timestamp could not be placed on the local clock.
///
/// Never surfaced to callers of the analytics core: a failing transaction is
/// dropped from every period bucket and the fold continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("missing timestamp")]
    Missing,

    #[error("invalid timestamp: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalyzerError::Parse("invalid json".into());
        assert_eq!(err.to_string(), "parse error: invalid json");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AnalyzerError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn test_invalid_meter_display_quotes_value() {
        let err = AnalyzerError::InvalidMeter("../etc".into());
        assert_eq!(err.to_string(), "invalid meter number: \"../etc\"");
    }

    #[test]
    fn test_timestamp_error_display() {
        assert_eq!(TimestampError::Missing.to_string(), "missing timestamp");
        assert_eq!(
            TimestampError::Invalid("yesterday".into()).to_string(),
            "invalid timestamp: yesterday"
        );
    }
}
