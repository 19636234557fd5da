//! Error types for the reedit pipeline.

use thiserror::Error;

/// Result type alias using reedit's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reedit operations.
///
/// Model responses that are not valid JSON are never an error; they are
/// stored as [`crate::ModelResponse::Raw`]. Everything here aborts the
/// current run.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found (upstream record file, shard directory)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (missing column, missing upstream field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Image decode or encode failed
    #[error("Image error: {0}")]
    Image(String),

    /// Shard table could not be read
    #[error("Shard error: {0}")]
    Shard(String),

    /// Two collections that are zipped by position have different lengths
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A record does not belong to the table row it is paired with
    #[error("Correlation error: {0}")]
    Correlation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Serialization(format!("invalid base64: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("output/_1_difference/00000.jsonal".to_string());
        assert_eq!(
            err.to_string(),
            "Not found: output/_1_difference/00000.jsonal"
        );
    }

    #[test]
    fn test_error_display_length_mismatch() {
        let err = Error::LengthMismatch {
            what: "source/target columns".to_string(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Length mismatch for source/target columns: expected 3, got 2"
        );
    }

    #[test]
    fn test_error_display_correlation() {
        let err = Error::Correlation("row 4 source differs".to_string());
        assert_eq!(err.to_string(), "Correlation error: row 4 source differs");
    }

    #[test]
    fn test_error_display_image() {
        let err = Error::Image("unsupported format".to_string());
        assert_eq!(err.to_string(), "Image error: unsupported format");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>(r#"{"invalid": json}"#);
        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_from_base64_error() {
        use base64::Engine;
        let decode_err = base64::engine::general_purpose::STANDARD
            .decode("not base64!!")
            .unwrap_err();
        let err: Error = decode_err.into();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
