use thiserror::Error;

/// Top-level error type for the Sotto system.
///
/// Each variant wraps a subsystem-specific failure as a message string.
/// Subsystem crates construct the matching variant at the point where an
/// external error is caught, so `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SottoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Microphone access denied: {0}")]
    Permission(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    /// The speech model could not be constructed, including the fallback
    /// attempt. This is the one error the startup pre-warm treats as fatal.
    #[error("Transcription unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Injection error: {0}")]
    Injection(String),

    #[error("Hotkey error: {0}")]
    Hotkey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for SottoError {
    fn from(err: toml::de::Error) -> Self {
        SottoError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SottoError {
    fn from(err: toml::ser::Error) -> Self {
        SottoError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Sotto operations.
pub type Result<T> = std::result::Result<T, SottoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SottoError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(SottoError, &str)> = vec![
            (
                SottoError::Audio("device busy".to_string()),
                "Audio error: device busy",
            ),
            (
                SottoError::Permission("microphone blocked".to_string()),
                "Microphone access denied: microphone blocked",
            ),
            (
                SottoError::Transcription("inference failed".to_string()),
                "Transcription error: inference failed",
            ),
            (
                SottoError::ModelUnavailable("no backend".to_string()),
                "Transcription unavailable: no backend",
            ),
            (
                SottoError::Injection("send failed".to_string()),
                "Injection error: send failed",
            ),
            (
                SottoError::Hotkey("register failed".to_string()),
                "Hotkey error: register failed",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SottoError = io_err.into();
        assert!(matches!(err, SottoError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let err: SottoError = parsed.unwrap_err().into();
        assert!(matches!(err, SottoError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
