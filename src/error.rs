//! Unified error hierarchy for stridemetrics
//!
//! Absence of data is normally reported as an empty result rather than an
//! error; the types here cover the cases a caller has to act on.

use thiserror::Error;

/// Top-level error type for all stridemetrics operations
#[derive(Debug, Error)]
pub enum StrideError {
    /// Calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Calculation errors
#[derive(Debug, Error)]
pub enum CalculationError {
    /// Insufficient data for calculation
    #[error("Insufficient data for {calculation}: {reason}")]
    InsufficientData { calculation: String, reason: String },

    /// Streams of one activity with different lengths
    #[error("Stream length mismatch in {calculation}: expected {expected}, got {actual}")]
    LengthMismatch {
        calculation: String,
        expected: usize,
        actual: usize,
    },
}

impl CalculationError {
    pub fn insufficient_data(calculation: &str, reason: impl Into<String>) -> Self {
        CalculationError::InsufficientData {
            calculation: calculation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for stridemetrics operations
pub type Result<T> = std::result::Result<T, StrideError>;

impl StrideError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StrideError::Calculation(CalculationError::InsufficientData { .. }) => {
                ErrorSeverity::Warning
            }
            StrideError::Validation(_) => ErrorSeverity::Warning,
            StrideError::Configuration(_) => ErrorSeverity::Error,
            StrideError::Io(_) | StrideError::Serialization(_) => ErrorSeverity::Error,
            StrideError::Calculation(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            StrideError::Calculation(CalculationError::InsufficientData {
                calculation, ..
            }) => {
                format!(
                    "Not enough data to calculate {}. The activity is missing the required streams.",
                    calculation
                )
            }
            StrideError::Configuration(reason) => {
                format!("Invalid configuration: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = StrideError::from(CalculationError::insufficient_data(
            "route curve",
            "distance stream is empty",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = StrideError::Configuration("atl_time_constant=0".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_user_messages() {
        let err = StrideError::from(CalculationError::insufficient_data(
            "route curve",
            "distance stream is empty",
        ));
        assert!(err.user_message().contains("Not enough data to calculate route curve"));

        let err = StrideError::Validation("bad input".to_string());
        assert_eq!(err.user_message(), "Validation error: bad input");
    }
}
