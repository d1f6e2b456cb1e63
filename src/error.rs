//! Error types for the flood-forecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while building or running forecasting models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Length mismatch between two flat sequences.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// An array argument does not have the shape the operation requires.
    #[error("shape mismatch for {name}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// Index out of bounds (series identity outside the embedding table, etc.).
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ForecastError {
    /// Shorthand for a [`ForecastError::ShapeMismatch`].
    pub(crate) fn shape(name: &'static str, expected: &[usize], got: &[usize]) -> Self {
        ForecastError::ShapeMismatch {
            name,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::ComputationError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}

/// Fail with a [`ForecastError::ShapeMismatch`] unless `got == expected`.
pub(crate) fn ensure_shape(name: &'static str, expected: &[usize], got: &[usize]) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(ForecastError::shape(name, expected, got))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = ForecastError::InvalidParameter("hidden_dim must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid parameter: hidden_dim must be positive"
        );

        let err = ForecastError::shape("x", &[1, 4, 3], &[1, 4, 2]);
        assert_eq!(
            err.to_string(),
            "shape mismatch for x: expected [1, 4, 3], got [1, 4, 2]"
        );

        let err = ForecastError::IndexOutOfBounds { index: 7, size: 3 };
        assert_eq!(err.to_string(), "index out of bounds: 7 (size: 3)");
    }

    #[test]
    fn ensure_shape_accepts_equal_shapes_only() {
        assert!(ensure_shape("state", &[2, 3, 4], &[2, 3, 4]).is_ok());
        assert!(matches!(
            ensure_shape("state", &[2, 3, 4], &[2, 4, 3]),
            Err(ForecastError::ShapeMismatch { name: "state", .. })
        ));
    }

    #[test]
    fn serde_errors_become_config_errors() {
        let err: ForecastError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ForecastError::Config(_)));
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::EmptyData;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
