//! Error types for the imputation engine

use thiserror::Error;

/// Result type alias for imputation operations
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Main error type for the imputation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImputeError {
    #[error("Empty input: table has {rows} rows and {columns} columns")]
    EmptyInput { rows: usize, columns: usize },

    #[error("Unknown strategy '{0}' (expected one of: mean, median, mode, knn, iterative, mice)")]
    UnknownStrategy(String),

    #[error(
        "Insufficient neighbors for column '{column}' at row {row}: need {required}, found {available} candidate rows"
    )]
    InsufficientNeighbors {
        column: String,
        row: usize,
        required: usize,
        available: usize,
    },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Cannot convert column '{column}': {reason}")]
    KindConversion { column: String, reason: String },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ImputeError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: &str,
    ) -> Self {
        ImputeError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for ImputeError {
    fn from(err: serde_json::Error) -> Self {
        ImputeError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImputeError::EmptyInput { rows: 0, columns: 3 };
        assert_eq!(err.to_string(), "Empty input: table has 0 rows and 3 columns");
    }

    #[test]
    fn test_insufficient_neighbors_names_column() {
        let err = ImputeError::InsufficientNeighbors {
            column: "income".to_string(),
            row: 4,
            required: 3,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("income"));
        assert!(msg.contains("need 3"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ImputeError = json_err.into();
        assert!(matches!(err, ImputeError::SerializationError(_)));
    }
}
