//! Error types for Verba.

use alloc::string::String;
use core::fmt;

/// Result type alias for Verba operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Verba verbs and operator setup.
///
/// Every variant is raised before or during a verb's single scan; a verb that
/// returns an error never exposes partially written output.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Column not found.
    ColumnNotFound {
        column: String,
    },
    /// Left and right key lists have different lengths.
    KeyArity {
        left: usize,
        right: usize,
    },
    /// No operator registered under this name.
    OperatorNotFound {
        name: String,
    },
    /// Operator used in a context that does not accept its kind.
    OperatorMisuse {
        name: String,
        message: String,
    },
    /// Aggregate without removal support placed in a sliding frame.
    NotRemovable {
        name: String,
    },
    /// Unsupported number of input fields.
    FieldArity {
        name: String,
        expected: usize,
        got: usize,
    },
    /// Invalid operator or verb parameter.
    InvalidParameter {
        name: String,
        message: String,
    },
    /// Column length disagrees with the expected row count.
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
    /// A configured resource limit would be exceeded.
    RowLimit {
        operation: String,
        limit: usize,
        requested: usize,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ColumnNotFound { column } => {
                write!(f, "Column not found: {}", column)
            }
            Error::KeyArity { left, right } => {
                write!(
                    f,
                    "Key arity mismatch: {} left keys, {} right keys",
                    left, right
                )
            }
            Error::OperatorNotFound { name } => {
                write!(f, "Unrecognized operator: {}", name)
            }
            Error::OperatorMisuse { name, message } => {
                write!(f, "Operator {} misused: {}", name, message)
            }
            Error::NotRemovable { name } => {
                write!(
                    f,
                    "Aggregate {} does not support removal inside a sliding frame",
                    name
                )
            }
            Error::FieldArity {
                name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Operator {} expects {} field(s), got {}",
                    name, expected, got
                )
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "Invalid parameter for {}: {}", name, message)
            }
            Error::LengthMismatch {
                column,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Column {} has length {}, expected {}",
                    column, got, expected
                )
            }
            Error::RowLimit {
                operation,
                limit,
                requested,
            } => {
                write!(
                    f,
                    "Row limit exceeded in {}: {} requested, limit {}",
                    operation, requested, limit
                )
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a column not found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates a key arity error.
    pub fn key_arity(left: usize, right: usize) -> Self {
        Error::KeyArity { left, right }
    }

    /// Creates an operator not found error.
    pub fn operator_not_found(name: impl Into<String>) -> Self {
        Error::OperatorNotFound { name: name.into() }
    }

    /// Creates an operator misuse error.
    pub fn operator_misuse(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::OperatorMisuse {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a not removable error.
    pub fn not_removable(name: impl Into<String>) -> Self {
        Error::NotRemovable { name: name.into() }
    }

    /// Creates a field arity error.
    pub fn field_arity(name: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::FieldArity {
            name: name.into(),
            expected,
            got,
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a length mismatch error.
    pub fn length_mismatch(column: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::LengthMismatch {
            column: column.into(),
            expected,
            got,
        }
    }

    /// Creates a row limit error.
    pub fn row_limit(operation: impl Into<String>, limit: usize, requested: usize) -> Self {
        Error::RowLimit {
            operation: operation.into(),
            limit,
            requested,
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}
