//! Interpreter error types

use crate::value::Value;
use otter_interp_bytecode::Opcode;
use thiserror::Error;

/// Errors raised while executing bytecode
///
/// Language-level faults carry their message; `Exception` carries an arbitrary
/// value raised by the `Throw` instruction.
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., calling non-function)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Syntax error (from direct eval compilation)
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Internal error: broken invariant reported instead of executed
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Call depth exceeded the configured maximum
    #[error("RangeError: Maximum call stack size exceeded")]
    StackOverflow,

    /// Thrown value
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),

    /// Bytecode error
    #[error("Bytecode error: {0}")]
    Bytecode(#[from] otter_interp_bytecode::BytecodeError),
}

/// A value raised by `Throw`
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// Printable form captured at throw time
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a syntax error
    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create an exception from a thrown value
    pub fn exception(value: Value) -> Self {
        let message = value.describe();
        Self::Exception(Box::new(ThrownValue { value, message }))
    }

    /// The thrown value, if this error came from `Throw`
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }

    /// `true` for `TypeError`
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeError(_))
    }

    /// `true` for `ReferenceError`
    pub fn is_reference_error(&self) -> bool {
        matches!(self, Self::ReferenceError(_))
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;

/// Errors from installing the opcode dispatch table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// `initialize` was already called
    #[error("dispatch table already initialized")]
    AlreadyInitialized,

    /// An opcode has no bound handler
    #[error("no handler bound for opcode {}", .0.name())]
    MissingHandler(Opcode),
}
