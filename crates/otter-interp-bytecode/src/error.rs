//! Bytecode errors

use thiserror::Error;

/// Errors detected while assembling or loading a code unit
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Invalid opcode byte
    #[error("Invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// A jump targets an index outside the instruction buffer
    #[error("Jump at {at} targets {target}, past the end of {len} instructions")]
    InvalidJumpTarget {
        /// Instruction index of the jump
        at: usize,
        /// Requested target
        target: u32,
        /// Number of instructions in the unit
        len: usize,
    },

    /// A register operand exceeds the declared register file
    #[error("Instruction {at} uses register {register} but only {count} are declared")]
    RegisterOutOfRange {
        /// Instruction index
        at: usize,
        /// Highest register touched
        register: u32,
        /// Declared register count
        count: u16,
    },

    /// A stack storage operand exceeds the declared stack size
    #[error("Instruction {at} uses stack slot {index} but stack size is {size}")]
    StackIndexOutOfRange {
        /// Instruction index
        at: usize,
        /// Stack slot
        index: u16,
        /// Declared stack size
        size: u16,
    },

    /// Missing or mistyped constant
    #[error("Instruction {at} references invalid constant {index}")]
    InvalidConstant {
        /// Instruction index
        at: usize,
        /// Constant index
        index: u32,
    },

    /// Missing nested function
    #[error("Instruction {at} references missing function {index}")]
    InvalidFunction {
        /// Instruction index
        at: usize,
        /// Function index
        index: u32,
    },

    /// Missing block scope layout
    #[error("Instruction {at} references missing block scope {index}")]
    InvalidBlockScope {
        /// Instruction index
        at: usize,
        /// Block scope index
        index: u32,
    },

    /// A nested function body failed validation
    #[error("Nested function {index} is invalid: {source}")]
    InvalidNestedFunction {
        /// Index into the parent's function table
        index: usize,
        /// What the nested unit got wrong
        #[source]
        source: Box<BytecodeError>,
    },

    /// JSON dump could not be produced or parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
