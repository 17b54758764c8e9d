//! # Otter Interpreter Bytecode
//!
//! This crate defines the register bytecode executed by the Otter interpreter core.
//!
//! ## Design Principles
//!
//! - **Register-based**: Operations work on a per-frame register file, not a stack
//! - **Immutable code**: Instructions never change after [`CodeUnitBuilder::build`];
//!   inline cache state lives in a side table addressed by `ic_index`
//! - **Absolute jumps**: Jump targets are instruction indices validated at build time
//! - **Inspectable**: Code units serialize to JSON for debugging dumps

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod code_unit;
pub mod constant;
pub mod error;
pub mod instruction;
pub mod operand;

pub use code_unit::{BindingInfo, BlockScope, CodeFlags, CodeUnit, CodeUnitBuilder};
pub use constant::{Constant, ConstantPool};
pub use error::BytecodeError;
pub use instruction::{Instruction, Opcode};
pub use operand::{ConstantIndex, FunctionIndex, JumpTarget, Register, StackIndex};
