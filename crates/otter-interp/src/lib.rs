//! # Otter Interpreter
//!
//! Register bytecode interpreter core: the dispatch loop, the lexical scope
//! chain, numeric and relational operators, inline caches for property and
//! global access, and the call protocol (native calls, `new`, `eval`).
//!
//! ## Design Principles
//!
//! - **Explicit dispatch**: handlers are bound to opcodes in a table installed
//!   once by [`initialize`]
//! - **Hidden classes**: objects with the same property history share a
//!   [`Shape`]; caches compare shapes by identity
//! - **Side-table caches**: instructions stay immutable, cache state lives in
//!   the per-code [`FeedbackVector`]
//! - **Reference counted heap**: values hold `Arc`s; no tracing collector

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod call;
pub mod code;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod frame;
mod handlers;
pub mod ic;
pub mod interpreter;
pub mod object;
pub mod ops;
pub mod realm;
pub mod scope;
pub mod shape;
pub mod string;
pub mod value;

pub use call::{NativeCall, ScriptCompiler};
pub use code::CompiledCode;
pub use config::InterpreterConfig;
pub use dispatch::{InstructionResult, initialize};
pub use error::{DispatchError, VmError, VmResult};
pub use frame::{ExecutionFrame, FrameSeed};
pub use ic::{CacheState, FeedbackVector};
pub use interpreter::Interpreter;
pub use object::{JsObject, ObjectKind, PropertyAttributes, PropertyKey};
pub use ops::PreferredType;
pub use realm::Realm;
pub use scope::Scope;
pub use shape::Shape;
pub use string::JsString;
pub use value::Value;

pub use otter_interp_bytecode as bytecode;
