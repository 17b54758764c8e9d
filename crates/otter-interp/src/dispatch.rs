//! Opcode dispatch table
//!
//! Handlers are bound to opcodes in an explicit table indexed by the opcode
//! byte. The table is built and verified once by [`initialize`]; executing
//! before that reports an internal error instead of running anything.

use crate::error::{DispatchError, VmError, VmResult};
use crate::frame::ExecutionFrame;
use crate::handlers;
use crate::interpreter::Interpreter;
use crate::value::Value;
use otter_interp_bytecode::{Instruction, Opcode};
use std::sync::OnceLock;
use tracing::debug;

/// What the dispatch loop does after a handler returns
#[derive(Debug, Clone)]
pub enum InstructionResult {
    /// Advance to the next instruction
    Continue,
    /// Continue at an absolute instruction index
    Jump(usize),
    /// Leave the frame with a value
    Return(Value),
}

/// Handler for one opcode
pub type Handler = fn(&mut Interpreter, &mut ExecutionFrame, &Instruction) -> VmResult<InstructionResult>;

/// Handlers indexed by opcode byte
pub struct DispatchTable {
    handlers: [Option<Handler>; 256],
}

static DISPATCH: OnceLock<DispatchTable> = OnceLock::new();

impl DispatchTable {
    /// Build a table, checking that every opcode is bound
    pub(crate) fn from_handlers(entries: &[(Opcode, Handler)]) -> Result<Self, DispatchError> {
        let mut handlers: [Option<Handler>; 256] = [None; 256];
        for &(opcode, handler) in entries {
            handlers[opcode.to_byte() as usize] = Some(handler);
        }
        if let Some(&missing) = Opcode::ALL
            .iter()
            .find(|op| handlers[op.to_byte() as usize].is_none())
        {
            return Err(DispatchError::MissingHandler(missing));
        }
        Ok(Self { handlers })
    }

    /// Run the handler bound to the instruction's opcode
    #[inline]
    pub fn dispatch(
        &self,
        interp: &mut Interpreter,
        frame: &mut ExecutionFrame,
        insn: &Instruction,
    ) -> VmResult<InstructionResult> {
        match self.handlers[insn.opcode().to_byte() as usize] {
            Some(handler) => handler(interp, frame, insn),
            // construction checked every opcode
            None => unreachable!("no handler for {}", insn.opcode().name()),
        }
    }
}

/// Install the dispatch table; must run once before any execution
pub fn initialize() -> Result<(), DispatchError> {
    let table = DispatchTable::from_handlers(handlers::HANDLERS)?;
    DISPATCH
        .set(table)
        .map_err(|_| DispatchError::AlreadyInitialized)?;
    debug!(opcodes = Opcode::ALL.len(), "dispatch table installed");
    Ok(())
}

/// The installed table
pub(crate) fn table() -> VmResult<&'static DispatchTable> {
    DISPATCH
        .get()
        .ok_or_else(|| VmError::internal("dispatch table not initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_: &mut Interpreter, _: &mut ExecutionFrame, _: &Instruction) -> VmResult<InstructionResult> {
        Ok(InstructionResult::Continue)
    }

    #[test]
    fn test_missing_handler_reported() {
        let err = DispatchTable::from_handlers(&[(Opcode::Nop, nop as Handler)])
            .err()
            .unwrap();
        assert_eq!(err, DispatchError::MissingHandler(Opcode::LoadUndefined));
    }

    #[test]
    fn test_full_table_builds() {
        assert!(DispatchTable::from_handlers(handlers::HANDLERS).is_ok());
    }
}
