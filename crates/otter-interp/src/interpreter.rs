//! Bytecode interpreter
//!
//! [`Interpreter::execute`] runs one code unit to completion in a fresh
//! frame. Calls recurse through `execute`, so an error unwinds every nested
//! frame on its way back to the outermost caller.

use crate::call::ScriptCompiler;
use crate::code::CompiledCode;
use crate::config::InterpreterConfig;
use crate::dispatch::{self, DispatchTable, InstructionResult};
use crate::error::{VmError, VmResult};
use crate::frame::{ExecutionFrame, FrameSeed};
use crate::realm::Realm;
use crate::value::Value;
use otter_interp_bytecode::CodeUnit;
use std::sync::Arc;
use tracing::trace;

/// The bytecode interpreter
pub struct Interpreter {
    realm: Arc<Realm>,
    config: InterpreterConfig,
    compiler: Option<Arc<dyn ScriptCompiler>>,
    call_depth: usize,
}

impl Interpreter {
    /// Create an interpreter with a fresh realm and default configuration
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    /// Create an interpreter with a fresh realm
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            realm: Realm::new(),
            config,
            compiler: None,
            call_depth: 0,
        }
    }

    /// Install the compiler used by direct `eval`
    pub fn set_compiler(&mut self, compiler: Arc<dyn ScriptCompiler>) {
        self.compiler = Some(compiler);
    }

    /// The realm
    #[inline]
    pub fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// Configuration
    #[inline]
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub(crate) fn compiler(&self) -> Option<&Arc<dyn ScriptCompiler>> {
        self.compiler.as_ref()
    }

    /// Current call nesting
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub(crate) fn enter_call(&mut self) -> VmResult<()> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(VmError::StackOverflow);
        }
        self.call_depth += 1;
        Ok(())
    }

    pub(crate) fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Run global code in the realm's global scope
    pub fn run_script(&mut self, unit: Arc<CodeUnit>) -> VmResult<Value> {
        let code = CompiledCode::new(unit);
        let seed = FrameSeed::new(Arc::clone(self.realm.global_scope()))
            .with_strict(self.config.strict_by_default);
        self.execute(&code, seed)
    }

    /// Run a code unit in a new frame
    pub fn execute(&mut self, code: &Arc<CompiledCode>, seed: FrameSeed) -> VmResult<Value> {
        let table = dispatch::table()?;
        self.enter_call()?;
        let mut frame = ExecutionFrame::new(Arc::clone(code), seed);
        trace!(
            function = code.unit().display_name(),
            depth = self.call_depth,
            "enter frame"
        );
        let result = self.run(table, &mut frame);
        trace!(
            function = code.unit().display_name(),
            pc = frame.pc,
            ok = result.is_ok(),
            "exit frame"
        );
        self.leave_call();
        result
    }

    fn run(&mut self, table: &DispatchTable, frame: &mut ExecutionFrame) -> VmResult<Value> {
        let code = Arc::clone(&frame.code);
        let instructions = &code.unit().instructions;
        loop {
            let Some(insn) = instructions.get(frame.pc) else {
                return Ok(Value::Undefined);
            };
            match table.dispatch(self, frame, insn)? {
                InstructionResult::Continue => frame.pc += 1,
                InstructionResult::Jump(target) => frame.pc = target,
                InstructionResult::Return(value) => return Ok(value),
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("call_depth", &self.call_depth)
            .field("has_compiler", &self.compiler.is_some())
            .finish()
    }
}
