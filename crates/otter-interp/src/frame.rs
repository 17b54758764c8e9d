//! Execution frames

use crate::code::CompiledCode;
use crate::scope::Scope;
use crate::value::Value;
use otter_interp_bytecode::{Register, StackIndex};
use std::sync::Arc;

/// Everything a caller decides about a frame before it runs
#[derive(Debug, Clone)]
pub struct FrameSeed {
    /// Scope the frame starts in
    pub scope: Arc<Scope>,
    /// Explicit `this`; `None` resolves through the scope chain on first use
    pub this_value: Option<Value>,
    /// Actual arguments
    pub arguments: Vec<Value>,
    /// Invoked through `new`
    pub is_construct: bool,
    /// Force strict mode regardless of the code unit's flag
    pub strict: bool,
}

impl FrameSeed {
    /// A seed with no arguments and `this` taken from the scope chain
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            scope,
            this_value: None,
            arguments: Vec::new(),
            is_construct: false,
            strict: false,
        }
    }

    /// Set an explicit `this`
    pub fn with_this(mut self, this_value: Value) -> Self {
        self.this_value = Some(this_value);
        self
    }

    /// Set the actual arguments
    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Mark as a construct invocation
    pub fn constructing(mut self, is_construct: bool) -> Self {
        self.is_construct = is_construct;
        self
    }

    /// Force strict mode
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Per-invocation state, exclusively owned by one run of a code unit
pub struct ExecutionFrame {
    /// Code being executed
    pub code: Arc<CompiledCode>,
    registers: Vec<Value>,
    stack: Vec<Value>,
    /// Index of the current instruction
    pub pc: usize,
    scope: Arc<Scope>,
    block_depth: usize,
    this_value: Option<Value>,
    arguments: Vec<Value>,
    /// Invoked through `new`
    pub is_construct: bool,
    /// Strict mode for name stores and failed property writes
    pub strict: bool,
}

impl ExecutionFrame {
    /// Allocate registers and stack storage and place stack parameters
    pub fn new(code: Arc<CompiledCode>, seed: FrameSeed) -> Self {
        let unit = code.unit();
        let registers = vec![Value::Undefined; unit.register_count as usize];
        let mut stack = vec![Value::Undefined; unit.stack_size as usize];
        if !unit.params_on_heap {
            for (slot, arg) in stack
                .iter_mut()
                .zip(seed.arguments.iter())
                .take(unit.param_count as usize)
            {
                *slot = arg.clone();
            }
        }
        let strict = unit.is_strict() || seed.strict;
        Self {
            code,
            registers,
            stack,
            pc: 0,
            scope: seed.scope,
            block_depth: 0,
            this_value: seed.this_value,
            arguments: seed.arguments,
            is_construct: seed.is_construct,
            strict,
        }
    }

    /// Read a register
    #[inline]
    pub fn reg(&self, r: Register) -> &Value {
        &self.registers[r.0 as usize]
    }

    /// Write a register
    #[inline]
    pub fn set_reg(&mut self, r: Register, value: Value) {
        self.registers[r.0 as usize] = value;
    }

    /// `count` consecutive registers starting at `first`
    pub fn reg_window(&self, first: Register, count: u16) -> &[Value] {
        let start = first.0 as usize;
        &self.registers[start..start + count as usize]
    }

    /// Register 0, the completion value of global code
    pub fn completion(&self) -> Value {
        self.registers.first().cloned().unwrap_or_default()
    }

    /// Read a stack binding
    #[inline]
    pub fn stack_slot(&self, idx: StackIndex) -> &Value {
        &self.stack[idx.0 as usize]
    }

    /// Write a stack binding
    #[inline]
    pub fn set_stack_slot(&mut self, idx: StackIndex, value: Value) {
        self.stack[idx.0 as usize] = value;
    }

    /// Current scope node
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// Actual arguments
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// `this`, resolved through the scope chain once and then cached
    pub fn this_value(&mut self) -> Value {
        if let Some(value) = &self.this_value {
            return value.clone();
        }
        let value = self.scope.this_binding().unwrap_or_default();
        self.this_value = Some(value.clone());
        value
    }

    /// Number of block scopes pushed by this frame
    pub fn block_depth(&self) -> usize {
        self.block_depth
    }

    /// Enter a block or `with` scope
    pub fn push_scope(&mut self, scope: Arc<Scope>) {
        self.scope = scope;
        self.block_depth += 1;
    }

    /// Leave the innermost block scope; `false` if none is open
    pub fn pop_scope(&mut self) -> bool {
        if self.block_depth == 0 {
            return false;
        }
        let Some(outer) = self.scope.outer() else {
            return false;
        };
        self.scope = outer;
        self.block_depth -= 1;
        true
    }
}

impl std::fmt::Debug for ExecutionFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionFrame")
            .field("function", &self.code.unit().display_name())
            .field("pc", &self.pc)
            .field("block_depth", &self.block_depth)
            .field("strict", &self.strict)
            .finish()
    }
}
