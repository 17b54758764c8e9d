//! Code unit representation
//!
//! A [`CodeUnit`] is the compiled body of one function (or of global / eval
//! code): its instruction buffer, constant pool, nested functions and the
//! storage layout the interpreter needs to build a frame for it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constant::ConstantPool;
use crate::error::{BytecodeError, Result};
use crate::instruction::Instruction;

/// Code unit flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFlags {
    /// Is strict mode
    pub is_strict: bool,
    /// Can be invoked with `new`
    pub is_constructor: bool,
    /// Arrow function: no own `this`, uses the enclosing one
    pub is_arrow: bool,
    /// Global code: runs directly in the global scope
    pub is_global: bool,
}

/// A named binding slot in a heap scope record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingInfo {
    /// Binding name
    pub name: String,
    /// `false` for `const` style bindings; stores by name raise a TypeError
    pub mutable: bool,
}

impl BindingInfo {
    /// A mutable binding
    pub fn mutable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mutable: true,
        }
    }

    /// An immutable binding
    pub fn immutable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mutable: false,
        }
    }
}

/// Bindings declared by an `EnterScope` block, slot index = position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockScope {
    /// Declared bindings
    pub bindings: Vec<BindingInfo>,
}

impl BlockScope {
    /// Create a block scope layout of mutable bindings
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bindings: names.into_iter().map(BindingInfo::mutable).collect(),
        }
    }

    /// Append an immutable binding
    pub fn with_const(mut self, name: impl Into<String>) -> Self {
        self.bindings.push(BindingInfo::immutable(name));
        self
    }
}

/// A compiled function body
///
/// Parameters live in stack slots `0..param_count`, or in heap slots
/// `0..param_count` of the function scope when `params_on_heap` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Function name (empty for anonymous)
    pub name: Option<String>,

    /// Number of declared parameters
    pub param_count: u16,

    /// Number of registers needed
    pub register_count: u16,

    /// Number of frame-local stack binding slots
    pub stack_size: u16,

    /// Heap-captured bindings of the function scope record
    pub heap_bindings: Vec<BindingInfo>,

    /// Parameters are stored in heap slots instead of stack slots
    pub params_on_heap: bool,

    /// Code flags
    pub flags: CodeFlags,

    /// Bytecode instructions
    pub instructions: Vec<Instruction>,

    /// Constant pool
    pub constants: ConstantPool,

    /// Nested function bodies referenced by `CreateClosure`
    pub functions: Vec<Arc<CodeUnit>>,

    /// Block scope layouts referenced by `EnterScope`
    pub block_scopes: Vec<BlockScope>,

    /// Number of inline cache slots used by instructions
    pub feedback_slots: u16,
}

impl CodeUnit {
    /// Create a new code unit builder
    pub fn builder() -> CodeUnitBuilder {
        CodeUnitBuilder::new()
    }

    /// Get the function name or `<anonymous>`
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Check if code is in strict mode
    #[inline]
    pub fn is_strict(&self) -> bool {
        self.flags.is_strict
    }

    /// Number of slots the function scope record needs
    pub fn heap_size(&self) -> usize {
        if self.params_on_heap {
            self.heap_bindings.len().max(self.param_count as usize)
        } else {
            self.heap_bindings.len()
        }
    }

    /// Serialize to a JSON debugging dump
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON debugging dump and re-validate
    pub fn from_json(json: &str) -> Result<Self> {
        let mut unit: CodeUnit = serde_json::from_str(json)?;
        unit.reindex();
        unit.validate()?;
        Ok(unit)
    }

    fn reindex(&mut self) {
        self.constants.reindex();
        for func in &mut self.functions {
            if let Some(func) = Arc::get_mut(func) {
                func.reindex();
            }
        }
    }

    /// Check every operand against the declared layout, nested functions
    /// included
    pub fn validate(&self) -> Result<()> {
        let len = self.instructions.len();
        for (at, insn) in self.instructions.iter().enumerate() {
            let span = insn.register_span();
            if span > self.register_count as u32 {
                return Err(BytecodeError::RegisterOutOfRange {
                    at,
                    register: span - 1,
                    count: self.register_count,
                });
            }

            if let Some(target) = insn.jump_target()
                && target.index() > len
            {
                return Err(BytecodeError::InvalidJumpTarget {
                    at,
                    target: target.0,
                    len,
                });
            }

            if let Some(name) = insn.name_operand()
                && self.constants.get_str(name.0).is_none()
            {
                return Err(BytecodeError::InvalidConstant { at, index: name.0 });
            }

            match insn {
                Instruction::LoadConst { idx, .. } if self.constants.get(idx.0).is_none() => {
                    return Err(BytecodeError::InvalidConstant { at, index: idx.0 });
                }
                Instruction::LoadStack { idx, .. } | Instruction::StoreStack { idx, .. }
                    if idx.0 >= self.stack_size =>
                {
                    return Err(BytecodeError::StackIndexOutOfRange {
                        at,
                        index: idx.0,
                        size: self.stack_size,
                    });
                }
                Instruction::CreateClosure { func, .. }
                    if func.0 as usize >= self.functions.len() =>
                {
                    return Err(BytecodeError::InvalidFunction { at, index: func.0 });
                }
                Instruction::EnterScope { layout } if *layout as usize >= self.block_scopes.len() => {
                    return Err(BytecodeError::InvalidBlockScope { at, index: *layout });
                }
                _ => {}
            }
        }

        for (index, func) in self.functions.iter().enumerate() {
            func.validate()
                .map_err(|source| BytecodeError::InvalidNestedFunction {
                    index,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

/// Builder for creating code units
#[derive(Debug, Default)]
pub struct CodeUnitBuilder {
    name: Option<String>,
    param_count: u16,
    register_count: Option<u16>,
    stack_size: u16,
    heap_bindings: Vec<BindingInfo>,
    params_on_heap: bool,
    flags: CodeFlags,
    instructions: Vec<Instruction>,
    constants: ConstantPool,
    functions: Vec<Arc<CodeUnit>>,
    block_scopes: Vec<BlockScope>,
}

impl CodeUnitBuilder {
    /// Create a new code unit builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set function name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set parameter count
    pub fn param_count(mut self, count: u16) -> Self {
        self.param_count = count;
        self
    }

    /// Declare the register file size; inferred from the instructions when unset
    pub fn register_count(mut self, count: u16) -> Self {
        self.register_count = Some(count);
        self
    }

    /// Set stack storage size
    pub fn stack_size(mut self, size: u16) -> Self {
        self.stack_size = size;
        self
    }

    /// Add a mutable heap-captured binding (slot index = call order)
    pub fn heap_name(mut self, name: impl Into<String>) -> Self {
        self.heap_bindings.push(BindingInfo::mutable(name));
        self
    }

    /// Add an immutable heap-captured binding (slot index = call order)
    pub fn heap_const(mut self, name: impl Into<String>) -> Self {
        self.heap_bindings.push(BindingInfo::immutable(name));
        self
    }

    /// Store parameters in the heap record instead of stack storage
    pub fn params_on_heap(mut self, value: bool) -> Self {
        self.params_on_heap = value;
        self
    }

    /// Set flags
    pub fn flags(mut self, flags: CodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Mark as strict mode
    pub fn is_strict(mut self, value: bool) -> Self {
        self.flags.is_strict = value;
        self
    }

    /// Mark as constructible
    pub fn is_constructor(mut self, value: bool) -> Self {
        self.flags.is_constructor = value;
        self
    }

    /// Mark as arrow function
    pub fn is_arrow(mut self, value: bool) -> Self {
        self.flags.is_arrow = value;
        self
    }

    /// Mark as global code
    pub fn is_global(mut self, value: bool) -> Self {
        self.flags.is_global = value;
        self
    }

    /// Set all instructions
    pub fn instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Add a single instruction
    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Replace the constant pool
    pub fn constants(mut self, constants: ConstantPool) -> Self {
        self.constants = constants;
        self
    }

    /// Mutable access to the constant pool
    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    /// Add a nested function body
    pub fn function(mut self, unit: impl Into<Arc<CodeUnit>>) -> Self {
        self.functions.push(unit.into());
        self
    }

    /// Add a block scope layout
    pub fn block_scope(mut self, scope: BlockScope) -> Self {
        self.block_scopes.push(scope);
        self
    }

    /// Build and validate the code unit
    pub fn build(self) -> Result<CodeUnit> {
        let needed = self
            .instructions
            .iter()
            .map(Instruction::register_span)
            .max()
            .unwrap_or(0)
            .max(1);
        let register_count = match self.register_count {
            Some(count) => count,
            None => u16::try_from(needed).unwrap_or(u16::MAX),
        };

        let stack_size = if self.params_on_heap {
            self.stack_size
        } else {
            self.stack_size.max(self.param_count)
        };

        let feedback_slots = self
            .instructions
            .iter()
            .filter_map(Instruction::ic_index)
            .map(|i| i + 1)
            .max()
            .unwrap_or(0);

        let unit = CodeUnit {
            name: self.name,
            param_count: self.param_count,
            register_count,
            stack_size,
            heap_bindings: self.heap_bindings,
            params_on_heap: self.params_on_heap,
            flags: self.flags,
            instructions: self.instructions,
            constants: self.constants,
            functions: self.functions,
            block_scopes: self.block_scopes,
            feedback_slots,
        };
        unit.validate()?;
        Ok(unit)
    }
}
