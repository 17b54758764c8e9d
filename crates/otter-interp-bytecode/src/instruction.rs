//! Bytecode instructions (opcodes)

use serde::{Deserialize, Serialize};

use crate::operand::{ConstantIndex, FunctionIndex, JumpTarget, Register, StackIndex};

/// Bytecode opcodes
///
/// Register-based instruction set. The opcode is the tag the dispatch table is
/// keyed on; [`Instruction`] carries the operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Constants ====================
    /// Load undefined into register: dst = undefined
    LoadUndefined = 0x00,
    /// Load null into register: dst = null
    LoadNull = 0x01,
    /// Load true into register: dst = true
    LoadTrue = 0x02,
    /// Load false into register: dst = false
    LoadFalse = 0x03,
    /// Load integer immediate (32-bit): dst = imm32
    LoadInt32 = 0x04,
    /// Load constant from pool: dst = constants\[idx\]
    LoadConst = 0x05,

    // ==================== Variables ====================
    /// Load frame-local binding: dst = stack\[idx\]
    LoadStack = 0x10,
    /// Store frame-local binding: stack\[idx\] = src
    StoreStack = 0x11,
    /// Load heap-captured binding `hops` scopes outward
    LoadHeap = 0x12,
    /// Store heap-captured binding `hops` scopes outward
    StoreHeap = 0x13,
    /// Resolve a name through the scope chain
    LoadName = 0x14,
    /// Store to the nearest declared binding of a name
    StoreName = 0x15,
    /// Declare a mutable binding in the current scope
    DeclareVar = 0x16,
    /// Load global binding through the global slot cache
    LoadGlobal = 0x17,
    /// Store global binding through the global slot cache
    StoreGlobal = 0x18,
    /// Load `this` value: dst = this
    LoadThis = 0x19,
    /// Load an actual argument (unpadded view): dst = arguments\[idx\]
    LoadArgument = 0x1A,
    /// Load the actual argument count: dst = arguments.length
    ArgumentCount = 0x1B,

    // ==================== Arithmetic ====================
    /// Addition: dst = lhs + rhs
    Add = 0x20,
    /// Subtraction: dst = lhs - rhs
    Sub = 0x21,
    /// Multiplication: dst = lhs * rhs
    Mul = 0x22,
    /// Division: dst = lhs / rhs
    Div = 0x23,
    /// Modulo: dst = lhs % rhs
    Mod = 0x24,
    /// Unary negation: dst = -src
    Neg = 0x25,
    /// Unary plus: dst = +src
    Plus = 0x26,
    /// Increment: dst = src + 1
    Inc = 0x27,
    /// Decrement: dst = src - 1
    Dec = 0x28,

    // ==================== Bitwise ====================
    /// Bitwise AND: dst = lhs & rhs
    BitAnd = 0x30,
    /// Bitwise OR: dst = lhs | rhs
    BitOr = 0x31,
    /// Bitwise XOR: dst = lhs ^ rhs
    BitXor = 0x32,
    /// Bitwise NOT: dst = ~src
    BitNot = 0x33,
    /// Left shift: dst = lhs << rhs
    Shl = 0x34,
    /// Signed right shift: dst = lhs >> rhs
    Shr = 0x35,
    /// Unsigned right shift: dst = lhs >>> rhs
    Ushr = 0x36,

    // ==================== Comparison ====================
    /// Equality: dst = lhs == rhs
    Eq = 0x40,
    /// Strict equality: dst = lhs === rhs
    StrictEq = 0x41,
    /// Inequality: dst = lhs != rhs
    Ne = 0x42,
    /// Strict inequality: dst = lhs !== rhs
    StrictNe = 0x43,
    /// Less than: dst = lhs < rhs
    Lt = 0x44,
    /// Less than or equal: dst = lhs <= rhs
    Le = 0x45,
    /// Greater than: dst = lhs > rhs
    Gt = 0x46,
    /// Greater than or equal: dst = lhs >= rhs
    Ge = 0x47,

    // ==================== Logical ====================
    /// Logical NOT: dst = !src
    Not = 0x50,
    /// typeof operator: dst = typeof src
    TypeOf = 0x51,

    // ==================== Objects ====================
    /// Get named property through the read cache: dst = obj.name
    GetProp = 0x60,
    /// Set named property through the write cache: obj.name = val
    SetProp = 0x61,
    /// Get computed property: dst = obj\[key\]
    GetElem = 0x62,
    /// Set computed property: obj\[key\] = val
    SetElem = 0x63,
    /// Create empty object: dst = {}
    NewObject = 0x64,
    /// Create array: dst = new Array(len)
    NewArray = 0x65,

    // ==================== Functions ====================
    /// Create closure over the current scope: dst = closure(func_idx)
    CreateClosure = 0x80,
    /// Call: base = base+1.call(base, base+2..)
    Call = 0x81,
    /// Construct: base = new base(base+1..)
    New = 0x82,
    /// Call `eval` resolved through the scope chain
    CallEval = 0x83,
    /// Return value from function
    Return = 0x84,
    /// Return undefined from function
    ReturnUndefined = 0x85,
    /// End of global code: return register 0
    End = 0x86,

    // ==================== Control Flow ====================
    /// Unconditional jump
    Jump = 0x90,
    /// Jump if ToBoolean(cond) is true
    JumpIfTrue = 0x91,
    /// Jump if ToBoolean(cond) is false
    JumpIfFalse = 0x92,
    /// Pop block scopes, then jump
    JumpUnwind = 0x93,

    // ==================== Scopes ====================
    /// Push a declarative block scope
    EnterScope = 0x98,
    /// Push an object scope (`with`)
    EnterWith = 0x99,
    /// Pop the innermost block scope
    ExitScope = 0x9A,

    // ==================== Exceptions ====================
    /// Throw value
    Throw = 0xA0,

    // ==================== Misc ====================
    /// Move register: dst = src
    Move = 0xE0,
    /// No operation
    Nop = 0xE1,
}

impl Opcode {
    /// Every opcode, in tag order
    pub const ALL: &'static [Opcode] = &[
        Self::LoadUndefined,
        Self::LoadNull,
        Self::LoadTrue,
        Self::LoadFalse,
        Self::LoadInt32,
        Self::LoadConst,
        Self::LoadStack,
        Self::StoreStack,
        Self::LoadHeap,
        Self::StoreHeap,
        Self::LoadName,
        Self::StoreName,
        Self::DeclareVar,
        Self::LoadGlobal,
        Self::StoreGlobal,
        Self::LoadThis,
        Self::LoadArgument,
        Self::ArgumentCount,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Neg,
        Self::Plus,
        Self::Inc,
        Self::Dec,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::BitNot,
        Self::Shl,
        Self::Shr,
        Self::Ushr,
        Self::Eq,
        Self::StrictEq,
        Self::Ne,
        Self::StrictNe,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Not,
        Self::TypeOf,
        Self::GetProp,
        Self::SetProp,
        Self::GetElem,
        Self::SetElem,
        Self::NewObject,
        Self::NewArray,
        Self::CreateClosure,
        Self::Call,
        Self::New,
        Self::CallEval,
        Self::Return,
        Self::ReturnUndefined,
        Self::End,
        Self::Jump,
        Self::JumpIfTrue,
        Self::JumpIfFalse,
        Self::JumpUnwind,
        Self::EnterScope,
        Self::EnterWith,
        Self::ExitScope,
        Self::Throw,
        Self::Move,
        Self::Nop,
    ];

    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.to_byte() == byte)
    }

    /// Convert to raw byte
    #[inline]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Get opcode name
    pub fn name(self) -> &'static str {
        match self {
            Self::LoadUndefined => "LoadUndefined",
            Self::LoadNull => "LoadNull",
            Self::LoadTrue => "LoadTrue",
            Self::LoadFalse => "LoadFalse",
            Self::LoadInt32 => "LoadInt32",
            Self::LoadConst => "LoadConst",
            Self::LoadStack => "LoadStack",
            Self::StoreStack => "StoreStack",
            Self::LoadHeap => "LoadHeap",
            Self::StoreHeap => "StoreHeap",
            Self::LoadName => "LoadName",
            Self::StoreName => "StoreName",
            Self::DeclareVar => "DeclareVar",
            Self::LoadGlobal => "LoadGlobal",
            Self::StoreGlobal => "StoreGlobal",
            Self::LoadThis => "LoadThis",
            Self::LoadArgument => "LoadArgument",
            Self::ArgumentCount => "ArgumentCount",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Mod => "Mod",
            Self::Neg => "Neg",
            Self::Plus => "Plus",
            Self::Inc => "Inc",
            Self::Dec => "Dec",
            Self::BitAnd => "BitAnd",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
            Self::BitNot => "BitNot",
            Self::Shl => "Shl",
            Self::Shr => "Shr",
            Self::Ushr => "Ushr",
            Self::Eq => "Eq",
            Self::StrictEq => "StrictEq",
            Self::Ne => "Ne",
            Self::StrictNe => "StrictNe",
            Self::Lt => "Lt",
            Self::Le => "Le",
            Self::Gt => "Gt",
            Self::Ge => "Ge",
            Self::Not => "Not",
            Self::TypeOf => "TypeOf",
            Self::GetProp => "GetProp",
            Self::SetProp => "SetProp",
            Self::GetElem => "GetElem",
            Self::SetElem => "SetElem",
            Self::NewObject => "NewObject",
            Self::NewArray => "NewArray",
            Self::CreateClosure => "CreateClosure",
            Self::Call => "Call",
            Self::New => "New",
            Self::CallEval => "CallEval",
            Self::Return => "Return",
            Self::ReturnUndefined => "ReturnUndefined",
            Self::End => "End",
            Self::Jump => "Jump",
            Self::JumpIfTrue => "JumpIfTrue",
            Self::JumpIfFalse => "JumpIfFalse",
            Self::JumpUnwind => "JumpUnwind",
            Self::EnterScope => "EnterScope",
            Self::EnterWith => "EnterWith",
            Self::ExitScope => "ExitScope",
            Self::Throw => "Throw",
            Self::Move => "Move",
            Self::Nop => "Nop",
        }
    }
}

/// A decoded instruction with its operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Instruction {
    // Constants
    LoadUndefined {
        dst: Register,
    },
    LoadNull {
        dst: Register,
    },
    LoadTrue {
        dst: Register,
    },
    LoadFalse {
        dst: Register,
    },
    LoadInt32 {
        dst: Register,
        value: i32,
    },
    LoadConst {
        dst: Register,
        idx: ConstantIndex,
    },

    // Variables
    LoadStack {
        dst: Register,
        idx: StackIndex,
    },
    StoreStack {
        idx: StackIndex,
        src: Register,
    },
    /// Walks exactly `hops` scope links before indexing the record
    LoadHeap {
        dst: Register,
        hops: u16,
        idx: u16,
    },
    StoreHeap {
        hops: u16,
        idx: u16,
        src: Register,
    },
    LoadName {
        dst: Register,
        name: ConstantIndex,
    },
    StoreName {
        name: ConstantIndex,
        src: Register,
    },
    DeclareVar {
        name: ConstantIndex,
    },
    LoadGlobal {
        dst: Register,
        name: ConstantIndex,
        /// Index into the feedback vector for the global slot cache
        ic_index: u16,
    },
    StoreGlobal {
        name: ConstantIndex,
        src: Register,
        /// Index into the feedback vector for the global slot cache
        ic_index: u16,
    },
    LoadThis {
        dst: Register,
    },
    LoadArgument {
        dst: Register,
        idx: u16,
    },
    ArgumentCount {
        dst: Register,
    },

    // Arithmetic
    Add {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Sub {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Mul {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Div {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Mod {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Neg {
        dst: Register,
        src: Register,
    },
    Plus {
        dst: Register,
        src: Register,
    },
    Inc {
        dst: Register,
        src: Register,
    },
    Dec {
        dst: Register,
        src: Register,
    },

    // Bitwise
    BitAnd {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    BitOr {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    BitXor {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    BitNot {
        dst: Register,
        src: Register,
    },
    Shl {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Shr {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Ushr {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },

    // Comparison
    Eq {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    StrictEq {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Ne {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    StrictNe {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Lt {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Le {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Gt {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    Ge {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },

    // Logical
    Not {
        dst: Register,
        src: Register,
    },
    TypeOf {
        dst: Register,
        src: Register,
    },

    // Objects
    GetProp {
        dst: Register,
        obj: Register,
        name: ConstantIndex,
        /// Index into the feedback vector for the read cache
        ic_index: u16,
    },
    SetProp {
        obj: Register,
        name: ConstantIndex,
        val: Register,
        /// Index into the feedback vector for the write cache
        ic_index: u16,
    },
    GetElem {
        dst: Register,
        obj: Register,
        key: Register,
    },
    SetElem {
        obj: Register,
        key: Register,
        val: Register,
    },
    NewObject {
        dst: Register,
    },
    NewArray {
        dst: Register,
        len: u32,
    },

    // Functions
    CreateClosure {
        dst: Register,
        func: FunctionIndex,
    },
    /// Receiver in `base`, callee in `base + 1`, arguments after; result in `base`
    Call {
        base: Register,
        argc: u16,
    },
    /// Callee in `base`, arguments after; result in `base`
    New {
        base: Register,
        argc: u16,
    },
    /// Arguments start at `base`; result in `base`
    CallEval {
        base: Register,
        argc: u16,
    },
    Return {
        src: Register,
    },
    ReturnUndefined,
    End,

    // Control flow
    Jump {
        target: JumpTarget,
    },
    JumpIfTrue {
        cond: Register,
        target: JumpTarget,
    },
    JumpIfFalse {
        cond: Register,
        target: JumpTarget,
    },
    /// Pops `depth` block scopes before jumping
    JumpUnwind {
        target: JumpTarget,
        depth: u16,
    },

    // Scopes
    EnterScope {
        layout: u32,
    },
    EnterWith {
        obj: Register,
    },
    ExitScope,

    // Exceptions
    Throw {
        src: Register,
    },

    // Misc
    Move {
        dst: Register,
        src: Register,
    },
    Nop,
}

impl Instruction {
    /// The opcode tag of this instruction
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::LoadUndefined { .. } => Opcode::LoadUndefined,
            Self::LoadNull { .. } => Opcode::LoadNull,
            Self::LoadTrue { .. } => Opcode::LoadTrue,
            Self::LoadFalse { .. } => Opcode::LoadFalse,
            Self::LoadInt32 { .. } => Opcode::LoadInt32,
            Self::LoadConst { .. } => Opcode::LoadConst,
            Self::LoadStack { .. } => Opcode::LoadStack,
            Self::StoreStack { .. } => Opcode::StoreStack,
            Self::LoadHeap { .. } => Opcode::LoadHeap,
            Self::StoreHeap { .. } => Opcode::StoreHeap,
            Self::LoadName { .. } => Opcode::LoadName,
            Self::StoreName { .. } => Opcode::StoreName,
            Self::DeclareVar { .. } => Opcode::DeclareVar,
            Self::LoadGlobal { .. } => Opcode::LoadGlobal,
            Self::StoreGlobal { .. } => Opcode::StoreGlobal,
            Self::LoadThis { .. } => Opcode::LoadThis,
            Self::LoadArgument { .. } => Opcode::LoadArgument,
            Self::ArgumentCount { .. } => Opcode::ArgumentCount,
            Self::Add { .. } => Opcode::Add,
            Self::Sub { .. } => Opcode::Sub,
            Self::Mul { .. } => Opcode::Mul,
            Self::Div { .. } => Opcode::Div,
            Self::Mod { .. } => Opcode::Mod,
            Self::Neg { .. } => Opcode::Neg,
            Self::Plus { .. } => Opcode::Plus,
            Self::Inc { .. } => Opcode::Inc,
            Self::Dec { .. } => Opcode::Dec,
            Self::BitAnd { .. } => Opcode::BitAnd,
            Self::BitOr { .. } => Opcode::BitOr,
            Self::BitXor { .. } => Opcode::BitXor,
            Self::BitNot { .. } => Opcode::BitNot,
            Self::Shl { .. } => Opcode::Shl,
            Self::Shr { .. } => Opcode::Shr,
            Self::Ushr { .. } => Opcode::Ushr,
            Self::Eq { .. } => Opcode::Eq,
            Self::StrictEq { .. } => Opcode::StrictEq,
            Self::Ne { .. } => Opcode::Ne,
            Self::StrictNe { .. } => Opcode::StrictNe,
            Self::Lt { .. } => Opcode::Lt,
            Self::Le { .. } => Opcode::Le,
            Self::Gt { .. } => Opcode::Gt,
            Self::Ge { .. } => Opcode::Ge,
            Self::Not { .. } => Opcode::Not,
            Self::TypeOf { .. } => Opcode::TypeOf,
            Self::GetProp { .. } => Opcode::GetProp,
            Self::SetProp { .. } => Opcode::SetProp,
            Self::GetElem { .. } => Opcode::GetElem,
            Self::SetElem { .. } => Opcode::SetElem,
            Self::NewObject { .. } => Opcode::NewObject,
            Self::NewArray { .. } => Opcode::NewArray,
            Self::CreateClosure { .. } => Opcode::CreateClosure,
            Self::Call { .. } => Opcode::Call,
            Self::New { .. } => Opcode::New,
            Self::CallEval { .. } => Opcode::CallEval,
            Self::Return { .. } => Opcode::Return,
            Self::ReturnUndefined => Opcode::ReturnUndefined,
            Self::End => Opcode::End,
            Self::Jump { .. } => Opcode::Jump,
            Self::JumpIfTrue { .. } => Opcode::JumpIfTrue,
            Self::JumpIfFalse { .. } => Opcode::JumpIfFalse,
            Self::JumpUnwind { .. } => Opcode::JumpUnwind,
            Self::EnterScope { .. } => Opcode::EnterScope,
            Self::EnterWith { .. } => Opcode::EnterWith,
            Self::ExitScope => Opcode::ExitScope,
            Self::Throw { .. } => Opcode::Throw,
            Self::Move { .. } => Opcode::Move,
            Self::Nop => Opcode::Nop,
        }
    }

    /// One past the highest register this instruction reads or writes
    ///
    /// Call windows count every argument register.
    pub fn register_span(&self) -> u32 {
        let top = |r: &Register| r.0 as u32 + 1;
        match self {
            Self::LoadUndefined { dst }
            | Self::LoadNull { dst }
            | Self::LoadTrue { dst }
            | Self::LoadFalse { dst }
            | Self::LoadInt32 { dst, .. }
            | Self::LoadConst { dst, .. }
            | Self::LoadStack { dst, .. }
            | Self::LoadHeap { dst, .. }
            | Self::LoadName { dst, .. }
            | Self::LoadGlobal { dst, .. }
            | Self::LoadThis { dst }
            | Self::LoadArgument { dst, .. }
            | Self::ArgumentCount { dst }
            | Self::NewObject { dst }
            | Self::NewArray { dst, .. }
            | Self::CreateClosure { dst, .. } => top(dst),

            Self::StoreStack { src, .. }
            | Self::StoreHeap { src, .. }
            | Self::StoreName { src, .. }
            | Self::StoreGlobal { src, .. }
            | Self::Return { src }
            | Self::Throw { src } => top(src),

            Self::Add { dst, lhs, rhs }
            | Self::Sub { dst, lhs, rhs }
            | Self::Mul { dst, lhs, rhs }
            | Self::Div { dst, lhs, rhs }
            | Self::Mod { dst, lhs, rhs }
            | Self::BitAnd { dst, lhs, rhs }
            | Self::BitOr { dst, lhs, rhs }
            | Self::BitXor { dst, lhs, rhs }
            | Self::Shl { dst, lhs, rhs }
            | Self::Shr { dst, lhs, rhs }
            | Self::Ushr { dst, lhs, rhs }
            | Self::Eq { dst, lhs, rhs }
            | Self::StrictEq { dst, lhs, rhs }
            | Self::Ne { dst, lhs, rhs }
            | Self::StrictNe { dst, lhs, rhs }
            | Self::Lt { dst, lhs, rhs }
            | Self::Le { dst, lhs, rhs }
            | Self::Gt { dst, lhs, rhs }
            | Self::Ge { dst, lhs, rhs } => top(dst).max(top(lhs)).max(top(rhs)),

            Self::Neg { dst, src }
            | Self::Plus { dst, src }
            | Self::Inc { dst, src }
            | Self::Dec { dst, src }
            | Self::BitNot { dst, src }
            | Self::Not { dst, src }
            | Self::TypeOf { dst, src }
            | Self::Move { dst, src } => top(dst).max(top(src)),

            Self::GetProp { dst, obj, .. } => top(dst).max(top(obj)),
            Self::SetProp { obj, val, .. } => top(obj).max(top(val)),
            Self::GetElem { dst, obj, key } => top(dst).max(top(obj)).max(top(key)),
            Self::SetElem { obj, key, val } => top(obj).max(top(key)).max(top(val)),

            Self::Call { base, argc } => base.0 as u32 + 2 + *argc as u32,
            Self::New { base, argc } => base.0 as u32 + 1 + *argc as u32,
            Self::CallEval { base, argc } => base.0 as u32 + (*argc as u32).max(1),

            Self::JumpIfTrue { cond, .. } | Self::JumpIfFalse { cond, .. } => top(cond),
            Self::EnterWith { obj } => top(obj),

            Self::DeclareVar { .. }
            | Self::ReturnUndefined
            | Self::End
            | Self::Jump { .. }
            | Self::JumpUnwind { .. }
            | Self::EnterScope { .. }
            | Self::ExitScope
            | Self::Nop => 0,
        }
    }

    /// Jump destination, if this is a jump
    pub fn jump_target(&self) -> Option<JumpTarget> {
        match self {
            Self::Jump { target }
            | Self::JumpIfTrue { target, .. }
            | Self::JumpIfFalse { target, .. }
            | Self::JumpUnwind { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Constant operand naming a binding or property, if any
    pub fn name_operand(&self) -> Option<ConstantIndex> {
        match self {
            Self::LoadName { name, .. }
            | Self::StoreName { name, .. }
            | Self::DeclareVar { name }
            | Self::LoadGlobal { name, .. }
            | Self::StoreGlobal { name, .. }
            | Self::GetProp { name, .. }
            | Self::SetProp { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Feedback vector slot used by this instruction, if any
    pub fn ic_index(&self) -> Option<u16> {
        match self {
            Self::LoadGlobal { ic_index, .. }
            | Self::StoreGlobal { ic_index, .. }
            | Self::GetProp { ic_index, .. }
            | Self::SetProp { ic_index, .. } => Some(*ic_index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op));
        }
    }

    #[test]
    fn test_opcode_tags_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in Opcode::ALL {
            assert!(seen.insert(op.to_byte()), "duplicate tag for {}", op.name());
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn test_opcode_name() {
        assert_eq!(Opcode::Add.name(), "Add");
        assert_eq!(Opcode::JumpUnwind.name(), "JumpUnwind");
        assert_eq!(Instruction::End.opcode(), Opcode::End);
    }

    #[test]
    fn test_call_window_span() {
        let call = Instruction::Call {
            base: Register(4),
            argc: 3,
        };
        // receiver r4, callee r5, args r6..r8
        assert_eq!(call.register_span(), 9);

        let new = Instruction::New {
            base: Register(0),
            argc: 0,
        };
        assert_eq!(new.register_span(), 1);
    }
}
