//! Bytecode operands

use serde::{Deserialize, Serialize};

/// Index into the frame's register file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Register(pub u16);

impl Register {
    /// Create a new register
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Register `n` slots after this one (call windows)
    #[inline]
    pub const fn offset(self, n: u16) -> Self {
        Self(self.0 + n)
    }
}

impl From<u16> for Register {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

/// Index into the constant pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConstantIndex(pub u32);

impl ConstantIndex {
    /// Create a new constant index
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Index into the frame's stack storage (frame-local bindings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StackIndex(pub u16);

impl StackIndex {
    /// Create a new stack index
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Index into a code unit's nested function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FunctionIndex(pub u32);

impl FunctionIndex {
    /// Create a new function index
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Absolute instruction index used as a jump destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct JumpTarget(pub u32);

impl JumpTarget {
    /// Create a new jump target
    #[inline]
    pub const fn new(target: u32) -> Self {
        Self(target)
    }

    /// Get the instruction index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register() {
        let r = Register::new(5);
        assert_eq!(r.index(), 5);
        assert_eq!(r.offset(2), Register(7));
    }

    #[test]
    fn test_jump_target() {
        assert_eq!(JumpTarget::new(12).index(), 12usize);
    }
}
