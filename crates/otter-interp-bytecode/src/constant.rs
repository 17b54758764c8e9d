//! Constant pool for code units

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A constant value in the constant pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// 64-bit floating point number
    Number(f64),
    /// String value
    String(Box<str>),
}

impl Constant {
    /// Create a number constant
    #[inline]
    pub fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create a string constant
    #[inline]
    pub fn string(s: impl Into<Box<str>>) -> Self {
        Self::String(s.into())
    }

    /// Check if this is a number
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Check if this is a string
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Get as number if this is a number constant
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string if this is a string constant
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Constant pool with deduplication
///
/// Numbers are deduplicated by bit pattern so `0.0` and `-0.0` (and distinct
/// NaN payloads) keep separate entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    #[serde(skip)]
    strings: FxHashMap<Box<str>, u32>,
    #[serde(skip)]
    numbers: FxHashMap<u64, u32>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant to the pool, returns its index
    pub fn add(&mut self, constant: Constant) -> u32 {
        let existing = match &constant {
            Constant::Number(n) => self.numbers.get(&n.to_bits()),
            Constant::String(s) => self.strings.get(s),
        };
        if let Some(&idx) = existing {
            return idx;
        }

        let idx = self.constants.len() as u32;
        match &constant {
            Constant::Number(n) => {
                self.numbers.insert(n.to_bits(), idx);
            }
            Constant::String(s) => {
                self.strings.insert(s.clone(), idx);
            }
        }
        self.constants.push(constant);
        idx
    }

    /// Add a number constant
    #[inline]
    pub fn add_number(&mut self, n: f64) -> u32 {
        self.add(Constant::number(n))
    }

    /// Add a string constant
    #[inline]
    pub fn add_string(&mut self, s: &str) -> u32 {
        self.add(Constant::string(s))
    }

    /// Get a constant by index
    #[inline]
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// Get a string constant by index
    #[inline]
    pub fn get_str(&self, index: u32) -> Option<&str> {
        self.get(index).and_then(Constant::as_str)
    }

    /// Number of constants in the pool
    #[inline]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over constants
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }

    /// Rebuild dedup indexes after deserialization
    pub(crate) fn reindex(&mut self) {
        self.strings.clear();
        self.numbers.clear();
        for (idx, constant) in self.constants.iter().enumerate() {
            match constant {
                Constant::Number(n) => {
                    self.numbers.entry(n.to_bits()).or_insert(idx as u32);
                }
                Constant::String(s) => {
                    self.strings.entry(s.clone()).or_insert(idx as u32);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_pool_dedup() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add_string("hello");
        let idx2 = pool.add_string("world");
        let idx3 = pool.add_string("hello");

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_signed_zero_kept_apart() {
        let mut pool = ConstantPool::new();

        let pos = pool.add_number(0.0);
        let neg = pool.add_number(-0.0);

        assert_ne!(pos, neg);
        assert!(pool.get(neg).unwrap().as_number().unwrap().is_sign_negative());
    }

    #[test]
    fn test_constant_get() {
        let mut pool = ConstantPool::new();
        pool.add_string("test");
        pool.add_number(123.0);

        assert_eq!(pool.get_str(0), Some("test"));
        assert_eq!(pool.get(1), Some(&Constant::Number(123.0)));
        assert_eq!(pool.get(2), None);
        assert_eq!(pool.get_str(1), None);
    }
}
