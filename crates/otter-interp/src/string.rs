//! JavaScript string primitive
//!
//! Strings are immutable. Names that flow through property keys and bindings
//! are interned in a process-wide table so repeated lookups share one
//! allocation; computed strings (concatenation, number formatting) are not.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// Global string intern table
static STRING_TABLE: LazyLock<DashMap<Arc<str>, Arc<JsString>>> = LazyLock::new(DashMap::new);

/// An immutable JavaScript string
pub struct JsString {
    value: Arc<str>,
    hash: u64,
}

impl JsString {
    /// Create or retrieve an interned string
    pub fn intern(s: &str) -> Arc<Self> {
        if let Some(existing) = STRING_TABLE.get(s) {
            return Arc::clone(existing.value());
        }
        let string = Arc::new(Self::new(s));
        STRING_TABLE
            .entry(Arc::clone(&string.value))
            .or_insert(string)
            .value()
            .clone()
    }

    /// Create a string without interning
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        let value = s.into();
        let hash = Self::compute_hash(&value);
        Self { value, hash }
    }

    /// Get as str
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Length in UTF-16 code units (the JS `length`)
    pub fn len_utf16(&self) -> usize {
        self.value.encode_utf16().count()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get the precomputed hash
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Concatenate two strings
    pub fn concat(&self, other: &JsString) -> Arc<Self> {
        let mut result = String::with_capacity(self.value.len() + other.value.len());
        result.push_str(&self.value);
        result.push_str(&other.value);
        Arc::new(Self::new(result))
    }

    /// The one-code-unit string at a UTF-16 index
    ///
    /// A lone surrogate half is returned as U+FFFD since `str` cannot hold it.
    pub fn code_unit_at(&self, index: usize) -> Option<Arc<Self>> {
        let unit = self.value.encode_utf16().nth(index)?;
        let ch = char::decode_utf16([unit])
            .next()
            .and_then(Result::ok)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut buf = [0u8; 4];
        Some(Self::intern(ch.encode_utf8(&mut buf)))
    }

    /// Lexicographic comparison by UTF-16 code units
    pub fn cmp_utf16(&self, other: &JsString) -> Ordering {
        self.value.encode_utf16().cmp(other.value.encode_utf16())
    }

    #[cfg(test)]
    pub(crate) fn is_interned(s: &str) -> bool {
        STRING_TABLE.contains_key(s)
    }

    fn compute_hash(s: &str) -> u64 {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Debug for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.value)
    }
}

impl std::fmt::Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_shares_allocation() {
        let a = JsString::intern("shared-name");
        let b = JsString::intern("shared-name");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concat() {
        let a = JsString::intern("foo");
        let b = JsString::intern("bar");
        assert_eq!(a.concat(&b).as_str(), "foobar");
    }

    #[test]
    fn test_utf16_ordering() {
        // U+FF61 sorts after U+1F600 by code point but before it by code unit
        let astral = JsString::new("\u{1F600}");
        let bmp = JsString::new("\u{FF61}");
        assert_eq!(astral.cmp_utf16(&bmp), Ordering::Less);
        assert_eq!(JsString::new("10").cmp_utf16(&JsString::new("9")), Ordering::Less);
    }

    #[test]
    fn test_code_unit_at() {
        let s = JsString::intern("abc");
        assert_eq!(s.code_unit_at(1).unwrap().as_str(), "b");
        assert!(s.code_unit_at(3).is_none());
        assert_eq!(JsString::new("\u{1F600}").len_utf16(), 2);
    }
}
