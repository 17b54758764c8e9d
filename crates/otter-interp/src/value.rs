//! JavaScript values
//!
//! A tagged enum with exactly one active kind. Numbers use two tags: `Int32`
//! for integral values that fit in 32 bits and `Double` for everything else.
//! [`Value::number`] picks the tag, so an int32 never holds a value that
//! needed promotion and negative zero always lives in the double tag.

use crate::convert::number_to_string;
use crate::object::JsObject;
use crate::string::JsString;
use std::sync::Arc;

/// A JavaScript value
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Integral number representable as i32 (never negative zero)
    Int32(i32),
    /// Any other number
    Double(f64),
    /// String primitive
    String(Arc<JsString>),
    /// Heap object (plain, array, function, date)
    Object(Arc<JsObject>),
}

impl Value {
    /// Create undefined value
    #[inline]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// Create null value
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Create boolean value
    #[inline]
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Create int32 value
    #[inline]
    pub const fn int32(n: i32) -> Self {
        Self::Int32(n)
    }

    /// Create a number, using the int32 tag when the value allows it
    #[inline]
    pub fn number(n: f64) -> Self {
        let i = n as i32;
        if i as f64 == n && !(i == 0 && n.is_sign_negative()) {
            Self::Int32(i)
        } else {
            Self::Double(n)
        }
    }

    /// Create a number that always carries the double tag
    #[inline]
    pub const fn double(n: f64) -> Self {
        Self::Double(n)
    }

    /// Create an interned string value
    pub fn string(s: &str) -> Self {
        Self::String(JsString::intern(s))
    }

    /// Create a string value outside the intern table (runtime results)
    pub fn computed_string(s: impl Into<Arc<str>>) -> Self {
        Self::String(Arc::new(JsString::new(s)))
    }

    /// Create object value
    #[inline]
    pub fn object(obj: Arc<JsObject>) -> Self {
        Self::Object(obj)
    }

    /// Check if undefined
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check if null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if null or undefined
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Check if int32 tag
    #[inline]
    pub fn is_int32(&self) -> bool {
        matches!(self, Self::Int32(_))
    }

    /// Check if double tag
    #[inline]
    pub fn is_double(&self) -> bool {
        matches!(self, Self::Double(_))
    }

    /// Check if either number tag
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int32(_) | Self::Double(_))
    }

    /// Check if string
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Check if object
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Check if callable
    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(|o| o.is_callable())
    }

    /// Check for the double tag holding negative zero
    pub fn is_negative_zero(&self) -> bool {
        matches!(self, Self::Double(n) if *n == 0.0 && n.is_sign_negative())
    }

    /// Get as boolean
    #[inline]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as int32 (only the int32 tag)
    #[inline]
    pub fn as_int32(&self) -> Option<i32> {
        match self {
            Self::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as f64 (either number tag)
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int32(n) => Some(*n as f64),
            Self::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string
    #[inline]
    pub fn as_string(&self) -> Option<&Arc<JsString>> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object
    #[inline]
    pub fn as_object(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Int32(n) => *n != 0,
            Self::Double(n) => !(*n == 0.0 || n.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// The `typeof` operator result
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Boolean(_) => "boolean",
            Self::Int32(_) | Self::Double(_) => "number",
            Self::String(_) => "string",
            Self::Object(o) if o.is_callable() => "function",
            Self::Object(_) => "object",
        }
    }

    /// Strict equality (`===`)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::String(a), Self::String(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (a, b) => match (a.as_number(), b.as_number()) {
                // NaN != NaN, +0 == -0
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Printable form that never runs script
    ///
    /// Primitives print as their ToString; objects as a kind tag.
    pub fn describe(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Int32(n) => n.to_string(),
            Self::Double(n) => number_to_string(*n),
            Self::String(s) => s.as_str().to_string(),
            Self::Object(o) => o.describe(),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Int32(n) => write!(f, "{n}i"),
            Self::Double(n) => write!(f, "{n:?}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(o) => write!(f, "{}", o.describe()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int32(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<Arc<JsString>> for Value {
    fn from(s: Arc<JsString>) -> Self {
        Self::String(s)
    }
}

impl From<Arc<JsObject>> for Value {
    fn from(o: Arc<JsObject>) -> Self {
        Self::Object(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_tag_selection() {
        assert_eq!(Value::number(42.0).as_int32(), Some(42));
        assert!(Value::number(1.5).is_double());
        assert!(Value::number(2147483648.0).is_double());
        assert!(Value::number(-0.0).is_negative_zero());
        assert!(Value::number(f64::NAN).is_double());
        assert_eq!(Value::number(-2147483648.0).as_int32(), Some(i32::MIN));
    }

    #[test]
    fn test_to_boolean() {
        assert!(!Value::undefined().to_boolean());
        assert!(!Value::null().to_boolean());
        assert!(!Value::int32(0).to_boolean());
        assert!(!Value::double(-0.0).to_boolean());
        assert!(!Value::double(f64::NAN).to_boolean());
        assert!(!Value::string("").to_boolean());
        assert!(Value::string("0").to_boolean());
        assert!(Value::double(0.5).to_boolean());
    }

    #[test]
    fn test_strict_equals() {
        assert!(Value::int32(1).strict_equals(&Value::double(1.0)));
        assert!(Value::int32(0).strict_equals(&Value::double(-0.0)));
        assert!(!Value::double(f64::NAN).strict_equals(&Value::double(f64::NAN)));
        assert!(Value::string("ab").strict_equals(&Value::String(Arc::new(JsString::new("ab")))));
        assert!(!Value::undefined().strict_equals(&Value::null()));
        assert!(!Value::int32(1).strict_equals(&Value::string("1")));
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::null().type_of(), "object");
        assert_eq!(Value::double(1.5).type_of(), "number");
        assert_eq!(Value::string("x").type_of(), "string");
        assert_eq!(Value::boolean(true).type_of(), "boolean");
    }
}
