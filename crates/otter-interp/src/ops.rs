//! Arithmetic, comparison and conversion operators
//!
//! Each operator takes the int32 fast path first and falls back to the
//! double path, then to the coercing slow path. Coercions that can run
//! script (`valueOf`, `toString`) live on the [`Interpreter`].

use crate::convert::{string_to_number, to_int32, to_uint32};
use crate::error::{VmError, VmResult};
use crate::interpreter::Interpreter;
use crate::object::PropertyKey;
use crate::string::JsString;
use crate::value::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Conversion hint for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    /// No hint (`+`, `==`); dates behave as `String`
    Default,
    /// `valueOf` first
    Number,
    /// `toString` first
    String,
}

impl Interpreter {
    /// ToPrimitive
    pub fn to_primitive(&mut self, value: &Value, hint: PreferredType) -> VmResult<Value> {
        let Value::Object(obj) = value else {
            return Ok(value.clone());
        };
        let hint = match hint {
            PreferredType::Default if obj.is_date() => PreferredType::String,
            other => other,
        };
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Default | PreferredType::Number => ["valueOf", "toString"],
        };
        for name in order {
            let method = obj.get(&PropertyKey::from(name));
            if !method.is_callable() {
                continue;
            }
            let result = self.call(&method, value.clone(), &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
        Err(VmError::type_error("Cannot convert object to primitive value"))
    }

    /// ToNumber
    pub fn to_number(&mut self, value: &Value) -> VmResult<f64> {
        Ok(match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Int32(n) => f64::from(*n),
            Value::Double(n) => *n,
            Value::String(s) => string_to_number(s.as_str()),
            Value::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::Number)?;
                return self.to_number(&prim);
            }
        })
    }

    /// ToString
    pub fn to_string(&mut self, value: &Value) -> VmResult<Arc<JsString>> {
        Ok(match value {
            Value::String(s) => Arc::clone(s),
            Value::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                return self.to_string(&prim);
            }
            other => Arc::new(JsString::new(other.describe())),
        })
    }

    /// ToPropertyKey
    pub fn to_property_key(&mut self, value: &Value) -> VmResult<PropertyKey> {
        Ok(match value {
            Value::Int32(n) if *n >= 0 => PropertyKey::Index(*n as u32),
            Value::String(s) => PropertyKey::from_js_string(Arc::clone(s)),
            other => PropertyKey::from_js_string(self.to_string(other)?),
        })
    }

    /// Binary `+`
    pub fn add(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        if let (Value::Int32(a), Value::Int32(b)) = (lhs, rhs) {
            return Ok(match a.checked_add(*b) {
                Some(sum) => Value::Int32(sum),
                None => Value::Double(f64::from(*a) + f64::from(*b)),
            });
        }
        if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
            return Ok(Value::number(a + b));
        }

        let left = self.to_primitive(lhs, PreferredType::Default)?;
        let right = self.to_primitive(rhs, PreferredType::Default)?;
        if left.is_string() || right.is_string() {
            let left = self.to_string(&left)?;
            let right = self.to_string(&right)?;
            return Ok(Value::String(left.concat(&right)));
        }
        let a = self.to_number(&left)?;
        let b = self.to_number(&right)?;
        Ok(Value::number(a + b))
    }

    /// Binary `-`
    pub fn sub(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        if let (Value::Int32(a), Value::Int32(b)) = (lhs, rhs) {
            return Ok(match a.checked_sub(*b) {
                Some(diff) => Value::Int32(diff),
                None => Value::Double(f64::from(*a) - f64::from(*b)),
            });
        }
        let (a, b) = self.numeric_operands(lhs, rhs)?;
        Ok(Value::number(a - b))
    }

    /// Binary `*`
    pub fn multiply(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        if let (Value::Int32(a), Value::Int32(b)) = (lhs, rhs) {
            let (a, b) = (*a, *b);
            // 0 * negative is -0, which int32 cannot hold
            let negative_zero = (a == 0 || b == 0) && (a < 0 || b < 0);
            if !negative_zero && let Some(product) = a.checked_mul(b) {
                return Ok(Value::Int32(product));
            }
            return Ok(Value::number(f64::from(a) * f64::from(b)));
        }
        let (a, b) = self.numeric_operands(lhs, rhs)?;
        Ok(Value::number(a * b))
    }

    /// Binary `/`
    pub fn divide(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let (a, b) = self.numeric_operands(lhs, rhs)?;
        Ok(Value::number(a / b))
    }

    /// Binary `%`
    pub fn modulo(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        if let (Value::Int32(a), Value::Int32(b)) = (lhs, rhs)
            && *a > 0
            && *b != 0
        {
            // a > 0 rules out i32::MIN % -1
            return Ok(Value::Int32(a % b));
        }
        let (a, b) = self.numeric_operands(lhs, rhs)?;
        Ok(Value::number(float_mod(a, b)))
    }

    /// Unary `-`
    pub fn negate(&mut self, value: &Value) -> VmResult<Value> {
        if let Value::Int32(n) = value
            && *n != 0
            && let Some(neg) = n.checked_neg()
        {
            return Ok(Value::Int32(neg));
        }
        let n = self.to_number(value)?;
        Ok(Value::number(-n))
    }

    /// Unary `+`
    pub fn unary_plus(&mut self, value: &Value) -> VmResult<Value> {
        if value.is_number() {
            return Ok(value.clone());
        }
        let n = self.to_number(value)?;
        Ok(Value::number(n))
    }

    /// `++`
    pub fn increment(&mut self, value: &Value) -> VmResult<Value> {
        if let Value::Int32(n) = value
            && *n != i32::MAX
        {
            return Ok(Value::Int32(n + 1));
        }
        let n = self.to_number(value)?;
        Ok(Value::number(n + 1.0))
    }

    /// `--`
    pub fn decrement(&mut self, value: &Value) -> VmResult<Value> {
        if let Value::Int32(n) = value
            && *n != i32::MIN
        {
            return Ok(Value::Int32(n - 1));
        }
        let n = self.to_number(value)?;
        Ok(Value::number(n - 1.0))
    }

    fn int32_operands(&mut self, lhs: &Value, rhs: &Value) -> VmResult<(i32, i32)> {
        if let (Value::Int32(a), Value::Int32(b)) = (lhs, rhs) {
            return Ok((*a, *b));
        }
        let a = self.to_number(lhs)?;
        let b = self.to_number(rhs)?;
        Ok((to_int32(a), to_int32(b)))
    }

    /// `&`
    pub fn bit_and(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let (a, b) = self.int32_operands(lhs, rhs)?;
        Ok(Value::Int32(a & b))
    }

    /// `|`
    pub fn bit_or(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let (a, b) = self.int32_operands(lhs, rhs)?;
        Ok(Value::Int32(a | b))
    }

    /// `^`
    pub fn bit_xor(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let (a, b) = self.int32_operands(lhs, rhs)?;
        Ok(Value::Int32(a ^ b))
    }

    /// `~`
    pub fn bit_not(&mut self, value: &Value) -> VmResult<Value> {
        let n = match value {
            Value::Int32(n) => *n,
            other => to_int32(self.to_number(other)?),
        };
        Ok(Value::Int32(!n))
    }

    /// `<<`
    pub fn shl(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let (a, b) = self.int32_operands(lhs, rhs)?;
        Ok(Value::Int32(a.wrapping_shl(b as u32 & 0x1f)))
    }

    /// `>>`
    pub fn shr(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let (a, b) = self.int32_operands(lhs, rhs)?;
        Ok(Value::Int32(a >> (b as u32 & 0x1f)))
    }

    /// `>>>`
    pub fn ushr(&mut self, lhs: &Value, rhs: &Value) -> VmResult<Value> {
        let a = match lhs {
            Value::Int32(n) => *n as u32,
            other => to_uint32(self.to_number(other)?),
        };
        let b = match rhs {
            Value::Int32(n) => *n as u32,
            other => to_uint32(self.to_number(other)?),
        };
        let result = a >> (b & 0x1f);
        Ok(match i32::try_from(result) {
            Ok(n) => Value::Int32(n),
            Err(_) => Value::Double(f64::from(result)),
        })
    }

    /// `<` with an explicit evaluation order for the conversions
    ///
    /// `a > b` is evaluated as `less_than(b, a, false)` so the left operand
    /// of the source expression is still converted first.
    pub fn less_than(&mut self, lhs: &Value, rhs: &Value, left_first: bool) -> VmResult<bool> {
        self.relational(lhs, rhs, left_first, |ord| ord == Ordering::Less)
    }

    /// `<=` with an explicit evaluation order for the conversions
    pub fn less_than_or_equal(&mut self, lhs: &Value, rhs: &Value, left_first: bool) -> VmResult<bool> {
        self.relational(lhs, rhs, left_first, |ord| ord != Ordering::Greater)
    }

    fn relational(
        &mut self,
        lhs: &Value,
        rhs: &Value,
        left_first: bool,
        accept: fn(Ordering) -> bool,
    ) -> VmResult<bool> {
        if let (Value::Int32(a), Value::Int32(b)) = (lhs, rhs) {
            return Ok(accept(a.cmp(b)));
        }
        if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
            return Ok(a.partial_cmp(&b).is_some_and(accept));
        }

        let (left, right) = if left_first {
            let left = self.to_primitive(lhs, PreferredType::Number)?;
            let right = self.to_primitive(rhs, PreferredType::Number)?;
            (left, right)
        } else {
            let right = self.to_primitive(rhs, PreferredType::Number)?;
            let left = self.to_primitive(lhs, PreferredType::Number)?;
            (left, right)
        };

        match (&left, &right) {
            (Value::Int32(a), Value::Int32(b)) => Ok(accept(a.cmp(b))),
            (Value::String(a), Value::String(b)) => Ok(accept(a.cmp_utf16(b))),
            _ => {
                let a = self.to_number(&left)?;
                let b = self.to_number(&right)?;
                Ok(a.partial_cmp(&b).is_some_and(accept))
            }
        }
    }

    /// Abstract equality (`==`)
    pub fn loose_equals(&mut self, lhs: &Value, rhs: &Value) -> VmResult<bool> {
        Ok(match (lhs, rhs) {
            (a, b) if same_type(a, b) => a.strict_equals(b),
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (Value::String(s), n) | (n, Value::String(s)) if n.is_number() => {
                n.as_number() == Some(string_to_number(s.as_str()))
            }
            (Value::Boolean(b), other) | (other, Value::Boolean(b)) => {
                let b = Value::Int32(i32::from(*b));
                return self.loose_equals(&b, other);
            }
            (Value::Object(_), prim) | (prim, Value::Object(_))
                if prim.is_number() || prim.is_string() =>
            {
                let obj = if lhs.is_object() { lhs } else { rhs };
                let converted = self.to_primitive(obj, PreferredType::Default)?;
                return self.loose_equals(&converted, prim);
            }
            _ => false,
        })
    }

    fn numeric_operands(&mut self, lhs: &Value, rhs: &Value) -> VmResult<(f64, f64)> {
        let a = self.to_number(lhs)?;
        let b = self.to_number(rhs)?;
        Ok((a, b))
    }
}

fn same_type(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined)
        | (Value::Null, Value::Null)
        | (Value::Boolean(_), Value::Boolean(_))
        | (Value::String(_), Value::String(_))
        | (Value::Object(_), Value::Object(_)) => true,
        _ => a.is_number() && b.is_number(),
    }
}

/// Number `%` on doubles
pub fn float_mod(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || b == 0.0 || a.is_infinite() {
        return f64::NAN;
    }
    if b.is_infinite() || a == 0.0 {
        return a;
    }
    let r = a.abs() % b.abs();
    if a.is_sign_negative() { -r } else { r }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreter {
        Interpreter::new()
    }

    #[test]
    fn test_add_overflow_promotes() {
        let mut i = interp();
        let r = i.add(&Value::int32(i32::MAX), &Value::int32(2)).unwrap();
        assert!(r.is_double());
        assert_eq!(r.as_number(), Some(2147483649.0));
        let r = i.add(&Value::int32(1), &Value::int32(2)).unwrap();
        assert_eq!(r.as_int32(), Some(3));
    }

    #[test]
    fn test_add_concatenates_strings() {
        let mut i = interp();
        let r = i.add(&Value::string("a"), &Value::int32(1)).unwrap();
        assert_eq!(r.as_string().unwrap().as_str(), "a1");
        let r = i.add(&Value::double(1.5), &Value::string("x")).unwrap();
        assert_eq!(r.as_string().unwrap().as_str(), "1.5x");
        let r = i.add(&Value::boolean(true), &Value::null()).unwrap();
        assert_eq!(r.as_int32(), Some(1));
    }

    #[test]
    fn test_computed_strings_not_interned() {
        let mut i = interp();
        let s = i.to_string(&Value::int32(918273645)).unwrap();
        assert_eq!(Arc::strong_count(&s), 1);
        assert!(!JsString::is_interned("918273645"));

        let r = i.add(&Value::string("k"), &Value::double(0.618034987)).unwrap();
        assert_eq!(r.as_string().unwrap().as_str(), "k0.618034987");
        drop(r);
        assert!(!JsString::is_interned("0.618034987"));
        assert!(!JsString::is_interned("k0.618034987"));
    }

    #[test]
    fn test_multiply_negative_zero() {
        let mut i = interp();
        assert!(i.multiply(&Value::int32(-1), &Value::int32(0)).unwrap().is_negative_zero());
        assert!(i.multiply(&Value::int32(0), &Value::int32(-5)).unwrap().is_negative_zero());
        assert_eq!(i.multiply(&Value::int32(0), &Value::int32(5)).unwrap().as_int32(), Some(0));
        let big = i.multiply(&Value::int32(65536), &Value::int32(65536)).unwrap();
        assert_eq!(big.as_number(), Some(4294967296.0));
    }

    #[test]
    fn test_modulo_edges() {
        let mut i = interp();
        let nan = |v: Value| v.as_number().is_some_and(f64::is_nan);
        assert!(nan(i.modulo(&Value::double(f64::NAN), &Value::int32(5)).unwrap()));
        assert!(nan(i.modulo(&Value::int32(5), &Value::int32(0)).unwrap()));
        assert!(nan(i.modulo(&Value::double(f64::INFINITY), &Value::int32(5)).unwrap()));
        assert_eq!(
            i.modulo(&Value::int32(5), &Value::double(f64::INFINITY)).unwrap().as_int32(),
            Some(5)
        );
        assert!(i.modulo(&Value::double(-0.0), &Value::int32(5)).unwrap().is_negative_zero());
        assert!(i.modulo(&Value::int32(-4), &Value::int32(2)).unwrap().is_negative_zero());
        assert_eq!(i.modulo(&Value::int32(-7), &Value::int32(3)).unwrap().as_int32(), Some(-1));
        assert_eq!(i.modulo(&Value::int32(7), &Value::int32(-3)).unwrap().as_int32(), Some(1));
    }

    #[test]
    fn test_increment_limits() {
        let mut i = interp();
        let r = i.increment(&Value::int32(i32::MAX)).unwrap();
        assert!(r.is_double());
        let r = i.decrement(&Value::int32(i32::MIN)).unwrap();
        assert_eq!(r.as_number(), Some(-2147483649.0));
        assert!(i.negate(&Value::int32(0)).unwrap().is_negative_zero());
        assert!(i.negate(&Value::int32(i32::MIN)).unwrap().is_double());
    }

    #[test]
    fn test_shifts() {
        let mut i = interp();
        assert_eq!(i.shl(&Value::int32(1), &Value::int32(33)).unwrap().as_int32(), Some(2));
        assert_eq!(i.shr(&Value::int32(-8), &Value::int32(1)).unwrap().as_int32(), Some(-4));
        let r = i.ushr(&Value::int32(-1), &Value::int32(0)).unwrap();
        assert_eq!(r.as_number(), Some(4294967295.0));
        assert!(r.is_double());
        assert_eq!(i.ushr(&Value::int32(-1), &Value::int32(28)).unwrap().as_int32(), Some(15));
    }

    #[test]
    fn test_relational() {
        let mut i = interp();
        let nan = Value::double(f64::NAN);
        assert!(!i.less_than(&nan, &Value::int32(1), true).unwrap());
        assert!(!i.less_than(&Value::int32(1), &nan, true).unwrap());
        assert!(i.less_than(&Value::string("10"), &Value::string("9"), true).unwrap());
        assert!(!i.less_than(&Value::int32(10), &Value::int32(9), true).unwrap());
        assert!(i.less_than(&Value::string("2"), &Value::int32(10), true).unwrap());
        assert!(i.less_than_or_equal(&Value::int32(3), &Value::double(3.0), true).unwrap());
        assert!(!i.less_than_or_equal(&Value::undefined(), &Value::int32(0), true).unwrap());
    }

    #[test]
    fn test_loose_equals() {
        let mut i = interp();
        assert!(i.loose_equals(&Value::null(), &Value::undefined()).unwrap());
        assert!(i.loose_equals(&Value::int32(1), &Value::string("1")).unwrap());
        assert!(i.loose_equals(&Value::boolean(true), &Value::string("1")).unwrap());
        assert!(!i.loose_equals(&Value::null(), &Value::int32(0)).unwrap());
        assert!(!i.loose_equals(&Value::double(f64::NAN), &Value::double(f64::NAN)).unwrap());
    }

    #[test]
    fn test_float_mod_sign() {
        assert_eq!(float_mod(5.5, 2.0), 1.5);
        assert_eq!(float_mod(-5.5, 2.0), -1.5);
        assert!(float_mod(-0.0, 3.0).is_sign_negative());
    }
}
