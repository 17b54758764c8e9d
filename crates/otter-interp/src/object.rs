//! JavaScript objects
//!
//! Named properties live in a slot vector described by the object's
//! [`Shape`]. Arrays additionally keep a dense element vector (holes are
//! `None`) that index keys use before falling back to the shape.

use crate::call::NativeCall;
use crate::code::CompiledCode;
use crate::convert::canonical_array_index;
use crate::error::VmResult;
use crate::interpreter::Interpreter;
use crate::realm::Realm;
use crate::scope::ScopeLink;
use crate::shape::{PropertySlot, Shape};
use crate::string::JsString;
use crate::value::Value;
use parking_lot::RwLock;
use std::sync::Arc;

/// Index writes further than this past the end of an array's dense
/// storage are stored as ordinary properties instead of growing it.
const MAX_DENSE_GAP: u32 = 1 << 16;

/// Property key (string or array index)
///
/// Strings that spell a canonical array index are always stored as
/// `Index`, so `o["1"]` and `o[1]` name the same property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Arc<JsString>),
    /// Integer index
    Index(u32),
}

impl PropertyKey {
    /// Create a property key from a string, canonicalizing indices
    pub fn string(s: &str) -> Self {
        match canonical_array_index(s) {
            Some(i) => Self::Index(i),
            None => Self::String(JsString::intern(s)),
        }
    }

    /// Create from a string Arc, canonicalizing indices
    pub fn from_js_string(s: Arc<JsString>) -> Self {
        match canonical_array_index(s.as_str()) {
            Some(i) => Self::Index(i),
            None => Self::String(s),
        }
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Get the index, if this is an index key
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            Self::String(_) => None,
        }
    }

    /// Check for a specific string name
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, Self::String(s) if s.as_str() == name)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Property attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyAttributes {
    /// Property is writable
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default data property attributes
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// Writable but hidden from enumeration (builtin methods)
    pub const fn builtin() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }
}

impl Default for PropertyAttributes {
    fn default() -> Self {
        Self::data()
    }
}

/// Native function body
pub type NativeFn = Arc<dyn Fn(&mut Interpreter, &NativeCall) -> VmResult<Value> + Send + Sync>;

/// Allocates the receiver when a native constructor is invoked with `new`
pub type AllocHook = Arc<dyn Fn(&Realm) -> Arc<JsObject> + Send + Sync>;

/// A function implemented in Rust
pub struct NativeFunction {
    /// Function name
    pub name: String,
    /// Declared parameter count; shorter argument lists are padded to it
    pub param_count: u16,
    /// Function body
    pub func: NativeFn,
    /// Present on constructible natives
    pub alloc: Option<AllocHook>,
}

/// A closure over compiled bytecode
pub struct ScriptFunction {
    /// Compiled body shared by every closure of the same function
    pub code: Arc<CompiledCode>,
    /// Scope captured at creation
    pub scope: ScopeLink,
}

/// Callable object payload
pub enum FunctionKind {
    /// Bytecode function
    Script(ScriptFunction),
    /// Native function
    Native(NativeFunction),
}

impl FunctionKind {
    /// Can be invoked with `new`
    pub fn is_constructor(&self) -> bool {
        match self {
            Self::Script(f) => f.code.unit().flags.is_constructor,
            Self::Native(f) => f.alloc.is_some(),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        match self {
            Self::Script(f) => f.code.unit().name.as_deref().unwrap_or(""),
            Self::Native(f) => &f.name,
        }
    }
}

/// Object kind
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array with dense element storage
    Array,
    /// Date with its time value; prefers string conversion in `+`
    Date(f64),
    /// Callable object
    Function(FunctionKind),
}

struct Properties {
    shape: Arc<Shape>,
    slots: Vec<Value>,
}

/// A JavaScript object
pub struct JsObject {
    kind: ObjectKind,
    properties: RwLock<Properties>,
    elements: RwLock<Vec<Option<Value>>>,
    prototype: RwLock<Option<Arc<JsObject>>>,
}

impl JsObject {
    /// Create a new object with the given kind, prototype and empty shape
    pub fn new(kind: ObjectKind, prototype: Option<Arc<JsObject>>, root: Arc<Shape>) -> Self {
        Self {
            kind,
            properties: RwLock::new(Properties {
                shape: root,
                slots: Vec::new(),
            }),
            elements: RwLock::new(Vec::new()),
            prototype: RwLock::new(prototype),
        }
    }

    /// Create an array of `len` holes
    pub fn array(len: u32, prototype: Option<Arc<JsObject>>, root: Arc<Shape>) -> Self {
        let obj = Self::new(ObjectKind::Array, prototype, root);
        obj.elements.write().resize(len as usize, None);
        obj
    }

    /// Get the object kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Check if array
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }

    /// Check if date
    pub fn is_date(&self) -> bool {
        matches!(self.kind, ObjectKind::Date(_))
    }

    /// Get the function payload
    pub fn as_function(&self) -> Option<&FunctionKind> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Check if callable
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    /// Check if constructible
    pub fn is_constructor(&self) -> bool {
        self.as_function().is_some_and(FunctionKind::is_constructor)
    }

    /// `Object.prototype.toString` tag
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::Date(_) => "Date",
            ObjectKind::Function(_) => "Function",
        }
    }

    /// Printable form for error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            ObjectKind::Function(f) if f.name().is_empty() => "function <anonymous>".to_string(),
            ObjectKind::Function(f) => format!("function {}", f.name()),
            _ => format!("[object {}]", self.class_name()),
        }
    }

    // ---- shape / slots ----

    /// Current shape
    pub fn shape(&self) -> Arc<Shape> {
        Arc::clone(&self.properties.read().shape)
    }

    /// Identity check against a cached shape
    #[inline]
    pub fn shape_is(&self, shape: &Arc<Shape>) -> bool {
        Arc::ptr_eq(&self.properties.read().shape, shape)
    }

    /// Own named property slot
    pub fn find_property_slot(&self, key: &PropertyKey) -> Option<PropertySlot> {
        self.properties.read().shape.lookup(key)
    }

    /// Read a slot by index
    pub fn get_slot(&self, offset: u32) -> Value {
        self.properties
            .read()
            .slots
            .get(offset as usize)
            .cloned()
            .unwrap_or_default()
    }

    /// Write a slot by index
    pub fn set_slot(&self, offset: u32, value: Value) {
        if let Some(slot) = self.properties.write().slots.get_mut(offset as usize) {
            *slot = value;
        }
    }

    /// Add a new own property through a shape transition; returns its slot
    pub fn add_property(&self, key: PropertyKey, value: Value, attributes: PropertyAttributes) -> u32 {
        let mut props = self.properties.write();
        debug_assert!(props.shape.lookup(&key).is_none(), "property {key} already present");
        let next = props.shape.transition(key, attributes);
        props.shape = next;
        props.slots.push(value);
        (props.slots.len() - 1) as u32
    }

    /// Move to a cached transition target, appending the new slot
    ///
    /// `next` must be a child of the current shape.
    pub fn add_property_with_shape(&self, next: &Arc<Shape>, value: Value) {
        let mut props = self.properties.write();
        debug_assert!(next.parent().is_some_and(|p| Arc::ptr_eq(p, &props.shape)));
        props.shape = Arc::clone(next);
        props.slots.push(value);
    }

    /// Set an own data property, adding it if absent (attributes apply on add)
    pub fn define_value(&self, key: PropertyKey, value: Value, attributes: PropertyAttributes) {
        match self.find_property_slot(&key) {
            Some(slot) => self.set_slot(slot.offset, value),
            None => {
                self.add_property(key, value, attributes);
            }
        }
    }

    // ---- prototype ----

    /// Get prototype
    pub fn prototype(&self) -> Option<Arc<JsObject>> {
        self.prototype.read().clone()
    }

    /// Set prototype; refuses (returns false) a link that would close a cycle
    ///
    /// Shapes do not encode the prototype; caches follow the live links and
    /// re-check every shape on the way.
    pub fn set_prototype(&self, prototype: Option<Arc<JsObject>>) -> bool {
        let mut current = prototype.clone();
        while let Some(obj) = current {
            if std::ptr::eq(Arc::as_ptr(&obj), self) {
                return false;
            }
            current = obj.prototype();
        }
        *self.prototype.write() = prototype;
        true
    }

    // ---- array elements ----

    /// Dense storage length (the array `length`)
    pub fn array_length(&self) -> u32 {
        self.elements.read().len() as u32
    }

    /// Fast element read: present, in-bounds elements only
    #[inline]
    pub fn get_element(&self, index: u32) -> Option<Value> {
        if !self.is_array() {
            return None;
        }
        self.elements.read().get(index as usize).cloned().flatten()
    }

    /// Fast element write: in-bounds indices only; returns false otherwise
    #[inline]
    pub fn set_element(&self, index: u32, value: Value) -> bool {
        if !self.is_array() {
            return false;
        }
        match self.elements.write().get_mut(index as usize) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Properties computed from the object kind rather than stored in a slot
    pub fn has_exotic_property(&self, key: &PropertyKey) -> bool {
        self.is_array() && (key.is_named("length") || key.as_index().is_some())
    }

    // ---- generic access ----

    /// Own property value
    pub fn get_own(&self, key: &PropertyKey) -> Option<Value> {
        if self.is_array() {
            if key.is_named("length") {
                return Some(Value::number(self.array_length() as f64));
            }
            if let Some(value) = key.as_index().and_then(|i| self.get_element(i)) {
                return Some(value);
            }
        }
        let props = self.properties.read();
        let slot = props.shape.lookup(key)?;
        props.slots.get(slot.offset as usize).cloned()
    }

    /// Check for an own or inherited property
    pub fn has_property(&self, key: &PropertyKey) -> bool {
        if self.get_own(key).is_some() {
            return true;
        }
        let mut current = self.prototype();
        while let Some(obj) = current {
            if obj.get_own(key).is_some() {
                return true;
            }
            current = obj.prototype();
        }
        false
    }

    /// Generic [[Get]]: own property, then the prototype chain
    pub fn get(&self, key: &PropertyKey) -> Value {
        if let Some(value) = self.get_own(key) {
            return value;
        }
        let mut current = self.prototype();
        while let Some(obj) = current {
            if let Some(value) = obj.get_own(key) {
                return value;
            }
            current = obj.prototype();
        }
        Value::Undefined
    }

    /// Generic [[Set]] for data properties; returns false when the write is
    /// rejected (read-only own or inherited property, invalid array length)
    pub fn set(&self, key: PropertyKey, value: Value) -> bool {
        if self.is_array() {
            if key.is_named("length") {
                return self.set_array_length(&value);
            }
            if let Some(index) = key.as_index()
                && self.set_array_index(index, &value)
            {
                return true;
            }
        }

        if let Some(slot) = self.find_property_slot(&key) {
            if !slot.attributes.writable {
                return false;
            }
            self.set_slot(slot.offset, value);
            return true;
        }

        if self.inherits_read_only(&key) {
            return false;
        }
        self.add_property(key, value, PropertyAttributes::data());
        true
    }

    /// A non-writable property of this name somewhere up the chain blocks adds
    pub fn inherits_read_only(&self, key: &PropertyKey) -> bool {
        let mut current = self.prototype();
        while let Some(obj) = current {
            if let Some(slot) = obj.find_property_slot(key) {
                return !slot.attributes.writable;
            }
            current = obj.prototype();
        }
        false
    }

    fn set_array_index(&self, index: u32, value: &Value) -> bool {
        let mut elements = self.elements.write();
        let len = elements.len() as u32;
        if index < len {
            elements[index as usize] = Some(value.clone());
            return true;
        }
        if index - len > MAX_DENSE_GAP {
            return false;
        }
        elements.resize(index as usize, None);
        elements.push(Some(value.clone()));
        true
    }

    fn set_array_length(&self, value: &Value) -> bool {
        let Some(n) = value.as_number() else {
            return false;
        };
        if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return false;
        }
        let new_len = n as u32;
        let mut elements = self.elements.write();
        if new_len as usize > elements.len() && new_len - elements.len() as u32 > MAX_DENSE_GAP {
            return false;
        }
        elements.resize(new_len as usize, None);
        true
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObject")
            .field("kind", &self.class_name())
            .field("shape", &self.properties.read().shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(root: &Arc<Shape>) -> JsObject {
        JsObject::new(ObjectKind::Ordinary, None, Arc::clone(root))
    }

    #[test]
    fn test_index_keys_canonicalize() {
        assert_eq!(PropertyKey::from("7"), PropertyKey::Index(7));
        assert!(matches!(PropertyKey::from("07"), PropertyKey::String(_)));
    }

    #[test]
    fn test_add_and_read_property() {
        let root = Shape::root();
        let obj = plain(&root);
        let key = PropertyKey::from("x");
        let slot = obj.add_property(key.clone(), Value::int32(1), PropertyAttributes::data());
        assert_eq!(slot, 0);
        assert_eq!(obj.get(&key).as_int32(), Some(1));
        assert!(!obj.shape_is(&root));
    }

    #[test]
    fn test_same_history_same_shape() {
        let root = Shape::root();
        let a = plain(&root);
        let b = plain(&root);
        a.set(PropertyKey::from("x"), Value::int32(1));
        b.set(PropertyKey::from("x"), Value::int32(2));
        assert!(Arc::ptr_eq(&a.shape(), &b.shape()));
    }

    #[test]
    fn test_prototype_lookup() {
        let root = Shape::root();
        let proto = Arc::new(plain(&root));
        proto.set(PropertyKey::from("inherited"), Value::boolean(true));
        let obj = JsObject::new(ObjectKind::Ordinary, Some(proto), root);
        assert_eq!(obj.get(&PropertyKey::from("inherited")).as_boolean(), Some(true));
        assert!(obj.get(&PropertyKey::from("missing")).is_undefined());
    }

    #[test]
    fn test_read_only_blocks_writes() {
        let root = Shape::root();
        let proto = Arc::new(plain(&root));
        proto.add_property(PropertyKey::from("k"), Value::int32(1), PropertyAttributes::frozen());
        let obj = JsObject::new(ObjectKind::Ordinary, Some(Arc::clone(&proto)), root);

        assert!(!proto.set(PropertyKey::from("k"), Value::int32(2)));
        assert!(!obj.set(PropertyKey::from("k"), Value::int32(2)));
        assert_eq!(obj.get(&PropertyKey::from("k")).as_int32(), Some(1));
    }

    #[test]
    fn test_prototype_cycle_refused() {
        let root = Shape::root();
        let a = Arc::new(plain(&root));
        let b = Arc::new(JsObject::new(ObjectKind::Ordinary, Some(Arc::clone(&a)), root));
        assert!(!a.set_prototype(Some(Arc::clone(&b))));
        assert!(!a.set_prototype(Some(Arc::clone(&a))));
        assert!(a.prototype().is_none());
        assert!(b.set_prototype(None));
    }

    #[test]
    fn test_array_elements() {
        let arr = JsObject::array(2, None, Shape::root());
        assert!(arr.get_element(0).is_none());
        assert!(arr.set_element(0, Value::int32(42)));
        assert!(!arr.set_element(2, Value::int32(1)));
        assert_eq!(arr.get_element(0).unwrap().as_int32(), Some(42));

        assert!(arr.set(PropertyKey::Index(4), Value::int32(5)));
        assert_eq!(arr.array_length(), 5);
        assert!(arr.get(&PropertyKey::Index(3)).is_undefined());
        assert_eq!(arr.get(&PropertyKey::from("length")).as_int32(), Some(5));

        assert!(arr.set(PropertyKey::from("length"), Value::int32(1)));
        assert_eq!(arr.array_length(), 1);
        assert!(!arr.set(PropertyKey::from("length"), Value::double(1.5)));
    }

    #[test]
    fn test_far_index_stored_as_property() {
        let arr = JsObject::array(0, None, Shape::root());
        assert!(arr.set(PropertyKey::Index(1_000_000), Value::int32(9)));
        assert_eq!(arr.array_length(), 0);
        assert_eq!(arr.get(&PropertyKey::Index(1_000_000)).as_int32(), Some(9));
    }
}
