//! Lexical scope chain
//!
//! Each [`Scope`] node wraps one binding record and a link to its enclosing
//! node; the chain ends at the global scope. Declarative records hold
//! index-addressable heap slots plus a name table; object records expose an
//! object's properties as bindings (the global object, `with` targets).
//!
//! The realm owns the global scope. Scopes and closures refer to it through
//! a weak [`ScopeLink`], and sloppy functions record their `this` as
//! [`ThisBinding::Global`], so a closure stored on the global object does not
//! keep the realm alive.

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, PropertyAttributes, PropertyKey};
use crate::value::Value;
use otter_interp_bytecode::BindingInfo;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Weak};

/// A node of the scope chain
pub struct Scope {
    record: ScopeRecord,
    outer: Option<ScopeLink>,
}

/// Reference from a scope or closure to an enclosing scope
#[derive(Clone)]
pub enum ScopeLink {
    /// Function, block and `with` scopes
    Strong(Arc<Scope>),
    /// The realm's global scope
    Global(Weak<Scope>),
}

impl ScopeLink {
    /// Link to `scope`, weak when it is the global scope
    pub fn new(scope: &Arc<Scope>) -> Self {
        if scope.is_global() {
            Self::Global(Arc::downgrade(scope))
        } else {
            Self::Strong(Arc::clone(scope))
        }
    }

    /// The linked scope; `None` once its realm is gone
    pub fn upgrade(&self) -> Option<Arc<Scope>> {
        match self {
            Self::Strong(scope) => Some(Arc::clone(scope)),
            Self::Global(scope) => scope.upgrade(),
        }
    }
}

/// `this` recorded by a function scope
#[derive(Debug, Clone)]
pub enum ThisBinding {
    /// An explicit receiver
    Value(Value),
    /// The global object, read from the global scope on demand
    Global,
}

/// Binding storage of one scope node
pub enum ScopeRecord {
    /// Function and block scopes
    Declarative(DeclarativeRecord),
    /// Global object and `with` scopes
    Object(ObjectRecord),
}

/// Heap slots with a name table
pub struct DeclarativeRecord {
    slots: RwLock<DeclarativeSlots>,
    this_value: Option<ThisBinding>,
}

struct DeclarativeSlots {
    names: FxHashMap<Box<str>, u32>,
    values: Vec<Value>,
    mutable: Vec<bool>,
}

/// Bindings backed by an object's properties
pub struct ObjectRecord {
    object: Arc<JsObject>,
    this_value: Option<Value>,
}

impl DeclarativeRecord {
    fn new(bindings: &[BindingInfo], size: usize, this_value: Option<ThisBinding>) -> Self {
        let size = size.max(bindings.len());
        let mut names = FxHashMap::default();
        let mut mutable = vec![true; size];
        for (index, binding) in bindings.iter().enumerate() {
            names.insert(binding.name.as_str().into(), index as u32);
            mutable[index] = binding.mutable;
        }
        Self {
            slots: RwLock::new(DeclarativeSlots {
                names,
                values: vec![Value::Undefined; size],
                mutable,
            }),
            this_value,
        }
    }

    /// Read a slot by index
    pub fn get(&self, index: usize) -> Option<Value> {
        self.slots.read().values.get(index).cloned()
    }

    /// Write a slot by index, ignoring mutability (initialization path)
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.slots.write().values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.read().names.get(name).map(|&i| i as usize)
    }
}

impl Scope {
    /// The global scope over the global object; `this` is the global object
    pub fn global(global: Arc<JsObject>) -> Arc<Self> {
        Arc::new(Self {
            record: ScopeRecord::Object(ObjectRecord {
                this_value: Some(Value::Object(Arc::clone(&global))),
                object: global,
            }),
            outer: None,
        })
    }

    /// A declarative scope with `size` slots, the first ones named by `bindings`
    pub fn declarative(
        outer: Arc<Scope>,
        bindings: &[BindingInfo],
        size: usize,
        this_value: Option<ThisBinding>,
    ) -> Arc<Self> {
        Arc::new(Self {
            record: ScopeRecord::Declarative(DeclarativeRecord::new(bindings, size, this_value)),
            outer: Some(ScopeLink::new(&outer)),
        })
    }

    /// An object scope (`with`)
    pub fn object(outer: Arc<Scope>, object: Arc<JsObject>) -> Arc<Self> {
        Arc::new(Self {
            record: ScopeRecord::Object(ObjectRecord {
                object,
                this_value: None,
            }),
            outer: Some(ScopeLink::new(&outer)),
        })
    }

    /// The root of a chain; only the global scope has no enclosing node
    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Enclosing scope
    pub fn outer(&self) -> Option<Arc<Scope>> {
        self.outer.as_ref()?.upgrade()
    }

    /// Binding record of this node
    pub fn record(&self) -> &ScopeRecord {
        &self.record
    }

    /// Declarative record of this node, if any
    pub fn declarative_record(&self) -> Option<&DeclarativeRecord> {
        match &self.record {
            ScopeRecord::Declarative(record) => Some(record),
            ScopeRecord::Object(_) => None,
        }
    }

    /// Declarative record of the node `hops` links outward (`0` is this node)
    pub fn heap_record(&self, hops: u16) -> Option<&DeclarativeRecord> {
        let mut current = self;
        for _ in 0..hops {
            match current.outer.as_ref()? {
                ScopeLink::Strong(outer) => current = outer,
                // the global scope has no heap slots
                ScopeLink::Global(_) => return None,
            }
        }
        current.declarative_record()
    }

    /// Visit this node and each enclosing one until `visit` yields a result
    fn find_map<T>(&self, mut visit: impl FnMut(&Scope) -> Option<T>) -> Option<T> {
        let mut current = self;
        loop {
            if let Some(found) = visit(current) {
                return Some(found);
            }
            match current.outer.as_ref()? {
                ScopeLink::Strong(outer) => current = outer,
                ScopeLink::Global(global) => return global.upgrade().and_then(|global| visit(&global)),
            }
        }
    }

    fn lookup_here(&self, name: &str) -> Option<Value> {
        match &self.record {
            ScopeRecord::Declarative(record) => {
                let index = record.index_of(name)?;
                record.get(index)
            }
            ScopeRecord::Object(record) => {
                let key = PropertyKey::string(name);
                record
                    .object
                    .has_property(&key)
                    .then(|| record.object.get(&key))
            }
        }
    }

    /// Resolve a name; first binding found walking outward wins
    pub fn get_binding(&self, name: &str) -> VmResult<Value> {
        self.find_map(|scope| scope.lookup_here(name))
            .ok_or_else(|| VmError::reference_error(format!("{name} is not defined")))
    }

    /// Check whether a name resolves anywhere on the chain
    pub fn has_binding(&self, name: &str) -> bool {
        self.find_map(|scope| scope.lookup_here(name)).is_some()
    }

    /// Write the nearest declared binding; never creates one
    pub fn set_binding(&self, name: &str, value: Value, strict: bool) -> VmResult<()> {
        let mut value = Some(value);
        let written = self.find_map(|scope| match &scope.record {
            ScopeRecord::Declarative(record) => {
                let mut slots = record.slots.write();
                let index = *slots.names.get(name)? as usize;
                if !slots.mutable[index] {
                    return Some(Err(VmError::type_error(format!(
                        "Assignment to constant variable '{name}'"
                    ))));
                }
                slots.values[index] = value.take()?;
                Some(Ok(()))
            }
            ScopeRecord::Object(record) => {
                let key = PropertyKey::string(name);
                if !record.object.has_property(&key) {
                    return None;
                }
                if !record.object.set(key, value.take()?) && strict {
                    return Some(Err(VmError::type_error(format!(
                        "Cannot assign to read only property '{name}'"
                    ))));
                }
                Some(Ok(()))
            }
        });
        written.unwrap_or_else(|| Err(VmError::reference_error(format!("{name} is not defined"))))
    }

    /// Create a mutable binding initialized to undefined in this node, if absent
    pub fn declare_binding(&self, name: &str) {
        match &self.record {
            ScopeRecord::Declarative(record) => {
                let mut slots = record.slots.write();
                if slots.names.contains_key(name) {
                    return;
                }
                let index = slots.values.len() as u32;
                slots.names.insert(name.into(), index);
                slots.values.push(Value::Undefined);
                slots.mutable.push(true);
            }
            ScopeRecord::Object(record) => {
                let key = PropertyKey::string(name);
                if record.object.get_own(&key).is_none() {
                    record
                        .object
                        .add_property(key, Value::Undefined, PropertyAttributes::data());
                }
            }
        }
    }

    /// `this` of the nearest node carrying one
    pub fn this_binding(&self) -> Option<Value> {
        let mut global_this = false;
        self.find_map(|scope| match &scope.record {
            ScopeRecord::Declarative(_) if global_this => None,
            ScopeRecord::Declarative(record) => match record.this_value.as_ref()? {
                ThisBinding::Value(value) => Some(value.clone()),
                ThisBinding::Global => {
                    global_this = true;
                    None
                }
            },
            ScopeRecord::Object(record) => record.this_value.clone(),
        })
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.record {
            ScopeRecord::Declarative(_) => "declarative",
            ScopeRecord::Object(_) if self.is_global() => "global",
            ScopeRecord::Object(_) => "object",
        };
        f.debug_struct("Scope")
            .field("kind", &kind)
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}
