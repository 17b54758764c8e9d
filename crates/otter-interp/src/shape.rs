//! Hidden classes (shapes) for property access caching.
//!
//! A Shape describes which named properties an object has and at which slot
//! each one is stored. Shapes never change after creation: adding a property
//! moves the object to a child shape found through the parent's transition
//! table, so objects with the same property history share one shape and the
//! inline caches can compare shapes by pointer identity.

use crate::object::{PropertyAttributes, PropertyKey};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Weak};

/// Slot index and attributes of one property in a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySlot {
    /// Index into the object's slot vector
    pub offset: u32,
    /// Property attributes
    pub attributes: PropertyAttributes,
}

/// A Shape defines the layout of properties in an object.
pub struct Shape {
    /// The shape this one was transitioned from. None for the root shape.
    parent: Option<Arc<Shape>>,

    /// The property key added to the parent to create this shape.
    key: Option<PropertyKey>,

    /// Child shapes by added key. Weak so that unused branches die:
    /// child -> parent is Arc, parent -> child is Weak.
    transitions: Mutex<FxHashMap<(PropertyKey, PropertyAttributes), Weak<Shape>>>,

    /// All property slots (inherited + own) for O(1) lookup.
    property_map: FxHashMap<PropertyKey, PropertySlot>,

    /// Keys in insertion order
    keys_ordered: Vec<PropertyKey>,
}

impl Shape {
    /// Create a new root (empty) shape.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            key: None,
            transitions: Mutex::new(FxHashMap::default()),
            property_map: FxHashMap::default(),
            keys_ordered: Vec::new(),
        })
    }

    /// Find the transition adding `key`, or create it.
    pub fn transition(self: &Arc<Self>, key: PropertyKey, attributes: PropertyAttributes) -> Arc<Self> {
        let mut transitions = self.transitions.lock();
        let transition_key = (key, attributes);
        if let Some(shape) = transitions.get(&transition_key).and_then(Weak::upgrade) {
            return shape;
        }
        let (key, attributes) = transition_key;

        let offset = self.keys_ordered.len() as u32;
        let mut property_map = self.property_map.clone();
        property_map.insert(key.clone(), PropertySlot { offset, attributes });
        let mut keys_ordered = self.keys_ordered.clone();
        keys_ordered.push(key.clone());

        let shape = Arc::new(Self {
            parent: Some(Arc::clone(self)),
            key: Some(key.clone()),
            transitions: Mutex::new(FxHashMap::default()),
            property_map,
            keys_ordered,
        });
        transitions.insert((key, attributes), Arc::downgrade(&shape));
        shape
    }

    /// Get the slot of a property key in this shape.
    #[inline]
    pub fn lookup(&self, key: &PropertyKey) -> Option<PropertySlot> {
        self.property_map.get(key).copied()
    }

    /// Get the parent shape
    pub fn parent(&self) -> Option<&Arc<Shape>> {
        self.parent.as_ref()
    }

    /// Get the key that created this shape
    pub fn key(&self) -> Option<&PropertyKey> {
        self.key.as_ref()
    }

    /// Own property keys in insertion order.
    pub fn own_keys(&self) -> &[PropertyKey] {
        &self.keys_ordered
    }

    /// Get the number of properties defined in this shape.
    pub fn property_count(&self) -> usize {
        self.keys_ordered.len()
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("key", &self.key)
            .field("property_count", &self.property_count())
            .finish()
    }
}
