//! Inline caches for named property and global access
//!
//! Every cached instruction owns one slot of its code's [`FeedbackVector`].
//! Cache entries hold strong references to the shapes they were built
//! against and every hit re-checks those shapes by pointer identity while
//! following the receiver's live prototype links, so a hit always yields
//! what the generic lookup would for the receiver's current shape.

use crate::config::InterpreterConfig;
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, PropertyAttributes, PropertyKey};
use crate::shape::Shape;
use crate::value::Value;
use parking_lot::{Mutex, MutexGuard};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use tracing::trace;

type ShapeChain = SmallVec<[Arc<Shape>; 4]>;

/// Deepest prototype walk recorded into a cache entry
const MAX_CHAIN_DEPTH: usize = 16;

/// One read-cache entry: shapes along the prototype walk and the result
#[derive(Debug, Clone)]
pub struct ReadEntry {
    chain: ShapeChain,
    /// Slot in the last object of the chain; `None` caches "absent"
    slot: Option<u32>,
}

/// Read cache of a `GetProp` site
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: SmallVec<[ReadEntry; 2]>,
    miss_count: u32,
}

/// State of one feedback slot
#[derive(Debug, Default)]
pub enum CacheSlot {
    /// Nothing cached
    #[default]
    Empty,
    /// `GetProp` chain entries
    Read(ReadCache),
    /// `SetProp` overwriting an existing own property
    Replace {
        /// Receiver shape
        shape: Arc<Shape>,
        /// Slot to overwrite
        offset: u32,
    },
    /// `SetProp` adding a property
    Transition {
        /// Receiver shape followed by every prototype's shape
        chain: ShapeChain,
        /// Receiver shape after the add
        next: Arc<Shape>,
    },
    /// `LoadGlobal` / `StoreGlobal` slot on the global object
    Global {
        /// Global object shape the slot was resolved against
        shape: Arc<Shape>,
        /// Resolved slot
        offset: u32,
    },
}

/// Observable summary of a feedback slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing cached
    Empty,
    /// Read cache with its entry count and miss counter
    Read {
        /// Cached chain entries
        entries: usize,
        /// Misses seen so far
        misses: u32,
    },
    /// Own-property write
    Replace,
    /// Property-adding write
    Transition,
    /// Global slot
    Global,
}

/// Per-code side table of inline cache slots
pub struct FeedbackVector {
    slots: Box<[Mutex<CacheSlot>]>,
}

impl FeedbackVector {
    /// Create `len` empty slots
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(CacheSlot::Empty)).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if there are no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Lock one slot for the duration of a cache operation
    pub fn lock(&self, index: u16) -> VmResult<MutexGuard<'_, CacheSlot>> {
        self.slots
            .get(index as usize)
            .map(|slot| slot.lock())
            .ok_or_else(|| VmError::internal(format!("feedback slot {index} out of range")))
    }

    /// Summary of one slot
    pub fn state(&self, index: u16) -> Option<CacheState> {
        let slot = self.slots.get(index as usize)?.lock();
        Some(match &*slot {
            CacheSlot::Empty => CacheState::Empty,
            CacheSlot::Read(cache) => CacheState::Read {
                entries: cache.entries.len(),
                misses: cache.miss_count,
            },
            CacheSlot::Replace { .. } => CacheState::Replace,
            CacheSlot::Transition { .. } => CacheState::Transition,
            CacheSlot::Global { .. } => CacheState::Global,
        })
    }
}

impl CacheSlot {
    fn as_read(&mut self) -> &mut ReadCache {
        if !matches!(self, Self::Read(_)) {
            *self = Self::Read(ReadCache::default());
        }
        match self {
            Self::Read(cache) => cache,
            _ => unreachable!("slot was just made a read cache"),
        }
    }
}

/// Shapes do not describe kind-computed properties (array `length` and
/// elements), so every step also re-checks the object kind against the key.
fn match_entry(entry: &ReadEntry, receiver: &Arc<JsObject>, key: &PropertyKey) -> Option<Value> {
    let last = entry.chain.len().checked_sub(1)?;
    let mut current = Arc::clone(receiver);
    for (depth, shape) in entry.chain.iter().enumerate() {
        if !current.shape_is(shape) || current.has_exotic_property(key) {
            return None;
        }
        if depth == last {
            return match entry.slot {
                Some(offset) => Some(current.get_slot(offset)),
                // absent only holds while the chain still ends here
                None => current.prototype().is_none().then_some(Value::Undefined),
            };
        }
        current = current.prototype()?;
    }
    None
}

/// Walk the prototype chain recording shapes; `None` when part of the walk
/// is not described by shapes (array `length`, elements) or is too deep
fn record_read(receiver: &Arc<JsObject>, key: &PropertyKey) -> Option<(ReadEntry, Value)> {
    let mut chain = ShapeChain::new();
    let mut current = Arc::clone(receiver);
    loop {
        if current.has_exotic_property(key) || chain.len() == MAX_CHAIN_DEPTH {
            return None;
        }
        chain.push(current.shape());
        if let Some(slot) = current.find_property_slot(key) {
            let value = current.get_slot(slot.offset);
            let entry = ReadEntry {
                chain,
                slot: Some(slot.offset),
            };
            return Some((entry, value));
        }
        match current.prototype() {
            Some(next) => current = next,
            None => {
                let entry = ReadEntry { chain, slot: None };
                return Some((entry, Value::Undefined));
            }
        }
    }
}

/// Cached named property read on an object receiver
pub fn cached_get(
    slot: &mut CacheSlot,
    receiver: &Arc<JsObject>,
    key: &PropertyKey,
    config: &InterpreterConfig,
) -> Value {
    let cache = slot.as_read();
    for entry in &cache.entries {
        if let Some(value) = match_entry(entry, receiver, key) {
            return value;
        }
    }

    cache.miss_count = cache.miss_count.saturating_add(1);
    if cache.miss_count <= config.ic_warmup_threshold {
        trace!(%key, misses = cache.miss_count, "read cache miss, warming up");
        return receiver.get(key);
    }

    match record_read(receiver, key) {
        Some((entry, value)) => {
            cache.entries.insert(0, entry);
            cache.entries.truncate(config.max_read_cache_entries);
            trace!(%key, entries = cache.entries.len(), "read cache filled");
            value
        }
        None => receiver.get(key),
    }
}

fn transition_chain_matches(receiver: &Arc<JsObject>, key: &PropertyKey, chain: &ShapeChain) -> bool {
    let mut current = Some(Arc::clone(receiver));
    for shape in chain {
        match current {
            Some(obj) if obj.shape_is(shape) && !obj.has_exotic_property(key) => current = obj.prototype(),
            _ => return false,
        }
    }
    current.is_none()
}

/// Cached named property write on an object receiver
///
/// Returns `false` when the write is rejected; the caller decides whether
/// that raises.
pub fn cached_set(slot: &mut CacheSlot, receiver: &Arc<JsObject>, key: &PropertyKey, value: Value) -> bool {
    if receiver.has_exotic_property(key) {
        return receiver.set(key.clone(), value);
    }
    match slot {
        CacheSlot::Replace { shape, offset } if receiver.shape_is(shape) => {
            receiver.set_slot(*offset, value);
            return true;
        }
        CacheSlot::Transition { chain, next } if transition_chain_matches(receiver, key, chain) => {
            receiver.add_property_with_shape(next, value);
            return true;
        }
        CacheSlot::Empty => {}
        _ => trace!(%key, "write cache invalidated"),
    }
    *slot = CacheSlot::Empty;

    if let Some(own) = receiver.find_property_slot(key) {
        if !own.attributes.writable {
            return false;
        }
        receiver.set_slot(own.offset, value);
        *slot = CacheSlot::Replace {
            shape: receiver.shape(),
            offset: own.offset,
        };
        trace!(%key, "write cache filled (replace)");
        return true;
    }

    let mut chain: ShapeChain = smallvec![receiver.shape()];
    let mut current = receiver.prototype();
    while let Some(obj) = current {
        if let Some(inherited) = obj.find_property_slot(key)
            && !inherited.attributes.writable
        {
            return false;
        }
        if obj.has_exotic_property(key) || chain.len() == MAX_CHAIN_DEPTH {
            return receiver.set(key.clone(), value);
        }
        chain.push(obj.shape());
        current = obj.prototype();
    }

    receiver.add_property(key.clone(), value, PropertyAttributes::data());
    *slot = CacheSlot::Transition {
        chain,
        next: receiver.shape(),
    };
    trace!(%key, "write cache filled (transition)");
    true
}

/// Outcome of a cached global store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalStore {
    /// Value written
    Done,
    /// Binding exists but is read-only
    ReadOnly,
    /// No binding of that name
    Missing,
}

fn refresh_global(slot: &mut CacheSlot, global: &Arc<JsObject>, key: &PropertyKey) -> Option<(u32, bool)> {
    if let CacheSlot::Global { shape, offset } = slot {
        if global.shape_is(shape) {
            return Some((*offset, true));
        }
        // shape changed but the name may still sit at the cached slot
        if let Some(current) = global.find_property_slot(key)
            && current.offset == *offset
        {
            *shape = global.shape();
            return Some((current.offset, current.attributes.writable));
        }
    }

    let found = global.find_property_slot(key);
    match found {
        Some(found) => {
            trace!(%key, offset = found.offset, "global cache refilled");
            *slot = if found.attributes.writable {
                CacheSlot::Global {
                    shape: global.shape(),
                    offset: found.offset,
                }
            } else {
                CacheSlot::Empty
            };
            Some((found.offset, found.attributes.writable))
        }
        None => {
            *slot = CacheSlot::Empty;
            None
        }
    }
}

/// Cached global read; `None` when the name is not bound anywhere
pub fn cached_global_get(slot: &mut CacheSlot, global: &Arc<JsObject>, key: &PropertyKey) -> Option<Value> {
    if let Some((offset, _)) = refresh_global(slot, global, key) {
        return Some(global.get_slot(offset));
    }
    global.has_property(key).then(|| global.get(key))
}

/// Cached global write
pub fn cached_global_set(
    slot: &mut CacheSlot,
    global: &Arc<JsObject>,
    key: &PropertyKey,
    value: Value,
) -> GlobalStore {
    match refresh_global(slot, global, key) {
        Some((offset, true)) => {
            global.set_slot(offset, value);
            GlobalStore::Done
        }
        Some((_, false)) => GlobalStore::ReadOnly,
        None if global.has_property(key) => {
            if global.set(key.clone(), value) {
                GlobalStore::Done
            } else {
                GlobalStore::ReadOnly
            }
        }
        None => GlobalStore::Missing,
    }
}
