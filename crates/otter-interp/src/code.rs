//! Code units prepared for execution

use crate::ic::FeedbackVector;
use otter_interp_bytecode::{CodeUnit, FunctionIndex};
use std::sync::Arc;

/// A code unit with its feedback vector
///
/// Nested functions are wrapped eagerly so every closure created from the
/// same function body shares one set of inline caches.
pub struct CompiledCode {
    unit: Arc<CodeUnit>,
    feedback: FeedbackVector,
    children: Vec<Arc<CompiledCode>>,
}

impl CompiledCode {
    /// Wrap a code unit and, recursively, its nested functions
    pub fn new(unit: Arc<CodeUnit>) -> Arc<Self> {
        let children = unit.functions.iter().cloned().map(Self::new).collect();
        Arc::new(Self {
            feedback: FeedbackVector::new(unit.feedback_slots as usize),
            unit,
            children,
        })
    }

    /// The underlying code unit
    #[inline]
    pub fn unit(&self) -> &Arc<CodeUnit> {
        &self.unit
    }

    /// Inline cache slots, indexed by `ic_index`
    #[inline]
    pub fn feedback(&self) -> &FeedbackVector {
        &self.feedback
    }

    /// Nested function body referenced by `CreateClosure`
    pub fn child(&self, index: FunctionIndex) -> Option<&Arc<CompiledCode>> {
        self.children.get(index.0 as usize)
    }
}

impl std::fmt::Debug for CompiledCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCode")
            .field("name", &self.unit.display_name())
            .field("feedback_slots", &self.feedback.len())
            .field("children", &self.children.len())
            .finish()
    }
}
