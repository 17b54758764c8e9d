//! Interpreter configuration

/// Tunables for one [`Interpreter`](crate::Interpreter)
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Maximum nesting of calls before a stack overflow RangeError
    pub max_call_depth: usize,
    /// Read-cache misses resolved generically before a site starts caching
    pub ic_warmup_threshold: u32,
    /// Chain entries kept per read-cache site; older entries are evicted
    pub max_read_cache_entries: usize,
    /// Run scripts strict even when their code unit is not marked strict
    pub strict_by_default: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 512,
            ic_warmup_threshold: 3,
            max_read_cache_entries: 4,
            strict_by_default: false,
        }
    }
}

impl InterpreterConfig {
    /// Set the maximum call depth
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the read-cache warm-up threshold
    pub fn with_ic_warmup_threshold(mut self, threshold: u32) -> Self {
        self.ic_warmup_threshold = threshold;
        self
    }

    /// Set the per-site read-cache capacity (at least one entry)
    pub fn with_max_read_cache_entries(mut self, entries: usize) -> Self {
        self.max_read_cache_entries = entries.max(1);
        self
    }

    /// Force strict mode for scripts
    pub fn with_strict_by_default(mut self, strict: bool) -> Self {
        self.strict_by_default = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.max_call_depth, 512);
        assert_eq!(config.ic_warmup_threshold, 3);
        assert_eq!(config.max_read_cache_entries, 4);
        assert!(!config.strict_by_default);
    }

    #[test]
    fn test_read_cache_capacity_floor() {
        let config = InterpreterConfig::default().with_max_read_cache_entries(0);
        assert_eq!(config.max_read_cache_entries, 1);
    }
}
