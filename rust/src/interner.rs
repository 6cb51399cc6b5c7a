//! Worker handle interning.
//!
//! Maps display IDs (`T3`, `I1`) to compact integer handles so slots and
//! caches store `u32`s instead of strings.

use rustc_hash::FxHashMap;

/// Handle of a worker inside a [`crate::roster::Schedule`].
pub type WorkerIdx = u32;

/// Interner from display ID to worker handle.
#[derive(Debug, Clone)]
pub struct WorkerInterner {
    to_idx: FxHashMap<String, WorkerIdx>,
    from_idx: Vec<String>,
}

impl WorkerInterner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_idx: Vec::with_capacity(capacity),
        }
    }

    /// Intern a display ID. Returns `None` if it was already present.
    pub fn intern_new(&mut self, display_id: &str) -> Option<WorkerIdx> {
        if self.to_idx.contains_key(display_id) {
            return None;
        }
        let idx = self.from_idx.len() as WorkerIdx;
        self.from_idx.push(display_id.to_string());
        self.to_idx.insert(display_id.to_string(), idx);
        Some(idx)
    }

    #[inline]
    pub fn get(&self, display_id: &str) -> Option<WorkerIdx> {
        self.to_idx.get(display_id).copied()
    }

    #[inline]
    pub fn resolve(&self, idx: WorkerIdx) -> Option<&str> {
        self.from_idx.get(idx as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.from_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_idx.is_empty()
    }
}

impl Default for WorkerInterner {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_rejects_duplicates() {
        let mut interner = WorkerInterner::with_capacity(4);

        let t1 = interner.intern_new("T1").unwrap();
        let i1 = interner.intern_new("I1").unwrap();
        assert!(interner.intern_new("T1").is_none());

        assert_ne!(t1, i1);
        assert_eq!(interner.resolve(i1), Some("I1"));
        assert_eq!(interner.get("T1"), Some(t1));
        assert_eq!(interner.get("T9"), None);
        assert_eq!(interner.len(), 2);
    }
}
