//! Hash collections and the visited-set used by recursive walks.

use std::hash::Hash;

pub use rustc_hash::{FxHashMap, FxHashSet};

/// Short alias used by most phases.
pub type FxMap<K, V> = FxHashMap<K, V>;

/// Tracks the ids on the current recursion path of a walk over a possibly
/// cyclic graph (self-referential types, mutually recursive aliases).
///
/// The walk calls [`VisitedSet::enter`] before recursing and
/// [`VisitedSet::leave`] afterwards. The caller owns the set, so nested or
/// concurrent walks never share state.
#[derive(Debug, Clone)]
pub struct VisitedSet<T> {
    active: FxHashSet<T>,
}

impl<T: Copy + Eq + Hash> VisitedSet<T> {
    pub fn new() -> Self {
        Self {
            active: FxHashSet::default(),
        }
    }

    /// Mark `id` as on the path. Returns `false` if it already was, i.e. the
    /// walk has reached a cycle.
    pub fn enter(&mut self, id: T) -> bool {
        self.active.insert(id)
    }

    pub fn leave(&mut self, id: T) {
        self.active.remove(&id);
    }

    pub fn contains(&self, id: T) -> bool {
        self.active.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl<T: Copy + Eq + Hash> Default for VisitedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visited_set_detects_reentry() {
        let mut visited = VisitedSet::new();
        assert!(visited.enter(3u32));
        assert!(!visited.enter(3));
        visited.leave(3);
        assert!(visited.enter(3));
        visited.leave(3);
        assert!(visited.is_empty());
    }
}
