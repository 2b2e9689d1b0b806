//! Per-node cache of checked expression types.

use espanda_ast::{NodeId, TypeId};
use espanda_core::collections::FxHashMap;

/// Maps expression nodes to their checked types. Entries are only valid for
/// the AST revision they were computed against; [`NodeCache::sync`] drops
/// them once the tree has been rewritten.
#[derive(Debug, Clone, Default)]
pub struct NodeCache {
    entries: FxHashMap<NodeId, TypeId>,
    revision: u64,
}

impl NodeCache {
    pub fn new(revision: u64) -> Self {
        Self {
            entries: FxHashMap::default(),
            revision,
        }
    }

    /// Clear the cache if `revision` differs from the one it was filled at.
    pub fn sync(&mut self, revision: u64) {
        if self.revision != revision {
            tracing::trace!(old = self.revision, new = revision, "node cache invalidated");
            self.entries.clear();
            self.revision = revision;
        }
    }

    pub fn get(&self, node: NodeId) -> Option<TypeId> {
        self.entries.get(&node).copied()
    }

    pub fn insert(&mut self, node: NodeId, ty: TypeId) {
        self.entries.insert(node, ty);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_change_clears_entries() {
        let mut cache = NodeCache::new(0);
        cache.insert(NodeId(1), TypeId(2));
        cache.sync(0);
        assert_eq!(cache.get(NodeId(1)), Some(TypeId(2)));
        cache.sync(1);
        assert!(cache.is_empty());
    }
}
