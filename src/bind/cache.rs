//! Per-document wrapper identity cache
//!
//! Maps a node's stable arena id to the single live wrapper representing
//! it. Entries are inserted on first wrap and never evicted; the cache is
//! bounded by the document's lifetime, exactly like the arena itself.

use super::handle::NodeRef;
use crate::dom::NodeId;
use std::collections::HashMap;

/// NodeId -> live wrapper mapping, owned by one document
#[derive(Default)]
pub struct WrapCache {
    map: HashMap<NodeId, NodeRef>,
}

impl WrapCache {
    pub fn new() -> Self {
        WrapCache { map: HashMap::new() }
    }

    /// The cached wrapper for a node, if one was ever created
    pub fn get(&self, id: NodeId) -> Option<NodeRef> {
        self.map.get(&id).cloned()
    }

    /// Register a freshly built wrapper. The slot must be empty: two live
    /// wrappers for one node would break identity comparisons downstream.
    pub fn insert(&mut self, id: NodeId, node: NodeRef) {
        let previous = self.map.insert(id, node);
        debug_assert!(previous.is_none(), "node {} wrapped twice", id);
    }

    /// Redirect a wrapper after the tree merged its node into `survivor`.
    ///
    /// The old cache entry is dropped. If the survivor already has a
    /// wrapper of its own, that one keeps the cache slot and the repointed
    /// handle lives on as an alias — both observe the same live node.
    pub fn repoint(&mut self, handle: &NodeRef, survivor: NodeId) {
        let old = handle.target();
        self.map.remove(&old);
        handle.repoint(survivor);
        self.map.entry(survivor).or_insert_with(|| handle.clone());
    }

    /// Number of live wrappers
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::handle::NodeHandle;
    use crate::dom::NodeKind;
    use std::sync::Arc;

    #[test]
    fn test_get_returns_same_wrapper() {
        let mut cache = WrapCache::new();
        let wrapper = NodeHandle::new(NodeKind::Element, 1);
        cache.insert(1, wrapper.clone());
        assert!(Arc::ptr_eq(&cache.get(1).unwrap(), &wrapper));
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_repoint_moves_entry() {
        let mut cache = WrapCache::new();
        let wrapper = NodeHandle::new(NodeKind::Text, 4);
        cache.insert(4, wrapper.clone());

        cache.repoint(&wrapper, 2);
        assert_eq!(wrapper.target(), 2);
        assert!(cache.get(4).is_none());
        assert!(Arc::ptr_eq(&cache.get(2).unwrap(), &wrapper));
    }

    #[test]
    fn test_repoint_keeps_existing_wrapper_for_survivor() {
        let mut cache = WrapCache::new();
        let original = NodeHandle::new(NodeKind::Text, 2);
        cache.insert(2, original.clone());
        let merged = NodeHandle::new(NodeKind::Text, 5);
        cache.insert(5, merged.clone());

        cache.repoint(&merged, 2);
        // both handles point at the survivor, the original keeps the slot
        assert_eq!(merged.target(), 2);
        assert!(Arc::ptr_eq(&cache.get(2).unwrap(), &original));
        assert_eq!(cache.len(), 1);
    }
}
