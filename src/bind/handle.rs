//! Node wrapper handles
//!
//! A [`NodeHandle`] is the host-visible proxy for one underlying arena
//! node. It never owns the node; it holds the node's stable id in a cell
//! that the cache may redirect when the tree layer merges the node away.
//! Reference equality of the `Arc` is the identity callers rely on.

use crate::dom::{NodeId, NodeKind};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared, repointable wrapper for one tree node
pub type NodeRef = Arc<NodeHandle>;

/// Wrapper state: a fixed kind tag plus the current target id.
///
/// The kind never changes — repointing only ever happens between text
/// nodes, so the tag stays truthful. The target is atomic purely so the
/// handle stays `Send` inside the document resource's mutex; access is
/// still serialized by the caller per the tree's concurrency contract.
pub struct NodeHandle {
    kind: NodeKind,
    target: AtomicU32,
}

impl NodeHandle {
    pub(crate) fn new(kind: NodeKind, target: NodeId) -> NodeRef {
        Arc::new(NodeHandle { kind, target: AtomicU32::new(target) })
    }

    /// The node kind this wrapper was created for
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Current underlying node id
    #[inline]
    pub fn target(&self) -> NodeId {
        self.target.load(Ordering::Relaxed)
    }

    /// Redirect the wrapper to a different node. Only the cache does this,
    /// and only when the old target was merged into the new one.
    pub(crate) fn repoint(&self, target: NodeId) {
        self.target.store(target, Ordering::Relaxed);
    }

    /// Opaque identity token for debugging and equality checks. Stable for
    /// the document's lifetime; not an address.
    #[inline]
    pub fn token(&self) -> u64 {
        u64::from(self.target())
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("kind", &self.kind)
            .field("target", &self.target())
            .finish()
    }
}
