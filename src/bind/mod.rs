//! Binding layer - live wrappers over arena nodes
//!
//! This is what the NIF surface (and any embedding Rust caller) talks to.
//! Every underlying node gets at most one live [`NodeRef`] wrapper per
//! document, handed out through the per-document identity cache, so callers
//! can compare nodes by reference and hold them in sets. When the tree
//! layer coalesces a freshly inserted text node into an existing neighbor,
//! the wrapper is repointed to the survivor instead of being left dangling.

pub mod cache;
pub mod facade;
pub mod handle;

pub use cache::WrapCache;
pub use facade::BoundDocument;
pub use handle::{NodeHandle, NodeRef};

use crate::dom::Document;

/// Post-construction hook, run once for every wrapper the cache creates
/// (and again after sibling insertion). The document owns one of these;
/// embedders use it to attach higher-level behavior to new wrappers.
pub trait NodeDecorator: Send + Sync {
    fn decorate(&self, tree: &Document, node: &NodeRef);
}

/// Default decorator: does nothing.
pub struct NoopDecorator;

impl NodeDecorator for NoopDecorator {
    fn decorate(&self, _tree: &Document, _node: &NodeRef) {}
}
