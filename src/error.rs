//! Failure taxonomy for structural tree mutations.
//!
//! Absent results (no parent, missing attribute, ...) are `Option::None`
//! everywhere in this crate; `TreeError` is reserved for mutations the tree
//! layer refuses outright. Every rejection is atomic: the tree is left
//! exactly as it was.

use crate::dom::NodeKind;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The target node cannot hold children (e.g. appending under a text node).
    #[error("{0:?} nodes cannot contain children")]
    NotAContainer(NodeKind),

    /// The node being inserted can never live at the requested position.
    #[error("{0:?} nodes cannot be inserted into a tree")]
    BadInsert(NodeKind),

    /// Inserting a node relative to itself.
    #[error("cannot insert a node relative to itself")]
    SelfInsert,

    /// The insertion would make a node its own ancestor.
    #[error("insertion would create a cycle")]
    CycleDetected,

    /// A sibling insertion was requested next to a node with no parent.
    #[error("reference node is detached, nowhere to anchor the sibling")]
    Detached,
}
