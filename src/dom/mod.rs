//! DOM module - arena-based mutable XML document
//!
//! The tree layer the binding is built on:
//! - Arena allocation for nodes, `NodeId` (u32) indices for traversal
//! - Structural mutation with libxml2-style text coalescing
//! - Entity encode/decode, XML and HTML serialization

pub mod document;
pub mod entities;
pub mod node;
pub mod serialize;

pub use document::Document;
pub use node::{NodeId, NodeKind, NsDecl, TreeNode};
