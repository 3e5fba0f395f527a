//! XML node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. A node
//! slot stays valid for the whole lifetime of its owning document, so ids
//! can be handed out as stable identity keys.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Attribute node (lives on the element's property chain)
    Attribute,
    /// Processing instruction
    ProcessingInstruction,
    /// Entity reference
    EntityReference,
    /// Document fragment
    DocumentFragment,
    /// Document type declaration
    Dtd,
    /// Entity declaration inside a DTD
    EntityDeclaration,
}

impl NodeKind {
    /// Whether nodes of this kind may hold child nodes.
    #[inline]
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Element | NodeKind::DocumentFragment | NodeKind::Dtd
        )
    }
}

/// A namespace declaration carried on an element (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// Declared prefix; `None` for the default namespace
    pub prefix: Option<String>,
    /// Namespace URI
    pub uri: String,
}

impl NsDecl {
    /// The attribute-style key for this declaration: `xmlns` or `xmlns:<prefix>`.
    pub fn key(&self) -> String {
        match &self.prefix {
            Some(p) => format!("xmlns:{}", p),
            None => "xmlns".to_string(),
        }
    }
}

/// An XML node in the arena.
///
/// Shared fields live here for every kind; kind-specific data uses the same
/// slots with different meaning (attribute values in `content`, PI targets
/// in `name`). Attribute nodes reuse the sibling links for the element's
/// property chain.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Element/PI/attribute/DTD name; `None` for text-ish nodes
    pub name: Option<String>,
    /// Text payload; for attributes this is the entity-encoded value
    pub content: Option<String>,
    /// Parent node (None while detached or for the document root)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Head of the attribute chain (elements only)
    pub first_attr: Option<NodeId>,
    /// The node's own namespace prefix, if any
    pub ns_prefix: Option<String>,
    /// Namespace declarations made on this element
    pub ns_decls: Vec<NsDecl>,
}

impl TreeNode {
    fn blank(kind: NodeKind) -> Self {
        TreeNode {
            kind,
            name: None,
            content: None,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            first_attr: None,
            ns_prefix: None,
            ns_decls: Vec::new(),
        }
    }

    /// Create the document root node
    pub fn document() -> Self {
        TreeNode::blank(NodeKind::Document)
    }

    /// Create a standalone element node
    pub fn element(name: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::Element);
        node.name = Some(name.into());
        node
    }

    /// Create a text node
    pub fn text(content: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::Text);
        node.content = Some(content.into());
        node
    }

    /// Create a CDATA node
    pub fn cdata(content: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::CData);
        node.content = Some(content.into());
        node
    }

    /// Create a comment node
    pub fn comment(content: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::Comment);
        node.content = Some(content.into());
        node
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target: impl Into<String>, data: Option<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::ProcessingInstruction);
        node.name = Some(target.into());
        node.content = data;
        node
    }

    /// Create an attribute node holding an already-encoded value
    pub fn attribute(name: impl Into<String>, encoded_value: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::Attribute);
        node.name = Some(name.into());
        node.content = Some(encoded_value.into());
        node
    }

    /// Create an entity reference node
    pub fn entity_reference(name: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::EntityReference);
        node.name = Some(name.into());
        node
    }

    /// Create a document fragment node
    pub fn fragment() -> Self {
        TreeNode::blank(NodeKind::DocumentFragment)
    }

    /// Create a DTD node
    pub fn dtd(name: impl Into<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::Dtd);
        node.name = Some(name.into());
        node
    }

    /// Create an entity declaration node
    pub fn entity_declaration(name: impl Into<String>, value: Option<String>) -> Self {
        let mut node = TreeNode::blank(NodeKind::EntityDeclaration);
        node.name = Some(name.into());
        node.content = value;
        node
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this is a text node
    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// Check if this node carries attributes
    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.first_attr.is_some()
    }

    /// Whether the node is attached to a parent (attribute chains count)
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = TreeNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert!(doc.kind.is_container());
    }

    #[test]
    fn test_element_node() {
        let elem = TreeNode::element("item");
        assert_eq!(elem.kind, NodeKind::Element);
        assert_eq!(elem.name.as_deref(), Some("item"));
        assert!(!elem.is_attached());
    }

    #[test]
    fn test_text_is_not_container() {
        let text = TreeNode::text("hello");
        assert!(text.is_text());
        assert!(!text.kind.is_container());
    }

    #[test]
    fn test_ns_decl_keys() {
        let default = NsDecl { prefix: None, uri: "urn:a".into() };
        let prefixed = NsDecl { prefix: Some("svg".into()), uri: "urn:b".into() };
        assert_eq!(default.key(), "xmlns");
        assert_eq!(prefixed.key(), "xmlns:svg");
    }
}
