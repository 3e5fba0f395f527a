//! Node operation façade
//!
//! [`BoundDocument`] owns the arena tree, the wrapper identity cache, and
//! the decoration hook, and exposes every node operation the host sees.
//! Each operation unwraps handles to node ids, delegates to the tree
//! layer, and routes any resulting node back through the cache so callers
//! always hold canonical wrappers.

use super::cache::WrapCache;
use super::handle::{NodeHandle, NodeRef};
use super::{NodeDecorator, NoopDecorator};
use crate::dom::{serialize, Document, NodeId, NodeKind};
use crate::error::TreeError;
use log::{debug, warn};
use std::collections::HashMap;

/// A document plus the binding state the host object system needs
pub struct BoundDocument {
    tree: Document,
    cache: WrapCache,
    decorator: Box<dyn NodeDecorator>,
}

impl BoundDocument {
    /// Create an empty bound document with the no-op decorator
    pub fn new() -> Self {
        BoundDocument {
            tree: Document::new(),
            cache: WrapCache::new(),
            decorator: Box::new(NoopDecorator),
        }
    }

    /// Create an empty bound document with a custom decoration hook
    pub fn with_decorator(decorator: Box<dyn NodeDecorator>) -> Self {
        BoundDocument { tree: Document::new(), cache: WrapCache::new(), decorator }
    }

    /// Read access to the underlying tree
    pub fn tree(&self) -> &Document {
        &self.tree
    }

    /// Number of live wrappers in the identity cache
    pub fn cached_wrappers(&self) -> usize {
        self.cache.len()
    }

    // ------------------------------------------------------------------
    // Wrapping
    // ------------------------------------------------------------------

    /// The single live wrapper for a node: cached if one exists, otherwise
    /// freshly built, registered, and decorated. Wrapping an id that never
    /// came from this document is a programming error and panics.
    pub fn wrap(&mut self, id: NodeId) -> NodeRef {
        debug_assert!(
            (id as usize) < self.tree.node_count(),
            "wrap of id {} from another document",
            id
        );
        if let Some(existing) = self.cache.get(id) {
            return existing;
        }
        let kind = self.tree.node(id).kind;
        let node = NodeHandle::new(kind, id);
        self.cache.insert(id, node.clone());
        self.decorator.decorate(&self.tree, &node);
        node
    }

    /// Wrapper for the document node itself
    pub fn document_node(&mut self) -> NodeRef {
        let root = self.tree.root();
        self.wrap(root)
    }

    /// Resolve an opaque identity token back to a wrapper
    pub fn resolve_token(&mut self, token: u64) -> Option<NodeRef> {
        if (token as usize) < self.tree.node_count() {
            Some(self.wrap(token as NodeId))
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Allocate a new standalone element owned by this document
    pub fn create_element(&mut self, name: &str) -> NodeRef {
        let id = self.tree.new_element(name);
        self.wrap(id)
    }

    /// Allocate a new element and run a customization callback on the
    /// wrapper before handing it out
    pub fn create_element_with<F>(&mut self, name: &str, customize: F) -> NodeRef
    where
        F: FnOnce(&mut BoundDocument, &NodeRef),
    {
        let node = self.create_element(name);
        customize(self, &node);
        node
    }

    /// Allocate a new standalone text node
    pub fn create_text(&mut self, content: &str) -> NodeRef {
        let id = self.tree.new_text(content);
        self.wrap(id)
    }

    /// Allocate a new standalone comment node
    pub fn create_comment(&mut self, content: &str) -> NodeRef {
        let id = self.tree.new_comment(content);
        self.wrap(id)
    }

    /// Allocate a new standalone CDATA node
    pub fn create_cdata(&mut self, content: &str) -> NodeRef {
        let id = self.tree.new_cdata(content);
        self.wrap(id)
    }

    /// Allocate a new standalone processing instruction
    pub fn create_processing_instruction(&mut self, target: &str, data: Option<&str>) -> NodeRef {
        let id = self.tree.new_processing_instruction(target, data);
        self.wrap(id)
    }

    /// Allocate a new standalone document fragment
    pub fn create_fragment(&mut self) -> NodeRef {
        let id = self.tree.new_fragment();
        self.wrap(id)
    }

    /// Allocate a new standalone entity reference
    pub fn create_entity_reference(&mut self, name: &str) -> NodeRef {
        let id = self.tree.new_entity_reference(name);
        self.wrap(id)
    }

    /// Create (or replace) the document's internal DTD subset
    pub fn create_internal_subset(&mut self, name: &str) -> NodeRef {
        let id = self.tree.create_internal_subset(name);
        self.wrap(id)
    }

    /// Add an entity declaration under a DTD node
    pub fn create_entity_declaration(
        &mut self,
        dtd: &NodeRef,
        name: &str,
        value: Option<&str>,
    ) -> NodeRef {
        let id = self.tree.new_entity_declaration(dtd.target(), name, value);
        self.wrap(id)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attribute value, or `None` when not set. Never an error.
    pub fn get_attribute(&self, node: &NodeRef, name: &str) -> Option<String> {
        self.tree.get_attribute(node.target(), name)
    }

    /// Set an attribute; entity encoding happens inside the tree layer so
    /// the getter sees the literal value again
    pub fn set_attribute(&mut self, node: &NodeRef, name: &str, value: &str) {
        self.tree.set_attribute(node.target(), name, value);
    }

    /// Whether the attribute is set
    pub fn has_attribute(&self, node: &NodeRef, name: &str) -> bool {
        self.tree.has_attribute(node.target(), name)
    }

    /// Wrapper for the named attribute node, or `None`
    pub fn attribute_node(&mut self, node: &NodeRef, name: &str) -> Option<NodeRef> {
        let id = self.tree.attribute_node(node.target(), name)?;
        Some(self.wrap(id))
    }

    /// Wrappers for all attribute nodes, in document order
    pub fn attribute_nodes(&mut self, node: &NodeRef) -> Vec<NodeRef> {
        let ids = self.tree.attribute_nodes(node.target());
        ids.into_iter().map(|id| self.wrap(id)).collect()
    }

    // ------------------------------------------------------------------
    // Names and content
    // ------------------------------------------------------------------

    /// Node name, or `None` for unnamed kinds
    pub fn name(&self, node: &NodeRef) -> Option<String> {
        self.tree.name(node.target()).map(str::to_string)
    }

    /// Rename the node
    pub fn set_name(&mut self, node: &NodeRef, name: &str) {
        self.tree.set_name(node.target(), name);
    }

    /// Full text content (containers concatenate descendant text)
    pub fn content(&self, node: &NodeRef) -> String {
        self.tree.content(node.target())
    }

    /// Replace the node's entire content
    pub fn set_content(&mut self, node: &NodeRef, content: &str) {
        self.tree.set_content(node.target(), content);
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Unlink `child` from wherever it is and append it under `parent`.
    ///
    /// When the tree coalesces the child into an adjacent text node, the
    /// child wrapper is repointed to the survivor before returning, so the
    /// caller's reference stays live. The returned wrapper is the
    /// canonical one for the effective child and may not be `child`.
    pub fn add_child(&mut self, parent: &NodeRef, child: &NodeRef) -> Result<NodeRef, TreeError> {
        let child_id = child.target();
        let effective = self
            .tree
            .append_child(parent.target(), child_id)
            .inspect_err(|e| warn!("add_child under {} rejected: {}", parent.token(), e))?;
        if effective != child_id {
            debug!("child {} coalesced into {}, repointing wrapper", child_id, effective);
            self.cache.repoint(child, effective);
        }
        Ok(self.wrap(effective))
    }

    /// Insert `sibling` immediately after `node`, with the same repointing
    /// guarantee as [`BoundDocument::add_child`]. The decoration hook runs
    /// on the resulting wrapper afterward.
    pub fn add_next_sibling(
        &mut self,
        node: &NodeRef,
        sibling: &NodeRef,
    ) -> Result<NodeRef, TreeError> {
        let sibling_id = sibling.target();
        let effective = self
            .tree
            .add_next_sibling(node.target(), sibling_id)
            .inspect_err(|e| warn!("add_next_sibling after {} rejected: {}", node.token(), e))?;
        if effective != sibling_id {
            debug!("sibling {} coalesced into {}, repointing wrapper", sibling_id, effective);
            self.cache.repoint(sibling, effective);
        }
        let result = self.wrap(effective);
        self.decorator.decorate(&self.tree, &result);
        Ok(result)
    }

    /// Insert `sibling` immediately before `node`; see
    /// [`BoundDocument::add_next_sibling`]
    pub fn add_previous_sibling(
        &mut self,
        node: &NodeRef,
        sibling: &NodeRef,
    ) -> Result<NodeRef, TreeError> {
        let sibling_id = sibling.target();
        let effective = self
            .tree
            .add_prev_sibling(node.target(), sibling_id)
            .inspect_err(|e| warn!("add_previous_sibling before {} rejected: {}", node.token(), e))?;
        if effective != sibling_id {
            debug!("sibling {} coalesced into {}, repointing wrapper", sibling_id, effective);
            self.cache.repoint(sibling, effective);
        }
        let result = self.wrap(effective);
        self.decorator.decorate(&self.tree, &result);
        Ok(result)
    }

    /// Swap this node out of the tree for `replacement`; returns the
    /// original wrapper, now detached. Same-document nodes only.
    pub(crate) fn replace(
        &mut self,
        node: &NodeRef,
        replacement: &NodeRef,
    ) -> Result<NodeRef, TreeError> {
        self.tree.replace(node.target(), replacement.target())?;
        Ok(node.clone())
    }

    /// Detach the node from its tree; it stays a valid standalone subtree.
    /// Returns the same wrapper.
    pub fn unlink(&mut self, node: &NodeRef) -> NodeRef {
        self.tree.unlink(node.target());
        node.clone()
    }

    /// Copy the node under the same document. `None` when the tree layer
    /// refuses (document nodes).
    pub fn duplicate(&mut self, node: &NodeRef, deep: bool) -> Option<NodeRef> {
        let copy = self.tree.copy_node(node.target(), deep)?;
        Some(self.wrap(copy))
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Parent wrapper, or `None` for standalone roots
    pub fn parent(&mut self, node: &NodeRef) -> Option<NodeRef> {
        let id = self.tree.node(node.target()).parent?;
        Some(self.wrap(id))
    }

    /// First child wrapper, or `None`
    pub fn child(&mut self, node: &NodeRef) -> Option<NodeRef> {
        let id = self.tree.node(node.target()).first_child?;
        Some(self.wrap(id))
    }

    /// Next sibling wrapper, or `None`
    pub fn next_sibling(&mut self, node: &NodeRef) -> Option<NodeRef> {
        let id = self.tree.node(node.target()).next_sibling?;
        Some(self.wrap(id))
    }

    /// Previous sibling wrapper, or `None`
    pub fn previous_sibling(&mut self, node: &NodeRef) -> Option<NodeRef> {
        let id = self.tree.node(node.target()).prev_sibling?;
        Some(self.wrap(id))
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// The node's kind tag
    pub fn node_kind(&self, node: &NodeRef) -> NodeKind {
        node.kind()
    }

    /// Structural path expression locating the node in its document
    pub fn node_path(&self, node: &NodeRef) -> String {
        self.tree.node_path(node.target())
    }

    /// Whether the node is whitespace-only text
    pub fn is_blank(&self, node: &NodeRef) -> bool {
        self.tree.is_blank(node.target())
    }

    /// Wrapper for the document's internal DTD subset, or `None`
    pub fn internal_subset(&mut self) -> Option<NodeRef> {
        let id = self.tree.internal_subset()?;
        Some(self.wrap(id))
    }

    // ------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------

    /// The node's own namespace prefix, if any
    pub fn namespace_prefix(&self, node: &NodeRef) -> Option<String> {
        self.tree.namespace_prefix(node.target()).map(str::to_string)
    }

    /// Set the node's own namespace prefix
    pub fn set_namespace_prefix(&mut self, node: &NodeRef, prefix: &str) {
        self.tree.set_namespace_prefix(node.target(), prefix);
    }

    /// Declare a namespace on an element
    pub fn declare_namespace(&mut self, node: &NodeRef, prefix: Option<&str>, uri: &str) {
        self.tree.declare_namespace(node.target(), prefix, uri);
    }

    /// Namespace declarations on this node as a `"xmlns[:prefix]"` -> URI
    /// mapping; empty for non-element nodes
    pub fn namespaces(&self, node: &NodeRef) -> HashMap<String, String> {
        self.tree
            .namespace_declarations(node.target())
            .iter()
            .map(|decl| (decl.key(), decl.uri.clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Escape XML-significant characters per this document's rules
    pub fn encode_special_chars(&self, input: &str) -> String {
        crate::dom::entities::encode_special_chars(input).into_owned()
    }

    /// Render the node and its descendants as an XML fragment
    pub fn to_xml(&self, node: &NodeRef, format: bool) -> String {
        serialize::dump_xml(&self.tree, node.target(), format)
    }

    /// Render the node as HTML. A whole-document node goes through the
    /// XML serializer instead.
    pub fn to_html(&self, node: &NodeRef) -> String {
        if node.kind() == NodeKind::Document {
            self.to_xml(node, true)
        } else {
            serialize::dump_html(&self.tree, node.target())
        }
    }
}

impl Default for BoundDocument {
    fn default() -> Self {
        BoundDocument::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn doc_with_root() -> (BoundDocument, NodeRef) {
        let mut doc = BoundDocument::new();
        let root = doc.create_element("root");
        let doc_node = doc.document_node();
        doc.add_child(&doc_node, &root).unwrap();
        (doc, root)
    }

    #[test]
    fn test_identity_stability() {
        let (mut doc, root) = doc_with_root();
        let child = doc.create_element("child");
        doc.add_child(&root, &child).unwrap();

        let via_traversal = doc.child(&root).unwrap();
        assert!(Arc::ptr_eq(&via_traversal, &child));
        let again = doc.wrap(child.target());
        assert!(Arc::ptr_eq(&again, &child));
    }

    #[test]
    fn test_identity_across_parent_lookup() {
        let (mut doc, root) = doc_with_root();
        let child = doc.create_element("child");
        doc.add_child(&root, &child).unwrap();
        let parent = doc.parent(&child).unwrap();
        assert!(Arc::ptr_eq(&parent, &root));
    }

    #[test]
    fn test_element_round_trip_serialization() {
        let mut doc = BoundDocument::new();
        let a = doc.create_element("a");
        doc.set_content(&a, "hello");
        assert_eq!(doc.to_xml(&a, true), "<a>hello</a>");
    }

    #[test]
    fn test_attribute_round_trip_is_transparent() {
        let (mut doc, root) = doc_with_root();
        doc.set_attribute(&root, "id", "<x>");
        assert_eq!(doc.get_attribute(&root, "id").as_deref(), Some("<x>"));
        // but serialization shows the encoded form
        assert!(doc.to_xml(&root, false).contains("id=\"&lt;x&gt;\""));
    }

    #[test]
    fn test_missing_attribute_is_absent_not_error() {
        let (doc, root) = doc_with_root();
        assert!(doc.get_attribute(&root, "nope").is_none());
        assert!(!doc.has_attribute(&root, "nope"));
    }

    #[test]
    fn test_attribute_nodes_share_identity() {
        let (mut doc, root) = doc_with_root();
        doc.set_attribute(&root, "a", "1");
        doc.set_attribute(&root, "b", "2");
        let nodes = doc.attribute_nodes(&root);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind(), NodeKind::Attribute);
        let direct = doc.attribute_node(&root, "a").unwrap();
        assert!(Arc::ptr_eq(&direct, &nodes[0]));
    }

    #[test]
    fn test_coalescing_repoints_child_wrapper() {
        let (mut doc, root) = doc_with_root();
        let first = doc.create_text("hello ");
        doc.add_child(&root, &first).unwrap();

        let second = doc.create_text("world");
        let effective = doc.add_child(&root, &second).unwrap();

        // the tree merged `second` away; its wrapper must now follow the
        // surviving node
        assert!(Arc::ptr_eq(&effective, &first));
        assert_eq!(second.target(), first.target());
        assert_eq!(doc.content(&second), "hello world");

        // further edits through the repointed wrapper hit the live node
        doc.set_content(&second, "rewritten");
        assert_eq!(doc.content(&first), "rewritten");
    }

    #[test]
    fn test_sibling_coalescing_repoints() {
        let (mut doc, root) = doc_with_root();
        let base = doc.create_text("a");
        doc.add_child(&root, &base).unwrap();

        let tail = doc.create_text("b");
        let effective = doc.add_next_sibling(&base, &tail).unwrap();
        assert!(Arc::ptr_eq(&effective, &base));
        assert_eq!(tail.target(), base.target());
        assert_eq!(doc.content(&base), "ab");
    }

    #[test]
    fn test_rejected_sibling_is_error_not_absent() {
        let mut doc = BoundDocument::new();
        let floating = doc.create_element("floating");
        let sib = doc.create_element("sib");
        assert_eq!(
            doc.add_next_sibling(&floating, &sib).unwrap_err(),
            TreeError::Detached
        );

        let (mut doc, root) = doc_with_root();
        let text = doc.create_text("t");
        doc.add_child(&root, &text).unwrap();
        let stray = doc.create_element("stray");
        assert_eq!(
            doc.add_child(&text, &stray).unwrap_err(),
            TreeError::NotAContainer(NodeKind::Text)
        );
    }

    #[test]
    fn test_unlink_then_reattach_single_parent() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.add_child(&root, &a).unwrap();
        doc.add_child(&root, &b).unwrap();

        let unlinked = doc.unlink(&a);
        assert!(Arc::ptr_eq(&unlinked, &a));
        assert!(doc.parent(&a).is_none());

        doc.add_child(&b, &a).unwrap();
        let parent = doc.parent(&a).unwrap();
        assert!(Arc::ptr_eq(&parent, &b));
        assert!(doc.previous_sibling(&a).is_none());
        assert!(doc.next_sibling(&a).is_none());
        // old location no longer lists it
        let remaining = doc.child(&root).unwrap();
        assert!(Arc::ptr_eq(&remaining, &b));
    }

    #[test]
    fn test_namespace_enumeration() {
        let (mut doc, root) = doc_with_root();
        doc.declare_namespace(&root, None, "urn:default");
        doc.declare_namespace(&root, Some("svg"), "urn:svg");

        let map = doc.namespaces(&root);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("xmlns").map(String::as_str), Some("urn:default"));
        assert_eq!(map.get("xmlns:svg").map(String::as_str), Some("urn:svg"));

        let text = doc.create_text("t");
        assert!(doc.namespaces(&text).is_empty());
    }

    #[test]
    fn test_namespace_prefix() {
        let (mut doc, root) = doc_with_root();
        assert!(doc.namespace_prefix(&root).is_none());
        doc.set_namespace_prefix(&root, "x");
        assert_eq!(doc.namespace_prefix(&root).as_deref(), Some("x"));
    }

    #[test]
    fn test_duplicate() {
        let (mut doc, root) = doc_with_root();
        doc.set_attribute(&root, "kind", "orig");
        let child = doc.create_element("child");
        doc.add_child(&root, &child).unwrap();

        let copy = doc.duplicate(&root, true).unwrap();
        assert!(!Arc::ptr_eq(&copy, &root));
        assert_eq!(doc.get_attribute(&copy, "kind").as_deref(), Some("orig"));
        assert!(doc.child(&copy).is_some());

        let shallow = doc.duplicate(&root, false).unwrap();
        assert!(doc.child(&shallow).is_none());

        let doc_node = doc.document_node();
        assert!(doc.duplicate(&doc_node, true).is_none());
    }

    #[test]
    fn test_replace_returns_detached_original() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_element("a");
        doc.add_child(&root, &a).unwrap();
        let b = doc.create_element("b");

        let detached = doc.replace(&a, &b).unwrap();
        assert!(Arc::ptr_eq(&detached, &a));
        assert!(doc.parent(&a).is_none());
        let now_child = doc.child(&root).unwrap();
        assert!(Arc::ptr_eq(&now_child, &b));
    }

    #[test]
    fn test_node_path_and_blank() {
        let (mut doc, root) = doc_with_root();
        let blank = doc.create_text("   ");
        // coalescing cannot kick in: root has no text children yet
        doc.add_child(&root, &blank).unwrap();
        assert!(doc.is_blank(&blank));
        assert!(!doc.is_blank(&root));
        assert_eq!(doc.node_path(&root), "/root");
        assert_eq!(doc.node_path(&blank), "/root/text()");
    }

    #[test]
    fn test_internal_subset_absent_then_present() {
        let mut doc = BoundDocument::new();
        assert!(doc.internal_subset().is_none());
        let dtd = doc.create_internal_subset("html");
        let found = doc.internal_subset().unwrap();
        assert!(Arc::ptr_eq(&dtd, &found));
        assert_eq!(found.kind(), NodeKind::Dtd);

        let decl = doc.create_entity_declaration(&dtd, "nbsp", Some("\u{a0}"));
        assert_eq!(decl.kind(), NodeKind::EntityDeclaration);
    }

    #[test]
    fn test_encode_special_chars() {
        let doc = BoundDocument::new();
        assert_eq!(doc.encode_special_chars("a \"b\" & c"), "a &quot;b&quot; &amp; c");
    }

    #[test]
    fn test_to_html_document_delegates_to_xml() {
        let (mut doc, root) = doc_with_root();
        let br = doc.create_element("br");
        doc.add_child(&root, &br).unwrap();

        assert_eq!(doc.to_html(&root), "<root><br></root>");
        let doc_node = doc.document_node();
        // document nodes go through the XML serializer
        assert_eq!(doc.to_html(&doc_node), "<root>\n  <br/>\n</root>");
    }

    #[test]
    fn test_resolve_token() {
        let (mut doc, root) = doc_with_root();
        let token = root.token();
        let resolved = doc.resolve_token(token).unwrap();
        assert!(Arc::ptr_eq(&resolved, &root));
        assert!(doc.resolve_token(9999).is_none());
    }

    #[test]
    fn test_create_element_with_callback() {
        let mut doc = BoundDocument::new();
        let node = doc.create_element_with("item", |doc, node| {
            doc.set_attribute(node, "ready", "yes");
        });
        assert_eq!(doc.get_attribute(&node, "ready").as_deref(), Some("yes"));
    }

    struct Recording {
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl NodeDecorator for Recording {
        fn decorate(&self, _tree: &Document, node: &NodeRef) {
            self.seen.lock().unwrap().push(node.token());
        }
    }

    #[test]
    fn test_decorator_runs_on_wrap_and_sibling_insert() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut doc = BoundDocument::with_decorator(Box::new(Recording { seen: seen.clone() }));

        let root = doc.create_element("root");
        let doc_node = doc.document_node();
        doc.add_child(&doc_node, &root).unwrap();
        let baseline = seen.lock().unwrap().len();
        assert!(baseline >= 2); // root + document node at minimum

        // wrapping a cached node does not re-decorate
        doc.wrap(root.target());
        assert_eq!(seen.lock().unwrap().len(), baseline);

        // sibling insertion decorates again, even for cached wrappers
        let a = doc.create_element("a");
        doc.add_child(&root, &a).unwrap();
        let b = doc.create_element("b");
        let before = seen.lock().unwrap().len();
        doc.add_next_sibling(&a, &b).unwrap();
        assert!(seen.lock().unwrap().len() > before);
    }

    #[test]
    fn test_cache_only_grows() {
        let (mut doc, root) = doc_with_root();
        let before = doc.cached_wrappers();
        let a = doc.create_element("a");
        doc.add_child(&root, &a).unwrap();
        doc.unlink(&a);
        assert!(doc.cached_wrappers() > before);
    }
}
