//! Arena-based mutable XML document
//!
//! All nodes live in a `Vec` owned by the document; `NodeId` indices are the
//! only way to refer to them. Slots are never deallocated while the document
//! is alive, so an id handed out once stays valid forever — a node that gets
//! merged away by text coalescing is left behind as a detached empty slot.
//!
//! Structural rules follow the usual libxml2-style tree semantics: appending
//! unlinks first, inserting a text node next to an existing text node merges
//! the content into the survivor, and the caller is told which node actually
//! ended up in the tree.

use super::entities;
use super::node::{NodeId, NodeKind, NsDecl, TreeNode};
use crate::error::TreeError;

/// A mutable XML document stored in arena format
pub struct Document {
    /// Arena of nodes; index 0 is the document node
    nodes: Vec<TreeNode>,
    /// Internal DTD subset, if one was created
    int_subset: Option<NodeId>,
}

impl Document {
    /// Create an empty document (just the document root node)
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(16);
        nodes.push(TreeNode::document());
        Document { nodes, int_subset: None }
    }

    /// The document root node id (always 0)
    #[inline]
    pub fn root(&self) -> NodeId {
        0
    }

    /// Get a node by id, if the id is in range
    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id as usize)
    }

    /// Get a node by id. Ids only ever come from this document, so an
    /// out-of-range id is a programming error.
    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id as usize]
    }

    /// Number of node slots in the arena (live and detached)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First element child of the document node
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root()).find(|&id| self.node(id).is_element())
    }

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocate a standalone element, not yet attached to any tree
    pub fn new_element(&mut self, name: &str) -> NodeId {
        self.alloc(TreeNode::element(name))
    }

    /// Allocate a standalone text node
    pub fn new_text(&mut self, content: &str) -> NodeId {
        self.alloc(TreeNode::text(content))
    }

    /// Allocate a standalone comment node
    pub fn new_comment(&mut self, content: &str) -> NodeId {
        self.alloc(TreeNode::comment(content))
    }

    /// Allocate a standalone CDATA node
    pub fn new_cdata(&mut self, content: &str) -> NodeId {
        self.alloc(TreeNode::cdata(content))
    }

    /// Allocate a standalone processing instruction
    pub fn new_processing_instruction(&mut self, target: &str, data: Option<&str>) -> NodeId {
        self.alloc(TreeNode::processing_instruction(target, data.map(str::to_string)))
    }

    /// Allocate a standalone document fragment
    pub fn new_fragment(&mut self) -> NodeId {
        self.alloc(TreeNode::fragment())
    }

    /// Allocate a standalone entity reference
    pub fn new_entity_reference(&mut self, name: &str) -> NodeId {
        self.alloc(TreeNode::entity_reference(name))
    }

    /// Create the internal DTD subset for this document. Any existing
    /// subset is unlinked first; its node stays a valid detached slot.
    pub fn create_internal_subset(&mut self, name: &str) -> NodeId {
        if let Some(old) = self.int_subset.take() {
            self.unlink(old);
        }
        let dtd = self.alloc(TreeNode::dtd(name));
        self.link_child(self.root(), dtd);
        self.int_subset = Some(dtd);
        dtd
    }

    /// Add an entity declaration under the given DTD node
    pub fn new_entity_declaration(
        &mut self,
        dtd: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> NodeId {
        let decl = self.alloc(TreeNode::entity_declaration(name, value.map(str::to_string)));
        self.link_child(dtd, decl);
        decl
    }

    /// The document's internal DTD subset, if any
    pub fn internal_subset(&self) -> Option<NodeId> {
        self.int_subset
    }

    // ------------------------------------------------------------------
    // Linking and unlinking
    // ------------------------------------------------------------------

    /// Raw append of `child` under `parent`, fixing up sibling links.
    /// Callers must have validated and unlinked beforehand.
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.node(parent_id).last_child;

        if let Some(last_child_id) = last_child_opt {
            self.node_mut(child_id).prev_sibling = Some(last_child_id);
            self.node_mut(last_child_id).next_sibling = Some(child_id);
        } else {
            self.node_mut(parent_id).first_child = Some(child_id);
        }
        self.node_mut(parent_id).last_child = Some(child_id);
        self.node_mut(child_id).parent = Some(parent_id);
        self.node_mut(child_id).next_sibling = None;
    }

    /// Detach a node from its tree. The node keeps its own subtree and
    /// becomes a standalone root. Idempotent. Attribute nodes are removed
    /// from their element's property chain instead.
    pub fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next, kind) = {
            let n = self.node(id);
            (n.parent, n.prev_sibling, n.next_sibling, n.kind)
        };

        if let Some(parent_id) = parent {
            if kind == NodeKind::Attribute {
                if self.node(parent_id).first_attr == Some(id) {
                    self.node_mut(parent_id).first_attr = next;
                }
            } else {
                if self.node(parent_id).first_child == Some(id) {
                    self.node_mut(parent_id).first_child = next;
                }
                if self.node(parent_id).last_child == Some(id) {
                    self.node_mut(parent_id).last_child = prev;
                }
            }
        }
        if let Some(prev_id) = prev {
            self.node_mut(prev_id).next_sibling = next;
        }
        if let Some(next_id) = next {
            self.node_mut(next_id).prev_sibling = prev;
        }

        let n = self.node_mut(id);
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// True when `ancestor` appears on the parent chain of `id`
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).parent;
        }
        false
    }

    fn check_insert(&self, anchor: NodeId, inserted: NodeId) -> Result<(), TreeError> {
        let kind = self.node(inserted).kind;
        if matches!(kind, NodeKind::Document | NodeKind::Attribute) {
            return Err(TreeError::BadInsert(kind));
        }
        if anchor == inserted {
            return Err(TreeError::SelfInsert);
        }
        if self.is_ancestor(inserted, anchor) {
            return Err(TreeError::CycleDetected);
        }
        Ok(())
    }

    /// Unlink `child` from wherever it is and append it under `parent`.
    ///
    /// If the child is a text node and the parent's last child is also text,
    /// the content is merged into the existing node instead; the returned id
    /// is then the surviving node, not `child`, and the child slot is left
    /// detached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, TreeError> {
        let parent_kind = self.node(parent).kind;
        if !parent_kind.is_container() {
            return Err(TreeError::NotAContainer(parent_kind));
        }
        self.check_insert(parent, child)?;

        self.unlink(child);

        if self.node(child).is_text() {
            if let Some(last) = self.node(parent).last_child {
                if self.node(last).is_text() {
                    let merged = self.node(child).content.clone().unwrap_or_default();
                    self.node_mut(last)
                        .content
                        .get_or_insert_with(String::new)
                        .push_str(&merged);
                    return Ok(last);
                }
            }
        }

        self.link_child(parent, child);
        Ok(child)
    }

    /// Insert `sibling` immediately after `node`.
    ///
    /// Text-next-to-text coalesces: the content moves into the existing
    /// neighbor and the surviving id is returned.
    pub fn add_next_sibling(&mut self, node: NodeId, sibling: NodeId) -> Result<NodeId, TreeError> {
        if self.node(node).parent.is_none() {
            return Err(TreeError::Detached);
        }
        self.check_insert(node, sibling)?;

        self.unlink(sibling);

        if self.node(sibling).is_text() {
            let incoming = self.node(sibling).content.clone().unwrap_or_default();
            if self.node(node).is_text() {
                self.node_mut(node)
                    .content
                    .get_or_insert_with(String::new)
                    .push_str(&incoming);
                return Ok(node);
            }
            if let Some(next) = self.node(node).next_sibling {
                if self.node(next).is_text() {
                    let existing = self.node_mut(next).content.get_or_insert_with(String::new);
                    existing.insert_str(0, &incoming);
                    return Ok(next);
                }
            }
        }

        let parent = self.node(node).parent;
        let next = self.node(node).next_sibling;
        self.node_mut(sibling).parent = parent;
        self.node_mut(sibling).prev_sibling = Some(node);
        self.node_mut(sibling).next_sibling = next;
        self.node_mut(node).next_sibling = Some(sibling);
        match next {
            Some(next_id) => self.node_mut(next_id).prev_sibling = Some(sibling),
            None => {
                if let Some(parent_id) = parent {
                    self.node_mut(parent_id).last_child = Some(sibling);
                }
            }
        }
        Ok(sibling)
    }

    /// Insert `sibling` immediately before `node`, with the same coalescing
    /// behavior as [`Document::add_next_sibling`].
    pub fn add_prev_sibling(&mut self, node: NodeId, sibling: NodeId) -> Result<NodeId, TreeError> {
        if self.node(node).parent.is_none() {
            return Err(TreeError::Detached);
        }
        self.check_insert(node, sibling)?;

        self.unlink(sibling);

        if self.node(sibling).is_text() {
            let incoming = self.node(sibling).content.clone().unwrap_or_default();
            if self.node(node).is_text() {
                let existing = self.node_mut(node).content.get_or_insert_with(String::new);
                existing.insert_str(0, &incoming);
                return Ok(node);
            }
            if let Some(prev) = self.node(node).prev_sibling {
                if self.node(prev).is_text() {
                    self.node_mut(prev)
                        .content
                        .get_or_insert_with(String::new)
                        .push_str(&incoming);
                    return Ok(prev);
                }
            }
        }

        let parent = self.node(node).parent;
        let prev = self.node(node).prev_sibling;
        self.node_mut(sibling).parent = parent;
        self.node_mut(sibling).next_sibling = Some(node);
        self.node_mut(sibling).prev_sibling = prev;
        self.node_mut(node).prev_sibling = Some(sibling);
        match prev {
            Some(prev_id) => self.node_mut(prev_id).next_sibling = Some(sibling),
            None => {
                if let Some(parent_id) = parent {
                    self.node_mut(parent_id).first_child = Some(sibling);
                }
            }
        }
        Ok(sibling)
    }

    /// Swap `old` out of the tree for `replacement`. `old` ends up detached
    /// with its subtree intact. Only meaningful for attached nodes.
    /// Replacing a node with itself is a no-op.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> Result<(), TreeError> {
        if old == replacement {
            return Ok(());
        }
        if self.node(old).parent.is_none() {
            return Err(TreeError::Detached);
        }
        self.check_insert(old, replacement)?;

        self.unlink(replacement);

        let (parent, prev, next) = {
            let n = self.node(old);
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        self.unlink(old);

        self.node_mut(replacement).parent = parent;
        self.node_mut(replacement).prev_sibling = prev;
        self.node_mut(replacement).next_sibling = next;
        match prev {
            Some(prev_id) => self.node_mut(prev_id).next_sibling = Some(replacement),
            None => {
                if let Some(parent_id) = parent {
                    self.node_mut(parent_id).first_child = Some(replacement);
                }
            }
        }
        match next {
            Some(next_id) => self.node_mut(next_id).prev_sibling = Some(replacement),
            None => {
                if let Some(parent_id) = parent {
                    self.node_mut(parent_id).last_child = Some(replacement);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copying
    // ------------------------------------------------------------------

    /// Copy a node within this document. `deep` copies the whole subtree,
    /// otherwise only the node itself (attributes are carried either way).
    /// Document nodes cannot be copied; that yields `None`, not an error.
    pub fn copy_node(&mut self, id: NodeId, deep: bool) -> Option<NodeId> {
        if self.node(id).kind == NodeKind::Document {
            return None;
        }
        Some(self.copy_rec(id, deep))
    }

    fn copy_rec(&mut self, id: NodeId, deep: bool) -> NodeId {
        let mut fresh = self.node(id).clone();
        fresh.parent = None;
        fresh.prev_sibling = None;
        fresh.next_sibling = None;
        fresh.first_child = None;
        fresh.last_child = None;
        fresh.first_attr = None;
        let copy = self.alloc(fresh);

        // Attributes travel with the node even on shallow copies
        let attrs: Vec<NodeId> = self.attribute_nodes(id);
        for attr in attrs {
            let node = self.node(attr);
            let fresh_attr = TreeNode::attribute(
                node.name.clone().unwrap_or_default(),
                node.content.clone().unwrap_or_default(),
            );
            let attr_copy = self.alloc(fresh_attr);
            self.push_attr(copy, attr_copy);
        }

        if deep {
            let children: Vec<NodeId> = self.children(id).collect();
            for child in children {
                let child_copy = self.copy_rec(child, true);
                self.link_child(copy, child_copy);
            }
        }
        copy
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn push_attr(&mut self, elem: NodeId, attr: NodeId) {
        self.node_mut(attr).parent = Some(elem);
        match self.node(elem).first_attr {
            None => self.node_mut(elem).first_attr = Some(attr),
            Some(first) => {
                let mut cursor = first;
                while let Some(next) = self.node(cursor).next_sibling {
                    cursor = next;
                }
                self.node_mut(cursor).next_sibling = Some(attr);
                self.node_mut(attr).prev_sibling = Some(cursor);
            }
        }
    }

    /// Find the attribute node with the given name on an element
    pub fn attribute_node(&self, elem: NodeId, name: &str) -> Option<NodeId> {
        let mut cursor = self.node(elem).first_attr;
        while let Some(id) = cursor {
            if self.node(id).name.as_deref() == Some(name) {
                return Some(id);
            }
            cursor = self.node(id).next_sibling;
        }
        None
    }

    /// All attribute nodes of an element, in document order
    pub fn attribute_nodes(&self, elem: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.node(elem).first_attr;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.node(id).next_sibling;
        }
        out
    }

    /// Set an attribute. The value is entity-encoded before storage; an
    /// existing attribute node with the same name is reused.
    pub fn set_attribute(&mut self, elem: NodeId, name: &str, value: &str) {
        let encoded = entities::encode_entities(value).into_owned();
        match self.attribute_node(elem, name) {
            Some(attr) => self.node_mut(attr).content = Some(encoded),
            None => {
                let attr = self.alloc(TreeNode::attribute(name, encoded));
                self.push_attr(elem, attr);
            }
        }
    }

    /// Look up an attribute value; decodes what `set_attribute` encoded,
    /// so callers see the literal value they stored. `None` when unset.
    pub fn get_attribute(&self, elem: NodeId, name: &str) -> Option<String> {
        let attr = self.attribute_node(elem, name)?;
        let raw = self.node(attr).content.as_deref().unwrap_or("");
        Some(entities::decode_entities(raw).into_owned())
    }

    /// Whether the attribute is set at all
    pub fn has_attribute(&self, elem: NodeId, name: &str) -> bool {
        self.attribute_node(elem, name).is_some()
    }

    // ------------------------------------------------------------------
    // Names and content
    // ------------------------------------------------------------------

    /// Node name (element/PI/attribute/DTD); `None` for unnamed kinds
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name.as_deref()
    }

    /// Rename a node
    pub fn set_name(&mut self, id: NodeId, name: &str) {
        self.node_mut(id).name = Some(name.to_string());
    }

    /// Full text content of a node. Containers concatenate the text of
    /// their descendants; attributes decode their stored value.
    pub fn content(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text
            | NodeKind::CData
            | NodeKind::Comment
            | NodeKind::ProcessingInstruction => node.content.clone().unwrap_or_default(),
            NodeKind::Attribute => {
                entities::decode_entities(node.content.as_deref().unwrap_or("")).into_owned()
            }
            NodeKind::Element | NodeKind::DocumentFragment | NodeKind::Document => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
            _ => String::new(),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            match self.node(child).kind {
                NodeKind::Text | NodeKind::CData => {
                    if let Some(text) = self.node(child).content.as_deref() {
                        out.push_str(text);
                    }
                }
                NodeKind::Element => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    /// Replace the entire content of a node. For containers this drops all
    /// children and installs a single text node.
    pub fn set_content(&mut self, id: NodeId, content: &str) {
        if self.node(id).kind.is_container() {
            let children: Vec<NodeId> = self.children(id).collect();
            for child in children {
                self.unlink(child);
            }
            let text = self.new_text(content);
            self.link_child(id, text);
        } else {
            self.node_mut(id).content = Some(content.to_string());
        }
    }

    /// Whether the node is whitespace-only text
    pub fn is_blank(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text | NodeKind::CData => node
                .content
                .as_deref()
                .is_none_or(|c| c.chars().all(|ch| ch.is_ascii_whitespace())),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------

    /// Declare a namespace on an element. A redeclaration of the same
    /// prefix replaces the previous URI.
    pub fn declare_namespace(&mut self, elem: NodeId, prefix: Option<&str>, uri: &str) {
        let decl = NsDecl { prefix: prefix.map(str::to_string), uri: uri.to_string() };
        let decls = &mut self.node_mut(elem).ns_decls;
        match decls.iter_mut().find(|d| d.prefix.as_deref() == prefix) {
            Some(existing) => existing.uri = decl.uri,
            None => decls.push(decl),
        }
    }

    /// Set the node's own namespace prefix
    pub fn set_namespace_prefix(&mut self, id: NodeId, prefix: &str) {
        self.node_mut(id).ns_prefix = Some(prefix.to_string());
    }

    /// The node's own namespace prefix, if any
    pub fn namespace_prefix(&self, id: NodeId) -> Option<&str> {
        self.node(id).ns_prefix.as_deref()
    }

    /// Namespace declarations made directly on this node. Empty for
    /// non-element nodes.
    pub fn namespace_declarations(&self, id: NodeId) -> &[NsDecl] {
        let node = self.node(id);
        if node.is_element() {
            &node.ns_decls
        } else {
            &[]
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Structural path locating this node within its document, in the
    /// familiar `/shelf/book[2]/text()` shape. Positions are emitted only
    /// when a node has same-named siblings of the same kind.
    pub fn node_path(&self, id: NodeId) -> String {
        let node = self.node(id);
        if node.kind == NodeKind::Document {
            return "/".to_string();
        }
        if node.kind == NodeKind::Attribute {
            let mut base = match node.parent {
                Some(parent) => self.node_path(parent),
                None => String::new(),
            };
            if base == "/" {
                base.clear();
            }
            return format!("{}/@{}", base, node.name.as_deref().unwrap_or(""));
        }

        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.kind == NodeKind::Document {
                break;
            }
            segments.push(self.path_segment(current));
            cursor = node.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn path_segment(&self, id: NodeId) -> String {
        let node = self.node(id);
        let label = match node.kind {
            NodeKind::Element => match &node.ns_prefix {
                Some(prefix) => format!("{}:{}", prefix, node.name.as_deref().unwrap_or("")),
                None => node.name.clone().unwrap_or_default(),
            },
            NodeKind::Text | NodeKind::CData => "text()".to_string(),
            NodeKind::Comment => "comment()".to_string(),
            NodeKind::ProcessingInstruction => {
                format!("processing-instruction('{}')", node.name.as_deref().unwrap_or(""))
            }
            _ => node.name.clone().unwrap_or_default(),
        };

        let (position, total) = self.sibling_occurrence(id);
        if total > 1 {
            format!("{}[{}]", label, position)
        } else {
            label
        }
    }

    /// 1-based position of this node among same-labelled siblings, and the
    /// total count of those siblings.
    fn sibling_occurrence(&self, id: NodeId) -> (usize, usize) {
        let node = self.node(id);
        let Some(parent) = node.parent else { return (1, 1) };
        let matches = |other: NodeId| {
            let a = self.node(id);
            let b = self.node(other);
            match a.kind {
                // text() positions count text and CDATA alike
                NodeKind::Text | NodeKind::CData => {
                    matches!(b.kind, NodeKind::Text | NodeKind::CData)
                }
                _ => a.kind == b.kind && a.name == b.name,
            }
        };
        let mut position = 0;
        let mut total = 0;
        for sibling in self.children(parent) {
            if matches(sibling) {
                total += 1;
                if sibling == id {
                    position = total;
                }
            }
        }
        (position.max(1), total)
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.node(id).first_child;
        ChildIter { doc: self, next: first }
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}
