//! DomCraft - mutable XML DOM with host-binding node identity
//!
//! Layers:
//! - dom: arena tree, entity handling, serialization
//! - bind: wrapper identity cache and the node operation façade
//! - NIF surface: thin functions mapping BEAM calls onto the façade
//!
//! Nodes cross the NIF boundary as opaque integer tokens; the façade
//! resolves them back to canonical wrappers on every call.

use rustler::{Encoder, Env, NifResult, ResourceArc, Term};

mod bind;
mod dom;
mod error;
mod resource;
mod term;

pub use bind::{BoundDocument, NodeDecorator, NodeHandle, NodeRef, NoopDecorator, WrapCache};
pub use dom::{Document, NodeId, NodeKind, NsDecl, TreeNode};
pub use error::TreeError;

use bind::BoundDocument as Doc;
use resource::{DocumentRef, DocumentResource};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Helpers
// ============================================================================

fn with_doc<R>(doc: &DocumentRef, f: impl FnOnce(&mut Doc) -> R) -> NifResult<R> {
    doc.with_doc(f).map_err(rustler::Error::Atom)
}

fn resolve<'a>(env: Env<'a>, d: &mut Doc, token: u64) -> Result<NodeRef, Term<'a>> {
    d.resolve_token(token)
        .ok_or_else(|| term::error_term(env, "unknown node token"))
}

// ============================================================================
// Document and Node Construction
// ============================================================================

/// Create a fresh empty document
#[rustler::nif]
fn new_document() -> DocumentRef {
    ResourceArc::new(DocumentResource::new())
}

/// Token for the document node itself
#[rustler::nif]
fn document_node(doc: DocumentRef) -> NifResult<u64> {
    with_doc(&doc, |d| d.document_node().token())
}

#[rustler::nif]
fn create_element(doc: DocumentRef, name: &str) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_element(name).token())
}

#[rustler::nif]
fn create_text(doc: DocumentRef, content: &str) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_text(content).token())
}

#[rustler::nif]
fn create_comment(doc: DocumentRef, content: &str) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_comment(content).token())
}

#[rustler::nif]
fn create_cdata(doc: DocumentRef, content: &str) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_cdata(content).token())
}

#[rustler::nif]
fn create_processing_instruction(
    doc: DocumentRef,
    target: &str,
    data: Option<&str>,
) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_processing_instruction(target, data).token())
}

#[rustler::nif]
fn create_fragment(doc: DocumentRef) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_fragment().token())
}

#[rustler::nif]
fn create_entity_reference(doc: DocumentRef, name: &str) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_entity_reference(name).token())
}

/// Create (or replace) the internal DTD subset
#[rustler::nif]
fn create_internal_subset(doc: DocumentRef, name: &str) -> NifResult<u64> {
    with_doc(&doc, |d| d.create_internal_subset(name).token())
}

#[rustler::nif]
fn create_entity_declaration<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    dtd_token: u64,
    name: &str,
    value: Option<&str>,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let dtd = match resolve(env, d, dtd_token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::ok_token(env, d.create_entity_declaration(&dtd, name, value).token())
    })
}

// ============================================================================
// Attributes
// ============================================================================

/// Attribute value or nil - missing attributes are never errors
#[rustler::nif]
fn get_attribute<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    name: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_str_to_term(env, d.get_attribute(&node, name).as_deref())
    })
}

#[rustler::nif]
fn set_attribute<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    name: &str,
    value: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        d.set_attribute(&node, name, value);
        rustler::types::atom::ok().encode(env)
    })
}

#[rustler::nif]
fn has_attribute(doc: DocumentRef, token: u64, name: &str) -> NifResult<bool> {
    with_doc(&doc, |d| match d.resolve_token(token) {
        Some(node) => d.has_attribute(&node, name),
        None => false,
    })
}

#[rustler::nif]
fn attribute_node<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    name: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        let attr = d.attribute_node(&node, name).map(|a| a.token());
        term::opt_token_to_term(env, attr)
    })
}

#[rustler::nif]
fn attribute_nodes<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        let tokens: Vec<u64> = d.attribute_nodes(&node).iter().map(|a| a.token()).collect();
        term::tokens_to_term(env, &tokens)
    })
}

// ============================================================================
// Names and Content
// ============================================================================

#[rustler::nif]
fn node_name<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_str_to_term(env, d.name(&node).as_deref())
    })
}

#[rustler::nif]
fn set_node_name<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    name: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        d.set_name(&node, name);
        rustler::types::atom::ok().encode(env)
    })
}

#[rustler::nif]
fn node_content<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::str_to_binary(env, &d.content(&node))
    })
}

#[rustler::nif]
fn set_node_content<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    content: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        d.set_content(&node, content);
        rustler::types::atom::ok().encode(env)
    })
}

// ============================================================================
// Structure
// ============================================================================

/// Append a child; returns {:ok, token} for the effective child (which may
/// differ from the input when text nodes merge) or {:error, reason}
#[rustler::nif]
fn add_child<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    parent_token: u64,
    child_token: u64,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let (parent, child) = match (resolve(env, d, parent_token), resolve(env, d, child_token)) {
            (Ok(p), Ok(c)) => (p, c),
            (Err(e), _) | (_, Err(e)) => return e,
        };
        match d.add_child(&parent, &child) {
            Ok(effective) => term::ok_token(env, effective.token()),
            Err(e) => term::error_term(env, &e.to_string()),
        }
    })
}

#[rustler::nif]
fn add_next_sibling<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    node_token: u64,
    sibling_token: u64,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let (node, sibling) = match (resolve(env, d, node_token), resolve(env, d, sibling_token)) {
            (Ok(n), Ok(s)) => (n, s),
            (Err(e), _) | (_, Err(e)) => return e,
        };
        match d.add_next_sibling(&node, &sibling) {
            Ok(effective) => term::ok_token(env, effective.token()),
            Err(e) => term::error_term(env, &e.to_string()),
        }
    })
}

#[rustler::nif]
fn add_previous_sibling<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    node_token: u64,
    sibling_token: u64,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let (node, sibling) = match (resolve(env, d, node_token), resolve(env, d, sibling_token)) {
            (Ok(n), Ok(s)) => (n, s),
            (Err(e), _) | (_, Err(e)) => return e,
        };
        match d.add_previous_sibling(&node, &sibling) {
            Ok(effective) => term::ok_token(env, effective.token()),
            Err(e) => term::error_term(env, &e.to_string()),
        }
    })
}

#[rustler::nif]
fn replace_node<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    node_token: u64,
    replacement_token: u64,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let (node, replacement) =
            match (resolve(env, d, node_token), resolve(env, d, replacement_token)) {
                (Ok(n), Ok(r)) => (n, r),
                (Err(e), _) | (_, Err(e)) => return e,
            };
        match d.replace(&node, &replacement) {
            Ok(original) => term::ok_token(env, original.token()),
            Err(e) => term::error_term(env, &e.to_string()),
        }
    })
}

/// Detach a node from its tree; returns the same token
#[rustler::nif]
fn unlink_node<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        d.unlink(&node).token().encode(env)
    })
}

#[rustler::nif]
fn duplicate_node<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    deep: bool,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_token_to_term(env, d.duplicate(&node, deep).map(|c| c.token()))
    })
}

// ============================================================================
// Traversal
// ============================================================================

#[rustler::nif]
fn parent<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_token_to_term(env, d.parent(&node).map(|p| p.token()))
    })
}

#[rustler::nif]
fn first_child<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_token_to_term(env, d.child(&node).map(|c| c.token()))
    })
}

#[rustler::nif]
fn next_sibling<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_token_to_term(env, d.next_sibling(&node).map(|s| s.token()))
    })
}

#[rustler::nif]
fn previous_sibling<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_token_to_term(env, d.previous_sibling(&node).map(|s| s.token()))
    })
}

// ============================================================================
// Inspection
// ============================================================================

#[rustler::nif]
fn node_type<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::kind_to_atom(d.node_kind(&node)).encode(env)
    })
}

#[rustler::nif]
fn node_path<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::str_to_binary(env, &d.node_path(&node))
    })
}

#[rustler::nif]
fn blank(doc: DocumentRef, token: u64) -> NifResult<bool> {
    with_doc(&doc, |d| match d.resolve_token(token) {
        Some(node) => d.is_blank(&node),
        None => false,
    })
}

#[rustler::nif]
fn internal_subset<'a>(env: Env<'a>, doc: DocumentRef) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        term::opt_token_to_term(env, d.internal_subset().map(|s| s.token()))
    })
}

// ============================================================================
// Namespaces
// ============================================================================

#[rustler::nif]
fn namespaces<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::namespaces_to_term(env, &d.namespaces(&node))
    })
}

#[rustler::nif]
fn namespace_prefix<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::opt_str_to_term(env, d.namespace_prefix(&node).as_deref())
    })
}

#[rustler::nif]
fn set_namespace_prefix<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    prefix: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        d.set_namespace_prefix(&node, prefix);
        rustler::types::atom::ok().encode(env)
    })
}

#[rustler::nif]
fn declare_namespace<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    token: u64,
    prefix: Option<&str>,
    uri: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        d.declare_namespace(&node, prefix, uri);
        rustler::types::atom::ok().encode(env)
    })
}

// ============================================================================
// Serialization
// ============================================================================

#[rustler::nif]
fn encode_special_chars<'a>(
    env: Env<'a>,
    doc: DocumentRef,
    input: &str,
) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| term::str_to_binary(env, &d.encode_special_chars(input)))
}

#[rustler::nif]
fn to_xml<'a>(env: Env<'a>, doc: DocumentRef, token: u64, format: bool) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::str_to_binary(env, &d.to_xml(&node, format))
    })
}

#[rustler::nif]
fn to_html<'a>(env: Env<'a>, doc: DocumentRef, token: u64) -> NifResult<Term<'a>> {
    with_doc(&doc, |d| {
        let node = match resolve(env, d, token) {
            Ok(n) => n,
            Err(e) => return e,
        };
        term::str_to_binary(env, &d.to_html(&node))
    })
}

// ============================================================================
// NIF Initialization
// ============================================================================

// DocumentResource registers itself via its resource_impl attribute
fn load(_env: Env, _info: Term) -> bool {
    true
}

rustler::init!("Elixir.DomCraft.Native", load = load);
