//! Elixir Term Conversion Utilities
//!
//! Converts binding-layer values to Elixir terms.

use crate::dom::NodeKind;
use rustler::types::atom::Atom;
use rustler::{Encoder, Env, NewBinary, Term};
use std::collections::HashMap;

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    document,
    element,
    text,
    cdata,
    comment,
    attribute,
    processing_instruction,
    entity_reference,
    document_fragment,
    dtd,
    entity_declaration,
}

/// Node kind tag as an atom
pub fn kind_to_atom(kind: NodeKind) -> Atom {
    match kind {
        NodeKind::Document => document(),
        NodeKind::Element => element(),
        NodeKind::Text => text(),
        NodeKind::CData => cdata(),
        NodeKind::Comment => comment(),
        NodeKind::Attribute => attribute(),
        NodeKind::ProcessingInstruction => processing_instruction(),
        NodeKind::EntityReference => entity_reference(),
        NodeKind::DocumentFragment => document_fragment(),
        NodeKind::Dtd => dtd(),
        NodeKind::EntityDeclaration => entity_declaration(),
    }
}

/// Convert a string to a binary term (more efficient than .encode())
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// `nil` for `None`, a binary otherwise
pub fn opt_str_to_term<'a>(env: Env<'a>, value: Option<&str>) -> Term<'a> {
    match value {
        Some(s) => str_to_binary(env, s),
        None => rustler::types::atom::nil().encode(env),
    }
}

/// `nil` for `None`, an integer token otherwise
pub fn opt_token_to_term<'a>(env: Env<'a>, token: Option<u64>) -> Term<'a> {
    match token {
        Some(t) => t.encode(env),
        None => rustler::types::atom::nil().encode(env),
    }
}

/// List of integer tokens, in order
pub fn tokens_to_term<'a>(env: Env<'a>, tokens: &[u64]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for &t in tokens.iter().rev() {
        list = list.list_prepend(t.encode(env));
    }
    list
}

/// Namespace declarations as a `%{"xmlns[:prefix]" => uri}` map
pub fn namespaces_to_term<'a>(env: Env<'a>, decls: &HashMap<String, String>) -> Term<'a> {
    let pairs: Vec<(Term<'a>, Term<'a>)> = decls
        .iter()
        .map(|(key, uri)| (str_to_binary(env, key), str_to_binary(env, uri)))
        .collect();
    match Term::map_from_pairs(env, &pairs) {
        Ok(map) => map,
        Err(_) => Term::map_new(env),
    }
}

/// `{:ok, token}`
pub fn ok_token<'a>(env: Env<'a>, token: u64) -> Term<'a> {
    let ok_atom = rustler::types::atom::ok();
    (ok_atom, token).encode(env)
}

/// `{:error, message}`
pub fn error_term<'a>(env: Env<'a>, message: &str) -> Term<'a> {
    let error_atom = rustler::types::atom::error();
    (error_atom, str_to_binary(env, message)).encode(env)
}
