//! Node serialization
//!
//! Renders a node and its descendants as an XML fragment (optionally
//! indented) or as HTML. HTML output differs where the two languages
//! disagree: void elements stay unclosed, empty elements are never
//! self-closed, and script/style content is emitted raw.

use super::document::Document;
use super::entities;
use super::node::{NodeId, NodeKind};

const INDENT: &str = "  ";

/// Elements that take no closing tag in HTML
const HTML_VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is not entity-escaped in HTML
const HTML_RAW_TEXT: &[&str] = &["script", "style"];

/// Render a node (and descendants) as an XML fragment string.
/// With `format` on, element-only content is indented two spaces per level;
/// mixed content is left inline so no text is invented or lost.
pub fn dump_xml(doc: &Document, id: NodeId, format: bool) -> String {
    let mut buf = String::with_capacity(256);
    match doc.node(id).kind {
        NodeKind::Document => {
            let mut first = true;
            for child in doc.children(id) {
                if format && !first {
                    buf.push('\n');
                }
                write_xml(doc, child, format, 0, &mut buf);
                first = false;
            }
        }
        _ => write_xml(doc, id, format, 0, &mut buf),
    }
    buf
}

fn write_xml(doc: &Document, id: NodeId, format: bool, depth: usize, buf: &mut String) {
    let node = doc.node(id);
    match node.kind {
        NodeKind::Element => {
            buf.push('<');
            push_qualified_name(doc, id, buf);
            write_ns_decls(doc, id, buf);
            write_attributes(doc, id, buf);

            if !node.has_children() {
                buf.push_str("/>");
                return;
            }
            buf.push('>');

            // Indentation only applies when nothing text-like would move
            let indent_children = format && doc.children(id).all(|c| {
                !matches!(
                    doc.node(c).kind,
                    NodeKind::Text | NodeKind::CData | NodeKind::EntityReference
                )
            });

            for child in doc.children(id) {
                if indent_children {
                    buf.push('\n');
                    push_indent(depth + 1, buf);
                }
                write_xml(doc, child, format, depth + 1, buf);
            }
            if indent_children {
                buf.push('\n');
                push_indent(depth, buf);
            }
            buf.push_str("</");
            push_qualified_name(doc, id, buf);
            buf.push('>');
        }
        NodeKind::Text => {
            buf.push_str(&entities::encode_entities(node.content.as_deref().unwrap_or("")));
        }
        NodeKind::CData => {
            buf.push_str("<![CDATA[");
            buf.push_str(node.content.as_deref().unwrap_or(""));
            buf.push_str("]]>");
        }
        NodeKind::Comment => {
            buf.push_str("<!--");
            buf.push_str(node.content.as_deref().unwrap_or(""));
            buf.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            buf.push_str("<?");
            buf.push_str(node.name.as_deref().unwrap_or(""));
            if let Some(data) = node.content.as_deref() {
                buf.push(' ');
                buf.push_str(data);
            }
            buf.push_str("?>");
        }
        NodeKind::EntityReference => {
            buf.push('&');
            buf.push_str(node.name.as_deref().unwrap_or(""));
            buf.push(';');
        }
        NodeKind::Attribute => {
            buf.push_str(node.name.as_deref().unwrap_or(""));
            buf.push_str("=\"");
            let decoded = entities::decode_entities(node.content.as_deref().unwrap_or(""));
            buf.push_str(&entities::encode_special_chars(&decoded));
            buf.push('"');
        }
        NodeKind::Dtd => {
            buf.push_str("<!DOCTYPE ");
            buf.push_str(node.name.as_deref().unwrap_or(""));
            buf.push('>');
        }
        NodeKind::EntityDeclaration => {
            buf.push_str("<!ENTITY ");
            buf.push_str(node.name.as_deref().unwrap_or(""));
            if let Some(value) = node.content.as_deref() {
                buf.push_str(" \"");
                buf.push_str(value);
                buf.push('"');
            }
            buf.push('>');
        }
        NodeKind::DocumentFragment | NodeKind::Document => {
            for child in doc.children(id) {
                write_xml(doc, child, format, depth, buf);
            }
        }
    }
}

/// Render a node (and descendants) as an HTML fragment string.
/// Document nodes are the caller's concern (the façade routes those to
/// [`dump_xml`]); handed one anyway, the children are rendered in order.
pub fn dump_html(doc: &Document, id: NodeId) -> String {
    let mut buf = String::with_capacity(256);
    write_html(doc, id, false, &mut buf);
    buf
}

fn write_html(doc: &Document, id: NodeId, raw_text: bool, buf: &mut String) {
    let node = doc.node(id);
    match node.kind {
        NodeKind::Element => {
            let name = node.name.as_deref().unwrap_or("");
            let lowered = name.to_ascii_lowercase();
            buf.push('<');
            push_qualified_name(doc, id, buf);
            write_ns_decls(doc, id, buf);
            write_attributes(doc, id, buf);
            buf.push('>');

            if HTML_VOID.contains(&lowered.as_str()) {
                // malformed trees can still park children under a void
                // element; render them after the tag rather than lose them
                for child in doc.children(id) {
                    write_html(doc, child, false, buf);
                }
                return;
            }

            let raw = HTML_RAW_TEXT.contains(&lowered.as_str());
            for child in doc.children(id) {
                write_html(doc, child, raw, buf);
            }

            buf.push_str("</");
            push_qualified_name(doc, id, buf);
            buf.push('>');
        }
        NodeKind::Text => {
            let content = node.content.as_deref().unwrap_or("");
            if raw_text {
                buf.push_str(content);
            } else {
                buf.push_str(&entities::encode_entities(content));
            }
        }
        NodeKind::Document | NodeKind::DocumentFragment => {
            for child in doc.children(id) {
                write_html(doc, child, false, buf);
            }
        }
        // Everything else renders the same in both serializations
        _ => write_xml(doc, id, false, 0, buf),
    }
}

fn push_qualified_name(doc: &Document, id: NodeId, buf: &mut String) {
    let node = doc.node(id);
    if let Some(prefix) = node.ns_prefix.as_deref() {
        buf.push_str(prefix);
        buf.push(':');
    }
    buf.push_str(node.name.as_deref().unwrap_or(""));
}

fn write_ns_decls(doc: &Document, id: NodeId, buf: &mut String) {
    for decl in doc.namespace_declarations(id) {
        buf.push(' ');
        buf.push_str(&decl.key());
        buf.push_str("=\"");
        buf.push_str(&entities::encode_special_chars(&decl.uri));
        buf.push('"');
    }
}

fn write_attributes(doc: &Document, id: NodeId, buf: &mut String) {
    for attr in doc.attribute_nodes(id) {
        buf.push(' ');
        write_xml(doc, attr, false, 0, buf);
    }
}

fn push_indent(depth: usize, buf: &mut String) {
    for _ in 0..depth {
        buf.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.new_element("root");
        doc.append_child(0, root).unwrap();
        (doc, root)
    }

    #[test]
    fn test_element_with_text() {
        let (mut doc, root) = build();
        let text = doc.new_text("hello");
        doc.append_child(root, text).unwrap();
        assert_eq!(dump_xml(&doc, root, true), "<root>hello</root>");
    }

    #[test]
    fn test_text_is_escaped() {
        let (mut doc, root) = build();
        let text = doc.new_text("a < b & c");
        doc.append_child(root, text).unwrap();
        assert_eq!(dump_xml(&doc, root, false), "<root>a &lt; b &amp; c</root>");
    }

    #[test]
    fn test_empty_element_self_closes() {
        let (doc, root) = build();
        assert_eq!(dump_xml(&doc, root, true), "<root/>");
    }

    #[test]
    fn test_attributes_and_namespaces() {
        let (mut doc, root) = build();
        doc.set_attribute(root, "id", "a\"b");
        doc.declare_namespace(root, Some("x"), "urn:x");
        assert_eq!(
            dump_xml(&doc, root, false),
            "<root xmlns:x=\"urn:x\" id=\"a&quot;b\"/>"
        );
    }

    #[test]
    fn test_format_indents_element_children() {
        let (mut doc, root) = build();
        let a = doc.new_element("a");
        let b = doc.new_element("b");
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        assert_eq!(dump_xml(&doc, root, true), "<root>\n  <a/>\n  <b/>\n</root>");
        assert_eq!(dump_xml(&doc, root, false), "<root><a/><b/></root>");
    }

    #[test]
    fn test_mixed_content_stays_inline() {
        let (mut doc, root) = build();
        let text = doc.new_text("t");
        let a = doc.new_element("a");
        doc.append_child(root, text).unwrap();
        doc.append_child(root, a).unwrap();
        assert_eq!(dump_xml(&doc, root, true), "<root>t<a/></root>");
    }

    #[test]
    fn test_cdata_comment_pi() {
        let (mut doc, root) = build();
        let cdata = doc.new_cdata("x < y");
        let comment = doc.new_comment(" note ");
        let pi = doc.new_processing_instruction("xml-stylesheet", Some("href=\"a.css\""));
        doc.append_child(root, cdata).unwrap();
        doc.append_child(root, comment).unwrap();
        doc.append_child(root, pi).unwrap();
        assert_eq!(
            dump_xml(&doc, root, false),
            "<root><![CDATA[x < y]]><!-- note --><?xml-stylesheet href=\"a.css\"?></root>"
        );
    }

    #[test]
    fn test_prefixed_element() {
        let (mut doc, root) = build();
        let svg = doc.new_element("rect");
        doc.set_namespace_prefix(svg, "svg");
        doc.append_child(root, svg).unwrap();
        assert_eq!(dump_xml(&doc, svg, false), "<svg:rect/>");
    }

    #[test]
    fn test_html_void_and_empty() {
        let (mut doc, root) = build();
        let br = doc.new_element("br");
        let div = doc.new_element("div");
        doc.append_child(root, br).unwrap();
        doc.append_child(root, div).unwrap();
        assert_eq!(dump_html(&doc, root), "<root><br><div></div></root>");
    }

    #[test]
    fn test_html_script_is_raw() {
        let (mut doc, root) = build();
        let script = doc.new_element("script");
        let code = doc.new_text("if (a < b) { go(); }");
        doc.append_child(script, code).unwrap();
        doc.append_child(root, script).unwrap();
        assert_eq!(
            dump_html(&doc, script),
            "<script>if (a < b) { go(); }</script>"
        );
    }

    #[test]
    fn test_html_void_with_children_keeps_content() {
        let (mut doc, _root) = build();
        let br = doc.new_element("br");
        let stray = doc.new_text("oops");
        doc.append_child(br, stray).unwrap();
        assert_eq!(dump_html(&doc, br), "<br>oops");
    }

    #[test]
    fn test_single_doctype_after_subset_replacement() {
        let mut doc = Document::new();
        doc.create_internal_subset("old");
        doc.create_internal_subset("new");
        assert_eq!(dump_xml(&doc, 0, false), "<!DOCTYPE new>");
    }

    #[test]
    fn test_document_dump_serializes_children() {
        let (mut doc, root) = build();
        let text = doc.new_text("x");
        doc.append_child(root, text).unwrap();
        assert_eq!(dump_xml(&doc, 0, false), "<root>x</root>");
    }
}
