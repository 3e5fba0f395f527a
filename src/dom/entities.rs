//! XML entity encoding and decoding
//!
//! Handles the built-in entities (&lt; &gt; &amp; &quot; &apos;) and numeric
//! character references. Attribute values are stored entity-encoded in the
//! tree and decoded on read, so the round trip is transparent to callers.
//!
//! Uses Cow for zero-copy when nothing needs rewriting.

use memchr::{memchr, memchr2, memchr3};
use std::borrow::Cow;

/// Encode the characters the tree layer must never store raw in content:
/// `&`, `<`, `>` and carriage returns.
///
/// Returns Borrowed if no rewriting was needed (zero-copy).
pub fn encode_entities(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr3(b'&', b'<', b'>', bytes).is_none() && memchr(b'\r', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Encode special characters for contexts where quotes also matter
/// (attribute serialization): everything `encode_entities` covers plus `"`.
pub fn encode_special_chars(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr3(b'&', b'<', b'>', bytes).is_none() && memchr2(b'"', b'\r', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decode entity references in stored content.
///
/// Returns Borrowed if no entities are present (zero-copy). Unknown named
/// entities are kept verbatim for a later DTD layer to deal with.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr(b'&', bytes).is_none() {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while pos < bytes.len() {
        match memchr(b'&', &bytes[pos..]) {
            Some(amp) => {
                out.push_str(&input[pos..pos + amp]);
                pos += amp;
                match memchr(b';', &bytes[pos..]) {
                    Some(semi) => {
                        let entity = &input[pos + 1..pos + semi];
                        match decode_entity(entity) {
                            Some(decoded) => {
                                out.push(decoded);
                                pos += semi + 1;
                            }
                            None => {
                                // Unknown entity, keep as-is
                                out.push('&');
                                pos += 1;
                            }
                        }
                    }
                    None => {
                        // No semicolon found, keep the ampersand
                        out.push('&');
                        pos += 1;
                    }
                }
            }
            None => {
                out.push_str(&input[pos..]);
                break;
            }
        }
    }
    Cow::Owned(out)
}

/// Decode a single entity body (the part between `&` and `;`).
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let rest = entity.strip_prefix('#')?;
            let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => rest.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain_is_borrowed() {
        assert!(matches!(encode_entities("hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_markup_chars() {
        assert_eq!(encode_entities("a < b & c > d"), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn test_encode_leaves_quotes() {
        assert_eq!(encode_entities("say \"hi\""), "say \"hi\"");
    }

    #[test]
    fn test_encode_special_includes_quotes() {
        assert_eq!(encode_special_chars("a \"b\" <c>"), "a &quot;b&quot; &lt;c&gt;");
    }

    #[test]
    fn test_decode_round_trip() {
        let encoded = encode_entities("<x> & <y>");
        assert_eq!(decode_entities(&encoded), "<x> & <y>");
    }

    #[test]
    fn test_decode_numeric_refs() {
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&#13;"), "\r");
    }

    #[test]
    fn test_decode_unknown_entity_kept() {
        assert_eq!(decode_entities("&nbsp;"), "&nbsp;");
    }

    #[test]
    fn test_decode_dangling_ampersand() {
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
    }
}
