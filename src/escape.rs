//! Predefined-entity and character-reference escaping/unescaping.
//!
//! Implements the predefined entity set and decimal/hex character
//! reference handling used by attribute and text normalization.

use std::borrow::Cow;

use crate::charstream::{is_valid_code_point, XmlVersion};
use crate::errors::{Error, Result};

/// Escapes `&`, `<`, `>`, `'` and `"` the way attribute and text content
/// must be escaped to round-trip through a conforming XML serializer.
pub fn escape(raw: &[u8]) -> Cow<[u8]> {
    fn needs_escape(b: u8) -> bool {
        matches!(b, b'&' | b'<' | b'>' | b'\'' | b'"')
    }

    match raw.iter().position(|&b| needs_escape(b)) {
        None => Cow::Borrowed(raw),
        Some(first) => {
            let mut out = Vec::with_capacity(raw.len());
            out.extend_from_slice(&raw[..first]);
            for &b in &raw[first..] {
                match b {
                    b'&' => out.extend_from_slice(b"&amp;"),
                    b'<' => out.extend_from_slice(b"&lt;"),
                    b'>' => out.extend_from_slice(b"&gt;"),
                    b'\'' => out.extend_from_slice(b"&apos;"),
                    b'"' => out.extend_from_slice(b"&quot;"),
                    _ => out.push(b),
                }
            }
            Cow::Owned(out)
        }
    }
}

/// Replacement text for the five predefined entities.
pub fn predefined_entity(name: &[u8]) -> Option<&'static str> {
    match name {
        b"lt" => Some("<"),
        b"gt" => Some(">"),
        b"amp" => Some("&"),
        b"apos" => Some("'"),
        b"quot" => Some("\""),
        _ => None,
    }
}

/// Unescapes the predefined entities and numeric character references in
/// `raw`, re-validating every numeric reference's code point against
/// `version`. Does not look up named (non-predefined) entities — that
/// requires a grammar and is done one level up, in the event parser's
/// entity-expansion routine.
pub fn unescape_with_predefined(raw: &[u8], version: XmlVersion) -> Result<Cow<[u8]>> {
    if memchr::memchr(b'&', raw).is_none() {
        return Ok(Cow::Borrowed(raw));
    }

    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = memchr::memchr(b'&', rest) {
        out.extend_from_slice(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = memchr::memchr(b';', after)
            .ok_or_else(|| Error::UnexpectedEof("entity reference".to_string()))?;
        let name = &after[..semi];
        if let Some(text) = predefined_entity(name) {
            out.extend_from_slice(text.as_bytes());
        } else if let Some(digits) = name.strip_prefix(b"#x").or_else(|| name.strip_prefix(b"#X")) {
            out.extend_from_slice(decode_char_ref(digits, 16, version)?.encode_utf8(&mut [0; 4]).as_bytes());
        } else if let Some(digits) = name.strip_prefix(b"#") {
            out.extend_from_slice(decode_char_ref(digits, 10, version)?.encode_utf8(&mut [0; 4]).as_bytes());
        } else {
            // Not a predefined or numeric reference: caller must consult a
            // grammar. Preserve the raw reference so a higher layer can
            // retry with entity-table knowledge.
            out.push(b'&');
            out.extend_from_slice(&after[..=semi]);
            rest = &after[semi + 1..];
            continue;
        }
        rest = &after[semi + 1..];
    }
    out.extend_from_slice(rest);
    Ok(Cow::Owned(out))
}

fn decode_char_ref(digits: &[u8], radix: u32, version: XmlVersion) -> Result<char> {
    let s = std::str::from_utf8(digits)
        .map_err(|_| Error::InvalidCharacterReference(String::from_utf8_lossy(digits).into_owned()))?;
    let value = u32::from_str_radix(s, radix)
        .map_err(|_| Error::InvalidCharacterReference(s.to_string()))?;
    if !is_valid_code_point(value, version) {
        return Err(Error::InvalidCodePoint { code_point: value, version: version.label() });
    }
    char::from_u32(value)
        .ok_or_else(|| Error::InvalidCharacterReference(format!("U+{:04X}", value)))
}

/// Returns true if `raw` contains a reference that is neither predefined
/// nor numeric (i.e. a named general-entity reference that needs a
/// grammar to resolve).
pub fn has_named_entity_reference(raw: &[u8]) -> bool {
    let mut rest = raw;
    while let Some(amp) = memchr::memchr(b'&', rest) {
        let after = &rest[amp + 1..];
        if let Some(semi) = memchr::memchr(b';', after) {
            let name = &after[..semi];
            if predefined_entity(name).is_none() && !name.starts_with(b"#") {
                return true;
            }
            rest = &after[semi + 1..];
        } else {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(&*escape(b"a<b>c&d'e\"f"), b"a&lt;b&gt;c&amp;d&apos;e&quot;f".as_ref());
    }

    #[test]
    fn escape_is_a_no_op_without_reserved_bytes() {
        assert_eq!(escape(b"plain"), Cow::Borrowed(b"plain".as_ref()));
    }

    #[test]
    fn unescapes_predefined_entities() {
        let out = unescape_with_predefined(b"&lt;tag&gt;", XmlVersion::V10).unwrap();
        assert_eq!(&*out, b"<tag>".as_ref());
    }

    #[test]
    fn unescapes_hex_and_decimal_char_refs() {
        let out = unescape_with_predefined(b"&#65;&#x42;", XmlVersion::V10).unwrap();
        assert_eq!(&*out, b"AB".as_ref());
    }

    #[test]
    fn rejects_char_ref_outside_xml10_range() {
        let err = unescape_with_predefined(b"&#x1;", XmlVersion::V10).unwrap_err();
        assert!(matches!(err, Error::InvalidCodePoint { .. }));
    }

    #[test]
    fn detects_named_entity_references() {
        assert!(has_named_entity_reference(b"&custom;"));
        assert!(!has_named_entity_reference(b"&lt;&#65;"));
    }
}
