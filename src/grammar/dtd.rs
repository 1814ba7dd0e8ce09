//! DTD back-end: parses the concatenation of the internal and external
//! subsets into element/attribute declarations, a general
//! entity table and NOTATION declarations, and compiles content models to
//! [`crate::particle::Particle`] trees.
//!
//! DTD markup declaration syntax is not XML (no matching start/end tags),
//! so this module hand-rolls its own declaration tokenizer rather than
//! reusing [`crate::reader::Reader`], the way the XSD/RNG back-ends do.

use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::grammar::{AttributeDeclaration, AttributeType, AttributeUse};
use crate::particle::{Occurs, Particle};
use crate::path::resolve_reference;

#[derive(Clone, Debug, Default)]
pub struct DtdGrammar {
    elements: HashMap<String, Particle>,
    attlists: HashMap<String, HashMap<String, AttributeDeclaration>>,
    general_entities: HashMap<String, String>,
    notations: HashMap<String, (Option<String>, Option<String>)>,
}

impl DtdGrammar {
    pub fn resolve_entity(&self, name: &str) -> Option<String> {
        self.general_entities.get(name).cloned()
    }

    pub fn element_attributes(&self, element: &str) -> Option<&HashMap<String, AttributeDeclaration>> {
        self.attlists.get(element)
    }

    pub fn default_attributes(&self, element: &str) -> Vec<(String, String)> {
        match self.attlists.get(element) {
            Some(decls) => decls
                .values()
                .filter_map(|d| {
                    d.fixed_value
                        .clone()
                        .or_else(|| d.default_value.clone())
                        .map(|v| (d.name.clone(), v))
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn validate_attributes(&self, element: &str, present: &[(String, String)]) -> Result<()> {
        match self.attlists.get(element) {
            Some(decls) => crate::grammar::check_attribute_uses(element, decls, present),
            None => Ok(()),
        }
    }

    pub fn validate_element(&self, element: &str, children: &[Vec<u8>]) -> Result<()> {
        match self.elements.get(element) {
            Some(particle) => particle.validate(children),
            None => Ok(()),
        }
    }

    /// Parses a DTD internal subset (the text between `[` and `]` in a
    /// `<!DOCTYPE ... [ ... ]>`), with no parameter entities beyond what
    /// is declared inline.
    pub fn parse_str(subset: &str) -> Result<Self> {
        let mut grammar = DtdGrammar::default();
        let mut param_entities = HashMap::new();
        grammar.ingest(subset, &mut param_entities, 0)?;
        Ok(grammar)
    }

    /// Parses an external subset loaded from `path` (resolved via
    /// `base`/catalog by the caller before this is reached).
    pub fn parse_file(path: &std::path::Path) -> Result<Self> {
        let bytes = crate::path::read_to_vec(path)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::MalformedGrammar(format!("DTD is not valid UTF-8: {}", e)))?;
        Self::parse_str(text)
    }

    /// Parses and merges an internal subset followed by an external
    /// subset resolved from `system_id`/`public_id` via `catalog`. The
    /// internal subset's entity/element declarations win over the
    /// external subset's (first declaration wins, per the XML
    /// specification's normative behavior, and adopted here without
    /// deviation).
    pub fn parse_combined(
        internal_subset: Option<&str>,
        system_id: Option<&str>,
        public_id: Option<&str>,
        base: Option<&std::path::Path>,
        catalog: Option<&crate::catalog::Catalog>,
    ) -> Result<Self> {
        let mut grammar = DtdGrammar::default();
        let mut param_entities = HashMap::new();

        if let Some(internal) = internal_subset {
            grammar.ingest(internal, &mut param_entities, 0)?;
        }

        if let Some(system_id) = system_id {
            let resolved = public_id
                .and_then(|p| catalog.and_then(|c| c.resolve_public(p)))
                .or_else(|| catalog.and_then(|c| c.resolve_system(system_id)))
                .map(Ok)
                .unwrap_or_else(|| resolve_reference(system_id, base));
            if let Ok(path) = resolved {
                if let Ok(bytes) = crate::path::read_to_vec(&path) {
                    if let Ok(text) = std::str::from_utf8(&bytes) {
                        let mut external = DtdGrammar::default();
                        external.ingest(text, &mut param_entities, 0)?;
                        grammar.merge_losing_to(external);
                    }
                }
            }
        }

        Ok(grammar)
    }

    /// Merges `other`'s declarations in, but never overwrites an entry
    /// this grammar already has (internal subset wins over external).
    fn merge_losing_to(&mut self, other: DtdGrammar) {
        for (name, particle) in other.elements {
            self.elements.entry(name).or_insert(particle);
        }
        for (name, attrs) in other.attlists {
            self.attlists.entry(name).or_insert(attrs);
        }
        for (name, text) in other.general_entities {
            self.general_entities.entry(name).or_insert(text);
        }
        for (name, ids) in other.notations {
            self.notations.entry(name).or_insert(ids);
        }
    }

    fn ingest(
        &mut self,
        text: &str,
        param_entities: &mut HashMap<String, String>,
        depth: usize,
    ) -> Result<()> {
        if depth > 32 {
            return Err(Error::MalformedGrammar(
                "parameter entity nesting too deep".to_string(),
            ));
        }
        for decl in split_declarations(text) {
            let expanded = expand_parameter_entities(decl, param_entities);
            self.ingest_declaration(&expanded, param_entities, depth)?;
        }
        Ok(())
    }

    fn ingest_declaration(
        &mut self,
        decl: &str,
        param_entities: &mut HashMap<String, String>,
        depth: usize,
    ) -> Result<()> {
        let decl = decl.trim();
        if let Some(rest) = decl.strip_prefix("ELEMENT") {
            self.ingest_element(rest.trim())?;
        } else if let Some(rest) = decl.strip_prefix("ATTLIST") {
            self.ingest_attlist(rest.trim())?;
        } else if let Some(rest) = decl.strip_prefix("ENTITY") {
            self.ingest_entity(rest.trim(), param_entities, depth)?;
        } else if let Some(rest) = decl.strip_prefix("NOTATION") {
            self.ingest_notation(rest.trim())?;
        }
        // Comments and unrecognized declarations (e.g. conditional
        // sections) are silently skipped: they carry no grammar-relevant
        // information this back-end needs.
        Ok(())
    }

    fn ingest_element(&mut self, rest: &str) -> Result<()> {
        let (name, content_spec) = split_name(rest)
            .ok_or_else(|| Error::MalformedGrammar(format!("malformed <!ELEMENT {}>", rest)))?;
        let particle = parse_content_spec(content_spec.trim())?;
        self.elements.insert(name.to_string(), particle);
        Ok(())
    }

    fn ingest_attlist(&mut self, rest: &str) -> Result<()> {
        let (element, defs) = split_name(rest)
            .ok_or_else(|| Error::MalformedGrammar(format!("malformed <!ATTLIST {}>", rest)))?;
        let decls = self.attlists.entry(element.to_string()).or_default();
        for decl in parse_attdefs(defs.trim())? {
            decls.insert(decl.name.clone(), decl);
        }
        Ok(())
    }

    fn ingest_entity(
        &mut self,
        rest: &str,
        param_entities: &mut HashMap<String, String>,
        depth: usize,
    ) -> Result<()> {
        let (is_param, rest) = match rest.strip_prefix('%') {
            Some(r) => (true, r.trim_start()),
            None => (false, rest),
        };
        let (name, value_part) = split_name(rest)
            .ok_or_else(|| Error::MalformedGrammar(format!("malformed <!ENTITY {}>", rest)))?;
        let value_part = value_part.trim();

        let replacement = if let Some(literal) = unquote(value_part) {
            literal.to_string()
        } else if let Some(system_id) = value_part
            .strip_prefix("SYSTEM")
            .map(str::trim_start)
            .and_then(unquote)
        {
            system_id.to_string()
        } else if let Some(rest) = value_part.strip_prefix("PUBLIC").map(str::trim_start) {
            // PUBLIC "pubid" "system-literal": keep only the system literal,
            // matching how external entities resolve to a location.
            let (_, after_pub) = take_quoted(rest)
                .ok_or_else(|| Error::MalformedGrammar("malformed PUBLIC entity".to_string()))?;
            take_quoted(after_pub.trim_start())
                .map(|(lit, _)| lit.to_string())
                .unwrap_or_default()
        } else {
            return Err(Error::MalformedGrammar(format!(
                "malformed <!ENTITY> value: {}",
                value_part
            )));
        };

        if is_param {
            let expanded = expand_parameter_entities(&replacement, param_entities);
            param_entities.entry(name.to_string()).or_insert(expanded);
        } else {
            self.general_entities.entry(name.to_string()).or_insert(replacement);
        }
        let _ = depth;
        Ok(())
    }

    fn ingest_notation(&mut self, rest: &str) -> Result<()> {
        let (name, rest) = split_name(rest)
            .ok_or_else(|| Error::MalformedGrammar(format!("malformed <!NOTATION {}>", rest)))?;
        let rest = rest.trim();
        let (public_id, system_id) = if let Some(r) = rest.strip_prefix("PUBLIC").map(str::trim_start) {
            let (pubid, remainder) = take_quoted(r)
                .ok_or_else(|| Error::MalformedGrammar("malformed NOTATION PUBLIC id".to_string()))?;
            let sysid = take_quoted(remainder.trim_start()).map(|(s, _)| s.to_string());
            (Some(pubid.to_string()), sysid)
        } else if let Some(r) = rest.strip_prefix("SYSTEM").map(str::trim_start) {
            let (sysid, _) = take_quoted(r)
                .ok_or_else(|| Error::MalformedGrammar("malformed NOTATION SYSTEM id".to_string()))?;
            (None, Some(sysid.to_string()))
        } else {
            (None, None)
        };
        self.notations.insert(name.to_string(), (public_id, system_id));
        Ok(())
    }
}

/// Splits `<!ELEMENT name rest>`-shaped text into `(name, rest)` on the
/// first run of whitespace.
fn split_name(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let end = text.find(|c: char| c.is_whitespace())?;
    Some((&text[..end], &text[end..]))
}

fn unquote(text: &str) -> Option<&str> {
    take_quoted(text).map(|(lit, _)| lit)
}

/// Reads a single `"..."` or `'...'` literal from the start of `text`
/// (after skipping leading whitespace), returning the literal's content
/// and the remainder of `text` after the closing quote.
fn take_quoted(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let quote = text.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &text[quote.len_utf8()..];
    let end = rest.find(quote)?;
    Some((&rest[..end], &rest[end + quote.len_utf8()..]))
}

/// Splits DTD subset text into individual markup declarations, tracking
/// quote state and bracket nesting so a `>` inside a content-spec
/// parenthesis group or a quoted literal does not end the declaration
/// early. Comments (`<!--...-->`) and processing instructions are
/// dropped; conditional sections (`<![INCLUDE[...]]>`) are passed through
/// as opaque text and silently ignored by `ingest_declaration`.
fn split_declarations(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut decls = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if text[i..].starts_with("<!--") {
            if let Some(end) = text[i + 4..].find("-->") {
                i += 4 + end + 3;
            } else {
                break;
            }
            continue;
        }
        if text[i..].starts_with("<!") {
            let start = i;
            let mut depth = 0i32;
            let mut quote: Option<char> = None;
            let mut j = i;
            while j < bytes.len() {
                let c = bytes[j] as char;
                match quote {
                    Some(q) if c == q => quote = None,
                    Some(_) => {}
                    None => match c {
                        '"' | '\'' => quote = Some(c),
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        '>' if depth <= 0 => {
                            decls.push(&text[start + 2..j]);
                            j += 1;
                            break;
                        }
                        _ => {}
                    },
                }
                j += 1;
            }
            i = j;
            continue;
        }
        i += 1;
    }
    decls
}

/// Substitutes every `%name;` parameter-entity reference in `text` with
/// its registered replacement, outside quoted literals. Unknown
/// references are left untouched (the DTD parse that follows will simply
/// fail to recognize the resulting declaration, which is an acceptable
/// outcome for a reference to an entity this parser never saw declared).
fn expand_parameter_entities(text: &str, param_entities: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                out.push(c);
            }
            Some(_) => out.push(c),
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    out.push(c);
                } else if c == '%' {
                    if let Some(end) = text[i + 1..].find(';') {
                        let name = &text[i + 1..i + 1 + end];
                        if let Some(replacement) = param_entities.get(name) {
                            out.push_str(replacement);
                            for _ in 0..end + 1 {
                                chars.next();
                            }
                            continue;
                        }
                    }
                    out.push(c);
                } else {
                    out.push(c);
                }
            }
        }
    }
    out
}

/// Parses an `<!ELEMENT>` content spec: `EMPTY`, `ANY`, `(#PCDATA)`,
/// `(#PCDATA|a|b)*`, or a nested sequence/choice group with occurrence
/// suffixes `?`, `*`, `+`.
fn parse_content_spec(spec: &str) -> Result<Particle> {
    match spec {
        "EMPTY" => return Ok(Particle::Empty),
        "ANY" => return Ok(Particle::Any { min: 0, max: Occurs::Unbounded }),
        _ => {}
    }
    let mut parser = ContentSpecParser { bytes: spec.as_bytes(), pos: 0 };
    parser.parse_top()
}

struct ContentSpecParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ContentSpecParser<'a> {
    fn parse_top(&mut self) -> Result<Particle> {
        self.skip_ws();
        self.expect(b'(')?;
        self.skip_ws();
        if self.peek() == Some(b'#') {
            return self.parse_mixed();
        }
        self.parse_group(b'(')
    }

    fn parse_mixed(&mut self) -> Result<Particle> {
        self.expect_str("#PCDATA")?;
        let mut names = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'|') => {
                    self.pos += 1;
                    self.skip_ws();
                    let name = self.read_name();
                    names.push(name.as_bytes().to_vec());
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(Error::MalformedGrammar(
                        "malformed mixed-content declaration".to_string(),
                    ))
                }
            }
        }
        // trailing '*' is conventional for non-empty mixed content; '#PCDATA'
        // alone (no names) must not carry one.
        if self.peek() == Some(b'*') {
            self.pos += 1;
        }
        Ok(Particle::Mixed { allowed: names })
    }

    /// Parses the body of a `(...)` group already past the opening paren,
    /// returning a `Sequence` or `Choice` particle with its own occurrence
    /// suffix applied.
    fn parse_group(&mut self, _opener: u8) -> Result<Particle> {
        let mut members = vec![self.parse_cp()?];
        let mut separator: Option<u8> = None;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(sep @ b',') | Some(sep @ b'|') => {
                    if let Some(prev) = separator {
                        if prev != sep {
                            return Err(Error::MalformedGrammar(
                                "content model mixes ',' and '|' in one group".to_string(),
                            ));
                        }
                    }
                    separator = Some(sep);
                    self.pos += 1;
                    self.skip_ws();
                    members.push(self.parse_cp()?);
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    return Err(Error::MalformedGrammar(
                        "unterminated content-model group".to_string(),
                    ))
                }
            }
        }
        let (min, max) = self.parse_occurrence();
        Ok(match separator {
            Some(b'|') => Particle::Choice { alternatives: members, min, max },
            _ => Particle::Sequence { children: members, min, max },
        })
    }

    /// Parses a single content-particle: a name, or a parenthesized group,
    /// each with an optional occurrence suffix.
    fn parse_cp(&mut self) -> Result<Particle> {
        self.skip_ws();
        if self.peek() == Some(b'(') {
            self.pos += 1;
            return self.parse_group(b'(');
        }
        let name = self.read_name();
        if name.is_empty() {
            return Err(Error::MalformedGrammar("expected a name in content model".to_string()));
        }
        let (min, max) = self.parse_occurrence();
        Ok(Particle::ElementRef { name: name.into_bytes(), min, max })
    }

    fn parse_occurrence(&mut self) -> (u32, Occurs) {
        match self.peek() {
            Some(b'?') => {
                self.pos += 1;
                (0, Occurs::Bounded(1))
            }
            Some(b'*') => {
                self.pos += 1;
                (0, Occurs::Unbounded)
            }
            Some(b'+') => {
                self.pos += 1;
                (1, Occurs::Unbounded)
            }
            _ => (1, Occurs::Bounded(1)),
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b',' | b'|' | b')' | b'(' | b'?' | b'*' | b'+') {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::MalformedGrammar(format!("expected {:?} in content model", b as char)))
        }
    }

    fn expect_str(&mut self, s: &str) -> Result<()> {
        if self.bytes[self.pos..].starts_with(s.as_bytes()) {
            self.pos += s.len();
            Ok(())
        } else {
            Err(Error::MalformedGrammar(format!("expected {:?} in content model", s)))
        }
    }
}

/// Parses a sequence of `<!ATTLIST>` attribute definitions: repeating
/// groups of `name type default`.
fn parse_attdefs(text: &str) -> Result<Vec<AttributeDeclaration>> {
    let mut decls = Vec::new();
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let (name, after_name) = split_name(rest)
            .ok_or_else(|| Error::MalformedGrammar("malformed attribute definition".to_string()))?;
        let after_name = after_name.trim_start();
        let (datatype, after_type) = parse_attribute_type(after_name)?;
        let after_type = after_type.trim_start();
        let (use_, default_value, fixed_value, remainder) = parse_default_decl(after_type)?;
        decls.push(AttributeDeclaration {
            name: name.to_string(),
            datatype,
            use_,
            default_value,
            fixed_value,
        });
        rest = remainder;
    }
    Ok(decls)
}

fn parse_attribute_type(text: &str) -> Result<(AttributeType, &str)> {
    if let Some(r) = text.strip_prefix("CDATA") {
        return Ok((AttributeType::CData, r));
    }
    if let Some(r) = text.strip_prefix("IDREFS") {
        return Ok((AttributeType::IdRefs, r));
    }
    if let Some(r) = text.strip_prefix("IDREF") {
        return Ok((AttributeType::IdRef, r));
    }
    if let Some(r) = text.strip_prefix("ID") {
        return Ok((AttributeType::Id, r));
    }
    if let Some(r) = text.strip_prefix("ENTITIES") {
        return Ok((AttributeType::Entities, r));
    }
    if let Some(r) = text.strip_prefix("ENTITY") {
        return Ok((AttributeType::Entity, r));
    }
    if let Some(r) = text.strip_prefix("NMTOKENS") {
        return Ok((AttributeType::NmTokens, r));
    }
    if let Some(r) = text.strip_prefix("NMTOKEN") {
        return Ok((AttributeType::NmToken, r));
    }
    if let Some(r) = text.strip_prefix("NOTATION") {
        let r = r.trim_start();
        let (names, rest) = parse_name_group(r)?;
        return Ok((AttributeType::Notation(names), rest));
    }
    if text.starts_with('(') {
        let (names, rest) = parse_name_group(text)?;
        return Ok((AttributeType::Enumeration(names), rest));
    }
    Err(Error::MalformedGrammar(format!(
        "unrecognized attribute type near {:?}",
        &text[..text.len().min(16)]
    )))
}

/// Parses a `(a|b|c)` name group, used by both `NOTATION (...)` and bare
/// enumeration attribute types.
fn parse_name_group(text: &str) -> Result<(Vec<String>, &str)> {
    let text = text
        .strip_prefix('(')
        .ok_or_else(|| Error::MalformedGrammar("expected '(' in attribute type".to_string()))?;
    let end = text
        .find(')')
        .ok_or_else(|| Error::MalformedGrammar("unterminated attribute type group".to_string()))?;
    let names = text[..end]
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok((names, &text[end + 1..]))
}

fn parse_default_decl(text: &str) -> Result<(AttributeUse, Option<String>, Option<String>, &str)> {
    let text = text.trim_start();
    if let Some(r) = text.strip_prefix("#REQUIRED") {
        return Ok((AttributeUse::Required, None, None, r));
    }
    if let Some(r) = text.strip_prefix("#IMPLIED") {
        return Ok((AttributeUse::Optional, None, None, r));
    }
    if let Some(r) = text.strip_prefix("#FIXED") {
        let r = r.trim_start();
        let (value, rest) = take_quoted(r)
            .ok_or_else(|| Error::MalformedGrammar("malformed #FIXED default".to_string()))?;
        return Ok((AttributeUse::Optional, None, Some(value.to_string()), rest));
    }
    let (value, rest) = take_quoted(text)
        .ok_or_else(|| Error::MalformedGrammar("malformed attribute default value".to_string()))?;
    Ok((AttributeUse::Optional, Some(value.to_string()), None, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_element_and_attlist_declarations() {
        let dtd = DtdGrammar::parse_str(
            r#"<!ELEMENT book (title, author*)>
               <!ATTLIST book id ID #REQUIRED status (draft|final) "draft">"#,
        )
        .unwrap();

        let title = b"title".to_vec();
        let author = b"author".to_vec();
        assert!(dtd.validate_element("book", &[title.clone()]).is_ok());
        assert!(dtd.validate_element("book", &[title, author]).is_ok());
        assert!(dtd.validate_element("book", &[]).is_err());

        let defaults = dtd.default_attributes("book");
        assert!(defaults.contains(&("status".to_string(), "draft".to_string())));
    }

    #[test]
    fn parses_mixed_content_and_empty_and_any() {
        let dtd = DtdGrammar::parse_str(
            r#"<!ELEMENT p (#PCDATA|b|i)*>
               <!ELEMENT br EMPTY>
               <!ELEMENT div ANY>"#,
        )
        .unwrap();
        assert!(dtd.validate_element("p", &[b"b".to_vec()]).is_ok());
        assert!(dtd.validate_element("br", &[]).is_ok());
        assert!(dtd.validate_element("br", &[b"x".to_vec()]).is_err());
        assert!(dtd.validate_element("div", &[b"anything".to_vec()]).is_ok());
    }

    #[test]
    fn parses_general_entity_declarations() {
        let dtd = DtdGrammar::parse_str(r#"<!ENTITY copy "(c)">"#).unwrap();
        assert_eq!(dtd.resolve_entity("copy"), Some("(c)".to_string()));
    }

    #[test]
    fn parameter_entities_expand_before_declaration_parsing() {
        let dtd = DtdGrammar::parse_str(
            r#"<!ENTITY % contact "name, email?">
               <!ELEMENT person (%contact;)>"#,
        )
        .unwrap();
        assert!(dtd
            .validate_element("person", &[b"name".to_vec(), b"email".to_vec()])
            .is_ok());
        assert!(dtd.validate_element("person", &[b"email".to_vec()]).is_err());
    }

    #[test]
    fn internal_subset_declarations_win_over_external() {
        let dir = tempfile::tempdir().unwrap();
        let ext_path = dir.path().join("ext.dtd");
        std::fs::write(&ext_path, b"<!ELEMENT r (a)>").unwrap();

        let grammar = DtdGrammar::parse_combined(
            Some("<!ELEMENT r (b)>"),
            Some("ext.dtd"),
            None,
            Some(&dir.path().join("main.xml")),
            None,
        )
        .unwrap();
        assert!(grammar.validate_element("r", &[b"b".to_vec()]).is_ok());
        assert!(grammar.validate_element("r", &[b"a".to_vec()]).is_err());
    }
}
