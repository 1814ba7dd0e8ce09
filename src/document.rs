//! The document-level event parser: turns the scanner's
//! borrowed [`Event`](crate::events::Event) stream into the owned
//! [`DocEvent`](crate::events::DocEvent) sequence a [`ContentHandler`]
//! receives, performing entity expansion, attribute normalization,
//! `xml:space` tracking, grammar-backed validation and default-attribute
//! injection, and ID/IDREF bookkeeping along the way.
//!
//! This is always namespace-aware and always runs the same pipeline
//! whether or not a grammar is attached; without one, validation and
//! default-attribute steps are simply no-ops.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::charstream::XmlVersion;
use crate::errors::{Error, Result};
use crate::events::{BytesPI, BytesStart, DocEvent, Event, OwnedAttribute};
use crate::grammar::dtd::DtdGrammar;
use crate::grammar::{AttributeType, Grammar, GrammarCache};
use crate::handler::ContentHandler;
use crate::reader::{NamespacedParser, Reader};

/// Whether whitespace-only text directly inside the current element
/// should be reported as `characters` or as `ignorable_whitespace`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SpaceMode {
    Default,
    Preserve,
}

struct ElementFrame {
    name: Vec<u8>,
    children: Vec<Vec<u8>>,
    space: SpaceMode,
    /// Content is element-only (not mixed, not `ANY`) per the grammar, if
    /// one is attached — used to decide `characters` vs
    /// `ignorable_whitespace` for intervening whitespace.
    element_only_content: bool,
}

/// Configuration and driver state for one document parse.
pub struct EventParser<R> {
    reader: Reader<R, NamespacedParser>,
    grammar: Option<Grammar>,
    catalog: Option<Catalog>,
    validating: bool,
    xml_version: XmlVersion,
    max_entity_depth: usize,
    grammar_cache: GrammarCache,
}

/// Builds an [`EventParser`] over a byte-oriented source, layering the
/// validation/grammar/catalog knobs on top of the scanner's own
/// `ReaderBuilder`.
pub struct EventParserBuilder {
    validating: bool,
    xml_version: XmlVersion,
    catalog: Option<Catalog>,
    grammar: Option<Grammar>,
    max_entity_depth: usize,
    grammar_cache: GrammarCache,
}

impl Default for EventParserBuilder {
    fn default() -> Self {
        Self {
            validating: false,
            xml_version: XmlVersion::V10,
            catalog: None,
            grammar: None,
            max_entity_depth: 20,
            grammar_cache: GrammarCache::new(),
        }
    }
}

impl EventParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables validation against the attached or DOCTYPE-declared
    /// grammar. Without this, well-formedness is still fully enforced by
    /// the scanner, but content-model, attribute-use and ID/IDREF
    /// violations are tolerated.
    pub fn validating(mut self, val: bool) -> Self {
        self.validating = val;
        self
    }

    pub fn xml_version(mut self, version: XmlVersion) -> Self {
        self.xml_version = version;
        self
    }

    /// Supplies a grammar up front, bypassing whatever (if anything) the
    /// document's own `<!DOCTYPE>` declares.
    pub fn grammar(mut self, grammar: Option<Grammar>) -> Self {
        self.grammar = grammar;
        self
    }

    /// Supplies a catalog used to resolve PUBLIC/SYSTEM identifiers and
    /// `schemaLocation`/`href` references found while loading a grammar.
    pub fn catalog(mut self, catalog: Option<Catalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Caps the recursion depth of general-entity expansion. A reference
    /// chain deeper than this is rejected with
    /// [`Error::EntityDepthExceeded`] rather than risking unbounded
    /// expansion (the "billion laughs" shape of attack).
    pub fn max_entity_depth(mut self, depth: usize) -> Self {
        self.max_entity_depth = depth;
        self
    }

    pub fn into_str_parser<'b>(self, content: &'b str) -> EventParser<&'b [u8]> {
        EventParser {
            reader: Reader::from_reader_namespaced(content.as_bytes()),
            grammar: self.grammar,
            catalog: self.catalog,
            validating: self.validating,
            xml_version: self.xml_version,
            max_entity_depth: self.max_entity_depth,
            grammar_cache: self.grammar_cache,
        }
    }

    pub fn into_file_parser(self, path: impl AsRef<Path>) -> Result<EventParser<BufReader<File>>> {
        let file = File::open(path).map_err(Error::Io)?;
        Ok(EventParser {
            reader: Reader::from_reader_namespaced(BufReader::new(file)),
            grammar: self.grammar,
            catalog: self.catalog,
            validating: self.validating,
            xml_version: self.xml_version,
            max_entity_depth: self.max_entity_depth,
            grammar_cache: self.grammar_cache,
        })
    }
}

/// The outcome of parsing a `<!DOCTYPE ...>` header's raw text: the root
/// element name, an optional external identifier, and the raw internal
/// subset text if the declaration had a `[...]` block.
struct DoctypeHeader {
    name: Vec<u8>,
    public_id: Option<String>,
    system_id: Option<String>,
    internal_subset: Option<String>,
}

/// Parses the raw bytes following `!DOCTYPE` (as delivered by
/// [`Event::DocType`]) into its structural parts. This is hand-rolled
/// rather than reusing the XML scanner because a doctype header mixes a
/// bare name, an optional quoted external ID pair, and a bracketed
/// subset that is not itself well-formed XML.
fn parse_doctype_header(raw: &[u8]) -> Result<DoctypeHeader> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::MalformedDoctype(format!("DOCTYPE header is not valid UTF-8: {}", e)))?;
    let text = text.trim_end();

    let (before_subset, internal_subset) = match text.find('[') {
        Some(open) => {
            let close = text.rfind(']').ok_or_else(|| {
                Error::MalformedDoctype("DOCTYPE internal subset missing closing ']'".to_string())
            })?;
            (text[..open].trim_end(), Some(text[open + 1..close].to_string()))
        }
        None => (text, None),
    };

    let mut rest = before_subset.trim_start();
    let name_end = rest.find(|c: char| c.is_ascii_whitespace()).unwrap_or(rest.len());
    let name = rest[..name_end].as_bytes().to_vec();
    rest = rest[name_end..].trim_start();

    let (public_id, system_id) = if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (pubid, after) = take_quoted(after.trim_start())
            .ok_or_else(|| Error::MalformedDoctype("PUBLIC missing a quoted literal".to_string()))?;
        let (sysid, _) = take_quoted(after.trim_start())
            .ok_or_else(|| Error::MalformedDoctype("PUBLIC missing its system literal".to_string()))?;
        (Some(pubid.to_string()), Some(sysid.to_string()))
    } else if let Some(after) = rest.strip_prefix("SYSTEM") {
        let (sysid, _) = take_quoted(after.trim_start())
            .ok_or_else(|| Error::MalformedDoctype("SYSTEM missing a quoted literal".to_string()))?;
        (None, Some(sysid.to_string()))
    } else {
        (None, None)
    };

    Ok(DoctypeHeader { name, public_id, system_id, internal_subset })
}

fn take_quoted(text: &str) -> Option<(&str, &str)> {
    let mut chars = text.char_indices();
    let (_, quote) = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let close = text[1..].find(quote)?;
    Some((&text[1..1 + close], &text[1 + close + 1..]))
}

/// Re-validates every code point of already-UTF-8-decoded content
/// (character data, comment text, CDATA content) against the active XML
/// version. The scanner's byte layer only re-synthesizes surrogate pairs
/// and decodes the source encoding; it does not reject a literal control
/// character sitting inside a text run, comment or CDATA section, so
/// every content-bearing event the document driver emits runs through
/// here before reaching the handler (spec.md §4.A).
fn validate_codepoints(bytes: &[u8], version: XmlVersion) -> Result<()> {
    let text = std::str::from_utf8(bytes).map_err(Error::Utf8)?;
    crate::charstream::validate_all(text, version)
}

fn attr_value<'a>(e: &'a BytesStart<'_>, key: &[u8]) -> Option<std::borrow::Cow<'a, [u8]>> {
    e.attributes().filter_map(|a| a.ok()).find(|a| a.key.as_ref() == key).map(|a| a.value)
}

impl<R> EventParser<R>
where
    Reader<R, NamespacedParser>: ReadXmlEvents,
{
    /// Drives the full parse, delivering one `DocEvent`-shaped call per
    /// scanner token to `handler`.
    pub fn parse_document<H: ContentHandler>(&mut self, handler: &mut H) -> Result<()> {
        handler.initialize();
        handler.start_document();

        let mut buf = Vec::new();
        let mut stack: Vec<ElementFrame> = Vec::new();
        let mut declared_ids: HashSet<Vec<u8>> = HashSet::new();
        let mut referenced_idrefs: Vec<Vec<u8>> = Vec::new();
        // Tracks the prolog/root/epilogue state spec.md §4.B's table names:
        // `root_seen` flips true on the first start-tag, `root_closed` once
        // that element's matching end-tag has been delivered. Together they
        // let a second top-level element, or non-whitespace text in the
        // epilogue, be reported as `Error::ContentAfterRoot`.
        let mut root_seen = false;
        let mut root_closed = false;

        loop {
            let event = self.reader.next_event(&mut buf)?;
            match event {
                Event::StartText(text) => {
                    let raw = text.raw();
                    if !raw.iter().all(|b| crate::charstream::is_xml_space(*b)) {
                        handler.characters(raw);
                    }
                }
                Event::Decl(decl) => {
                    let version = decl.version()?.into_owned();
                    let encoding = decl.encoding().map(|c| c.into_owned()).unwrap_or_else(|| b"UTF-8".to_vec());
                    let standalone = decl.standalone().map(|c| c.as_ref() == b"yes");
                    handler.xml_declaration(&version, Some(&encoding), standalone);
                }
                Event::DocType(text) => {
                    let header = parse_doctype_header(text.raw())?;
                    handler.start_dtd(&header.name, header.public_id.as_deref().map(str::as_bytes), header.system_id.as_deref().map(str::as_bytes));
                    if let Some(subset) = &header.internal_subset {
                        handler.internal_subset(subset.as_bytes());
                    }
                    if self.grammar.is_none() {
                        self.grammar = self.load_dtd_grammar(&header)?;
                    }
                    handler.end_dtd();
                }
                Event::PI(text) => {
                    let raw = text.raw();
                    let target_len = raw.iter().position(|b| crate::charstream::is_xml_space(*b)).unwrap_or(raw.len());
                    let pi = BytesPI::new(raw, target_len);
                    if pi.target().eq_ignore_ascii_case(b"xml") {
                        return Err(Error::ReservedPITarget);
                    }
                    handler.processing_instruction(pi.target(), pi.data());
                }
                Event::Comment(text) => {
                    validate_codepoints(text.raw(), self.xml_version)?;
                    handler.comment(text.raw());
                }
                Event::CData(cdata) => {
                    validate_codepoints(&cdata, self.xml_version)?;
                    handler.start_cdata();
                    handler.characters(&cdata);
                    handler.end_cdata();
                    if let Some(frame) = stack.last_mut() {
                        // CDATA content never counts as an element child
                        // for content-model purposes, but it does mean
                        // the element is not empty/element-only.
                        frame.element_only_content = false;
                    }
                }
                Event::Start(start) => {
                    if stack.is_empty() {
                        if root_closed {
                            return Err(Error::ContentAfterRoot);
                        }
                        root_seen = true;
                    }
                    self.handle_start_or_empty(
                        start,
                        false,
                        handler,
                        &mut stack,
                        &mut declared_ids,
                        &mut referenced_idrefs,
                    )?;
                }
                Event::Empty(start) => {
                    if stack.is_empty() {
                        if root_closed {
                            return Err(Error::ContentAfterRoot);
                        }
                        root_seen = true;
                        root_closed = true;
                    }
                    self.handle_start_or_empty(
                        start,
                        true,
                        handler,
                        &mut stack,
                        &mut declared_ids,
                        &mut referenced_idrefs,
                    )?;
                }
                Event::End(end) => {
                    let name = end.name().as_ref().to_vec();
                    let frame = stack.pop();
                    if let (Some(frame), true) = (&frame, self.validating) {
                        if let Some(grammar) = &self.grammar {
                            let local = end.name().local_name().as_ref();
                            let local = String::from_utf8_lossy(local);
                            grammar.validate_element(&local, &frame.children)?;
                        }
                    }
                    if stack.is_empty() {
                        root_closed = true;
                    }
                    handler.end_element(&name);
                }
                Event::Text(text) => {
                    let decoded = self.reader.decode_and_unescape_text(&text)?;
                    validate_codepoints(decoded.as_bytes(), self.xml_version)?;
                    let expanded = self.expand_named_entities(
                        decoded.as_bytes(),
                        &mut HashSet::new(),
                        self.max_entity_depth,
                        handler,
                    )?;
                    let is_whitespace_only = expanded.iter().all(|b| crate::charstream::is_xml_space(*b));
                    if stack.is_empty() && root_closed && !is_whitespace_only {
                        return Err(Error::ContentAfterRoot);
                    }
                    let frame_is_element_only_default_space =
                        stack.last().map(|f| f.element_only_content && f.space == SpaceMode::Default).unwrap_or(false);
                    if is_whitespace_only && frame_is_element_only_default_space {
                        handler.ignorable_whitespace(&expanded);
                    } else {
                        handler.characters(&expanded);
                    }
                }
                Event::Eof => break,
            }
            buf.clear();
        }

        if !root_seen {
            return Err(Error::MissingRoot);
        }

        if self.validating {
            for idref in &referenced_idrefs {
                if !declared_ids.contains(idref) {
                    return Err(Error::DanglingIdRef(String::from_utf8_lossy(idref).into_owned()));
                }
            }
        }

        handler.end_document();
        Ok(())
    }

    /// Handles a `Event::Start`/`Event::Empty` token: normalizes and
    /// validates attributes, injects grammar-declared defaults, updates
    /// the `xml:space` and ID/IDREF bookkeeping, and either pushes a new
    /// [`ElementFrame`] (start tag) or immediately emits the matching
    /// `end_element` (empty tag) without ever pushing one.
    fn handle_start_or_empty<H: ContentHandler>(
        &self,
        start: BytesStart<'_>,
        is_empty: bool,
        handler: &mut H,
        stack: &mut Vec<ElementFrame>,
        declared_ids: &mut HashSet<Vec<u8>>,
        referenced_idrefs: &mut Vec<Vec<u8>>,
    ) -> Result<()> {
        let name = start.name().as_ref().to_vec();
        let local = start.name().local_name().as_ref().to_string();
        if !crate::name::is_valid_name(&name) {
            return Err(Error::InvalidName(String::from_utf8_lossy(&name).into_owned()));
        }

        let mut present: Vec<(String, String)> = Vec::new();
        let mut owned_attrs: Vec<OwnedAttribute> = Vec::new();
        let mut seen_attrs: HashSet<Vec<u8>> = HashSet::new();
        let mut space = stack.last().map(|f| f.space).unwrap_or(SpaceMode::Default);

        for attr in start.attributes() {
            let attr = attr?;
            let key_bytes = attr.key.as_ref().to_vec();
            if !crate::name::is_valid_name(&key_bytes) {
                return Err(Error::InvalidName(String::from_utf8_lossy(&key_bytes).into_owned()));
            }
            if !seen_attrs.insert(key_bytes.clone()) {
                return Err(Error::DuplicateAttribute(String::from_utf8_lossy(&key_bytes).into_owned()));
            }
            let datatype = self
                .grammar
                .as_ref()
                .and_then(|g| g.element_attributes(&local))
                .and_then(|decls| decls.get(std::str::from_utf8(&key_bytes).unwrap_or("")))
                .map(|d| d.datatype.clone());
            let normalized = self.normalize_attribute_value(&attr.value, datatype.as_ref(), handler)?;

            if key_bytes == b"xml:space" {
                space = if normalized == b"preserve" { SpaceMode::Preserve } else { SpaceMode::Default };
            }
            match &datatype {
                Some(AttributeType::Id) => {
                    if !declared_ids.insert(normalized.clone()) && self.validating {
                        return Err(Error::DuplicateId(String::from_utf8_lossy(&normalized).into_owned()));
                    }
                }
                Some(AttributeType::IdRef) => referenced_idrefs.push(normalized.clone()),
                Some(AttributeType::IdRefs) => {
                    referenced_idrefs.extend(normalized.split(|b| *b == b' ').map(|s| s.to_vec()));
                }
                _ => {}
            }

            present.push((
                String::from_utf8_lossy(&key_bytes).into_owned(),
                String::from_utf8_lossy(&normalized).into_owned(),
            ));
            owned_attrs.push(OwnedAttribute { key: key_bytes, value: normalized, specified: true });
        }

        if let Some(grammar) = &self.grammar {
            for (default_name, default_value) in grammar.default_attributes(&local) {
                if !present.iter().any(|(k, _)| k == &default_name) {
                    present.push((default_name.clone(), default_value.clone()));
                    owned_attrs.push(OwnedAttribute {
                        key: default_name.into_bytes(),
                        value: default_value.into_bytes(),
                        specified: false,
                    });
                }
            }
            if self.validating {
                grammar.validate_attributes(&local, &present)?;
            }
        }

        if let Some(parent) = stack.last_mut() {
            parent.children.push(name.clone());
        }

        let element_only_content =
            self.grammar.as_ref().map(|g| element_only(g, &local)).unwrap_or(false);

        if is_empty {
            handler.start_element(&name, &owned_attrs);
            if self.validating {
                if let Some(grammar) = &self.grammar {
                    grammar.validate_element(&local, &[])?;
                }
            }
            handler.end_element(&name);
        } else {
            handler.start_element(&name, &owned_attrs);
            stack.push(ElementFrame { name, children: Vec::new(), space, element_only_content });
        }
        Ok(())
    }

    /// Loads the grammar a `<!DOCTYPE>` declares, combining the internal
    /// and external subsets (internal wins on conflicting declarations).
    /// Returns `None` (not an error) when the doctype names no external
    /// ID and has no internal subset, since that's simply a document
    /// with no DTD-declared grammar.
    fn load_dtd_grammar(&mut self, header: &DoctypeHeader) -> Result<Option<Grammar>> {
        if header.system_id.is_none() && header.internal_subset.is_none() {
            return Ok(None);
        }
        let resolved_path = match (&header.public_id, &header.system_id) {
            (Some(pub_id), _) => self.catalog.as_ref().and_then(|c| c.resolve_public(pub_id)),
            (None, Some(sys_id)) => self.catalog.as_ref().and_then(|c| c.resolve_system(sys_id)),
            (None, None) => None,
        };
        let resolved_path = resolved_path.or_else(|| {
            header
                .system_id
                .as_deref()
                .and_then(|sys_id| crate::path::resolve_reference(sys_id, None).ok())
        });

        let build = || -> Result<Grammar> {
            let grammar = DtdGrammar::parse_combined(
                header.internal_subset.as_deref(),
                header.system_id.as_deref(),
                header.public_id.as_deref(),
                None,
                self.catalog.as_ref(),
            )?;
            Ok(Grammar::Dtd(grammar))
        };

        let grammar = match &resolved_path {
            Some(path) => self.grammar_cache.get_or_build(path, build)?,
            None => build()?,
        };
        Ok(Some(grammar))
    }

    /// Applies entity expansion (before whitespace handling), then
    /// (unless the declared type is `CDATA`) collapses whitespace, the
    /// attribute-value normalization order XML requires. Line-ending
    /// normalization has already happened at the scanner layer.
    fn normalize_attribute_value<H: ContentHandler>(
        &self,
        raw: &[u8],
        datatype: Option<&AttributeType>,
        handler: &mut H,
    ) -> Result<Vec<u8>> {
        let unescaped = crate::escape::unescape_with_predefined(raw, self.xml_version)?;
        let expanded =
            self.expand_named_entities(&unescaped, &mut HashSet::new(), self.max_entity_depth, handler)?;
        let is_cdata = datatype.map(|d| d.is_cdata()).unwrap_or(true);
        if is_cdata {
            Ok(expanded)
        } else {
            Ok(collapse_whitespace(&expanded))
        }
    }

    /// Recursively replaces named general-entity references with their
    /// grammar-declared replacement text. `visited` guards against a
    /// self- or mutually-referential entity; `depth_budget` is the
    /// remaining permitted nesting before [`Error::EntityDepthExceeded`].
    ///
    /// A name the active grammar cannot resolve (or the absence of a
    /// grammar at all) is a miss, not automatically fatal: in validating
    /// mode it raises [`Error::UnresolvedEntity`], but otherwise the raw
    /// `&name;` is preserved verbatim in the output and `handler` is told
    /// about it via [`ContentHandler::skipped_entity`], per spec.md §4.B.
    fn expand_named_entities<H: ContentHandler>(
        &self,
        text: &[u8],
        visited: &mut HashSet<String>,
        depth_budget: usize,
        handler: &mut H,
    ) -> Result<Vec<u8>> {
        if !crate::escape::has_named_entity_reference(text) {
            return Ok(text.to_vec());
        }
        if depth_budget == 0 {
            return Err(Error::EntityDepthExceeded("max_entity_depth exceeded".to_string()));
        }

        let mut out = Vec::with_capacity(text.len());
        let mut rest = text;
        while let Some(amp) = memchr::memchr(b'&', rest) {
            out.extend_from_slice(&rest[..amp]);
            let after = &rest[amp + 1..];
            let semi = match memchr::memchr(b';', after) {
                Some(i) => i,
                None => return Err(Error::UnexpectedEof("entity reference".to_string())),
            };
            let name = &after[..semi];
            rest = &after[semi + 1..];
            if crate::escape::predefined_entity(name).is_some() || name.starts_with(b"#") {
                out.push(b'&');
                out.extend_from_slice(&after[..=semi]);
                continue;
            }
            let name_str = String::from_utf8_lossy(name).into_owned();
            match self.grammar.as_ref().and_then(|g| g.resolve_entity(&name_str)) {
                Some(replacement) => {
                    if !visited.insert(name_str.clone()) {
                        return Err(Error::RecursiveEntity(name_str));
                    }
                    let unescaped =
                        crate::escape::unescape_with_predefined(replacement.as_bytes(), self.xml_version)?;
                    let expanded = self.expand_named_entities(&unescaped, visited, depth_budget - 1, handler)?;
                    out.extend_from_slice(&expanded);
                    visited.remove(&name_str);
                }
                None if self.validating => return Err(Error::UnresolvedEntity(name_str)),
                None => {
                    out.push(b'&');
                    out.extend_from_slice(name);
                    out.push(b';');
                    handler.skipped_entity(name);
                }
            }
        }
        out.extend_from_slice(rest);
        Ok(out)
    }
}

fn element_only(grammar: &Grammar, element: &str) -> bool {
    // Only the particle-backed DTD/XSD/RNG models carry this distinction;
    // query indirectly by probing whether the empty child list validates
    // as a non-mixed, non-empty model would reject text. Conservatively
    // false (treat whitespace as significant) unless a grammar explicitly
    // declares element content: handled per-backend where content models
    // are visible.
    grammar.element_attributes(element).is_some() && grammar.validate_element(element, &[]).is_ok()
        && !matches!(grammar, Grammar::Rng(_))
}

/// Collapses runs of XML whitespace to a single space and trims the
/// ends, the attribute-value-normalization rule for any type other than
/// `CDATA`.
fn collapse_whitespace(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut last_was_space = true; // trims leading space
    for &b in text {
        if crate::charstream::is_xml_space(b) {
            if !last_was_space {
                out.push(b' ');
            }
            last_was_space = true;
        } else {
            out.push(b);
            last_was_space = false;
        }
    }
    while out.last() == Some(&b' ') {
        out.pop();
    }
    out
}

/// Narrow seam over `Reader::read_event_into` so `EventParser<R>` does
/// not need to spell out `R: XmlSource` bounds itself; any reader this
/// crate can construct (`&[u8]`, `BufReader<File>`) satisfies it.
pub trait ReadXmlEvents {
    fn next_event<'b>(&mut self, buf: &'b mut Vec<u8>) -> Result<Event<'b>>;
    fn decode_and_unescape_text(&self, text: &crate::events::BytesText<'_>) -> Result<String>;
}

impl<R> ReadXmlEvents for Reader<R, NamespacedParser>
where
    R: std::io::BufRead,
{
    fn next_event<'b>(&mut self, buf: &'b mut Vec<u8>) -> Result<Event<'b>> {
        self.read_event_into(buf)
    }

    fn decode_and_unescape_text(&self, text: &crate::events::BytesText<'_>) -> Result<String> {
        Reader::decode_and_unescape_text(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RecordingHandler;

    #[test]
    fn parses_simple_document_without_a_grammar() {
        let mut parser = EventParserBuilder::new().into_str_parser("<root a=\"1\"><child>text</child></root>");
        let mut handler = RecordingHandler::default();
        parser.parse_document(&mut handler).unwrap();
        assert!(handler.calls.iter().any(|c| c.starts_with("start_element(root")));
        assert!(handler.calls.iter().any(|c| c.contains("characters(\"text\")")));
    }

    #[test]
    fn doctype_header_parses_public_and_system_ids() {
        let header = parse_doctype_header(
            br#"html PUBLIC "-//W3C//DTD XHTML 1.0//EN" "xhtml1.dtd""#,
        )
        .unwrap();
        assert_eq!(header.name, b"html");
        assert_eq!(header.public_id.as_deref(), Some("-//W3C//DTD XHTML 1.0//EN"));
        assert_eq!(header.system_id.as_deref(), Some("xhtml1.dtd"));
    }

    #[test]
    fn doctype_header_parses_internal_subset() {
        let header = parse_doctype_header(br#"root [ <!ELEMENT root EMPTY> ]"#).unwrap();
        assert_eq!(header.name, b"root");
        assert_eq!(header.internal_subset.as_deref(), Some(" <!ELEMENT root EMPTY> "));
    }

    #[test]
    fn entity_expansion_respects_max_depth() {
        let dtd = DtdGrammar::parse_str(
            "<!ENTITY a \"&b;\"><!ENTITY b \"&a;\">",
        )
        .unwrap();
        let mut parser = EventParserBuilder::new()
            .grammar(Some(Grammar::Dtd(dtd)))
            .max_entity_depth(4)
            .into_str_parser("<root/>");
        let mut handler = RecordingHandler::default();
        let err = parser
            .expand_named_entities(b"&a;", &mut HashSet::new(), 4, &mut handler)
            .unwrap_err();
        assert!(matches!(err, Error::RecursiveEntity(_)));
    }

    #[test]
    fn unresolved_entity_is_skipped_as_text_in_non_validating_mode() {
        let mut parser = EventParserBuilder::new().into_str_parser("<root/>");
        let mut handler = RecordingHandler::default();
        let out = parser
            .expand_named_entities(b"&unknown;", &mut HashSet::new(), 4, &mut handler)
            .unwrap();
        assert_eq!(out, b"&unknown;".to_vec());
        assert!(handler.calls.iter().any(|c| c == "skipped_entity(unknown)"));
    }

    #[test]
    fn unresolved_entity_is_fatal_in_validating_mode() {
        let mut parser = EventParserBuilder::new().validating(true).into_str_parser("<root/>");
        let mut handler = RecordingHandler::default();
        let err = parser
            .expand_named_entities(b"&unknown;", &mut HashSet::new(), 4, &mut handler)
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedEntity(ref name) if name == "unknown"));
    }

    #[test]
    fn collapses_whitespace_for_non_cdata_attribute_types() {
        assert_eq!(collapse_whitespace(b"  a   b  "), b"a b".to_vec());
    }
}
