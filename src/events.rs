//! Owned and borrowed event types produced by the event parser.
//!
//! The `Bytes*` types follow the zero-copy, `Cow`-backed shape common to
//! hand-written XML scanners: a type usually borrows from the reader's
//! internal buffer, but can be promoted to an owned value with
//! `into_owned` when it must outlive the buffer (e.g. across an `await`
//! point, or when pushed into a caller-owned collection).

use std::borrow::Cow;
use std::ops::Deref;

use crate::errors::{Error, Result};
use crate::escape::{escape, unescape_with_predefined};
use crate::charstream::XmlVersion;
use crate::name::QName;

/// A start-tag event: `<name attr="value" ...>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesStart<'a> {
    buf: Cow<'a, [u8]>,
    name_len: usize,
}

impl<'a> BytesStart<'a> {
    /// Creates a start event from the tag's raw content (name + attribute
    /// text, not including the surrounding `<`/`>`).
    pub fn borrowed(content: &'a [u8], name_len: usize) -> Self {
        BytesStart { buf: Cow::Borrowed(content), name_len }
    }

    pub fn owned(content: Vec<u8>, name_len: usize) -> Self {
        BytesStart { buf: Cow::Owned(content), name_len }
    }

    /// Creates a start event whose content is only a bare name, with no
    /// attributes. Convenient for tests and for synthesizing a start tag
    /// from a name the caller already has (e.g. expanding an entity whose
    /// replacement text is a single empty element).
    pub fn borrowed_name(name: &'a [u8]) -> Self {
        BytesStart { buf: Cow::Borrowed(name), name_len: name.len() }
    }

    pub fn into_owned(self) -> BytesStart<'static> {
        BytesStart { buf: Cow::Owned(self.buf.into_owned()), name_len: self.name_len }
    }

    pub fn name(&self) -> QName<'_> {
        QName::new(&self.buf[..self.name_len])
    }

    /// Iterates the tag's attributes in document order.
    pub fn attributes(&self) -> Attributes<'_> {
        Attributes::new(&self.buf[self.name_len..])
    }

    pub fn attributes_count(&self) -> usize {
        self.attributes().count()
    }

    /// Builds the matching end-tag event, for callers that want to hand
    /// [`crate::reader::Reader::read_to_end`] the name of a start event they
    /// already hold.
    pub fn to_end(&self) -> BytesEnd<'_> {
        BytesEnd::borrowed(&self.buf[..self.name_len])
    }
}

impl<'a> Deref for BytesStart<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

/// An end-tag event: `</name>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesEnd<'a> {
    name: Cow<'a, [u8]>,
}

impl<'a> BytesEnd<'a> {
    pub fn borrowed(name: &'a [u8]) -> Self {
        BytesEnd { name: Cow::Borrowed(name) }
    }

    pub fn owned(name: Vec<u8>) -> Self {
        BytesEnd { name: Cow::Owned(name) }
    }

    pub fn into_owned(self) -> BytesEnd<'static> {
        BytesEnd { name: Cow::Owned(self.name.into_owned()) }
    }

    pub fn name(&self) -> QName<'_> {
        QName::new(&self.name)
    }
}

impl<'a> Deref for BytesEnd<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.name
    }
}

/// Character data between tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesText<'a> {
    content: Cow<'a, [u8]>,
}

impl<'a> BytesText<'a> {
    pub fn from_escaped(content: &'a [u8]) -> Self {
        BytesText { content: Cow::Borrowed(content) }
    }

    pub fn from_plain_str(content: &'a str) -> Self {
        BytesText { content: escape(content.as_bytes()).into_owned().into() }
    }

    pub fn into_owned(self) -> BytesText<'static> {
        BytesText { content: Cow::Owned(self.content.into_owned()) }
    }

    /// Resolves predefined entities and character references, leaving any
    /// named (grammar-dependent) entity reference untouched.
    pub fn unescaped(&self, version: XmlVersion) -> Result<Cow<[u8]>> {
        unescape_with_predefined(&self.content, version)
    }

    pub fn raw(&self) -> &[u8] {
        &self.content
    }
}

impl<'a> Deref for BytesText<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.content
    }
}

/// A `<![CDATA[ ... ]]>` section's raw (never escaped) content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesCData<'a> {
    content: Cow<'a, [u8]>,
}

impl<'a> BytesCData<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        BytesCData { content: Cow::Borrowed(content) }
    }

    pub fn from_str(content: &'a str) -> Self {
        BytesCData { content: Cow::Borrowed(content.as_bytes()) }
    }

    pub fn into_owned(self) -> BytesCData<'static> {
        BytesCData { content: Cow::Owned(self.content.into_owned()) }
    }
}

impl<'a> Deref for BytesCData<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.content
    }
}

/// An `<?xml version="..." encoding="..." standalone="..."?>` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesDecl<'a> {
    element: BytesStart<'a>,
}

impl<'a> BytesDecl<'a> {
    pub fn from_start(element: BytesStart<'a>) -> Self {
        BytesDecl { element }
    }

    pub fn version(&self) -> Result<Cow<[u8]>> {
        self.attr_value(b"version")
            .ok_or_else(|| Error::XmlDeclWithoutVersion(None))
    }

    pub fn encoding(&self) -> Option<Cow<[u8]>> {
        self.attr_value(b"encoding")
    }

    pub fn standalone(&self) -> Option<Cow<[u8]>> {
        self.attr_value(b"standalone")
    }

    fn attr_value(&self, key: &[u8]) -> Option<Cow<[u8]>> {
        self.element
            .attributes()
            .filter_map(|a| a.ok())
            .find(|a| a.key.as_ref() == key)
            .map(|a| a.value)
    }
}

/// A processing instruction: `<?target data?>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesPI<'a> {
    content: Cow<'a, [u8]>,
    target_len: usize,
}

impl<'a> BytesPI<'a> {
    pub fn new(content: &'a [u8], target_len: usize) -> Self {
        BytesPI { content: Cow::Borrowed(content), target_len }
    }

    pub fn target(&self) -> &[u8] {
        &self.content[..self.target_len]
    }

    pub fn data(&self) -> &[u8] {
        let rest = &self.content[self.target_len..];
        rest.iter()
            .position(|&b| !b.is_ascii_whitespace())
            .map(|i| &rest[i..])
            .unwrap_or(rest)
    }
}

/// A single `name="value"` pair from a start tag's attribute list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub key: QName<'a>,
    pub value: Cow<'a, [u8]>,
    /// False when the value was not present in the document and was
    /// injected from a grammar's declared default.
    pub specified: bool,
}

impl<'a> Attribute<'a> {
    pub fn unescaped_value(&self, version: XmlVersion) -> Result<Cow<[u8]>> {
        unescape_with_predefined(&self.value, version)
    }
}

/// Iterates the attributes of a start tag's raw content.
pub struct Attributes<'a> {
    rest: &'a [u8],
}

impl<'a> Attributes<'a> {
    fn new(raw: &'a [u8]) -> Self {
        Attributes { rest: raw }
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = Result<Attribute<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let skip = self.rest.iter().position(|&b| !b.is_ascii_whitespace())?;
        self.rest = &self.rest[skip..];
        if self.rest.is_empty() {
            return None;
        }

        let eq = match self.rest.iter().position(|&b| b == b'=') {
            Some(i) => i,
            None => {
                let err = Error::UnquotedAttributeValue(String::from_utf8_lossy(self.rest).into_owned());
                self.rest = &[];
                return Some(Err(err));
            }
        };
        let key = QName::new(trim_ascii(&self.rest[..eq]));

        let after_eq = trim_ascii_start(&self.rest[eq + 1..]);
        let quote = match after_eq.first() {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => {
                self.rest = &[];
                return Some(Err(Error::UnquotedAttributeValue(format!("{:?}", key))));
            }
        };
        let value_start = &after_eq[1..];
        let close = match memchr::memchr(quote, value_start) {
            Some(i) => i,
            None => {
                self.rest = &[];
                return Some(Err(Error::UnexpectedEof("attribute value".to_string())));
            }
        };
        let value = &value_start[..close];
        self.rest = &value_start[close + 1..];

        Some(Ok(Attribute { key, value: Cow::Borrowed(value), specified: true }))
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    trim_ascii_end(trim_ascii_start(bytes))
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(i) => &bytes[i..],
        None => &[],
    }
}

fn trim_ascii_end(bytes: &[u8]) -> &[u8] {
    match bytes.iter().rposition(|b| !b.is_ascii_whitespace()) {
        Some(i) => &bytes[..=i],
        None => &[],
    }
}

/// A single owned parsing event, as handed to a `ContentHandler`.
///
/// Unlike the borrowed `Bytes*`/[`Event`] types above (used internally
/// while a buffer is still live), `DocEvent` variants own their data so
/// they can be queued, filtered or replayed independently of the
/// reader's buffer lifetime. This is the event vocabulary of the
/// content-handler contract; [`Event`] is the lower-level, buffer-borrowing
/// token the scanner produces before the document driver turns it into
/// `DocEvent`s (expanding entities, tracking `xml:space`, consulting a
/// grammar for defaults).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocEvent {
    /// Emitted once, before any other event, mirroring SAX's
    /// `startDocument` analog used for handler setup.
    Initialize,
    StartDocument,
    Decl { version: Vec<u8>, encoding: Option<Vec<u8>>, standalone: Option<Vec<u8>> },
    StartDTD { name: Vec<u8>, public_id: Option<Vec<u8>>, system_id: Option<Vec<u8>> },
    InternalSubset(Vec<u8>),
    EndDTD,
    Start { name: Vec<u8>, attributes: Vec<OwnedAttribute> },
    Empty { name: Vec<u8>, attributes: Vec<OwnedAttribute> },
    End { name: Vec<u8> },
    Text(Vec<u8>),
    IgnorableWhitespace(Vec<u8>),
    CData(Vec<u8>),
    StartCDATA,
    EndCDATA,
    Comment(Vec<u8>),
    PI { target: Vec<u8>, data: Vec<u8> },
    SkippedEntity(Vec<u8>),
    EndDocument,
    Eof,
}

/// A single lexical token produced directly by the scanner, borrowing
/// from whatever buffer the reader decoded into. This is the type
/// `Reader::read_event_into` returns; the document driver
/// (`crate::document`) consumes a stream of these and turns them into
/// the owned [`DocEvent`]s a `ContentHandler` receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<'a> {
    /// Text seen before the first markup of the document (normally just
    /// whitespace before the XML declaration or root element).
    StartText(BytesText<'a>),
    Decl(BytesDecl<'a>),
    DocType(BytesText<'a>),
    PI(BytesText<'a>),
    Start(BytesStart<'a>),
    End(BytesEnd<'a>),
    Empty(BytesStart<'a>),
    Text(BytesText<'a>),
    CData(BytesCData<'a>),
    Comment(BytesText<'a>),
    Eof,
}

impl<'a> Event<'a> {
    pub fn into_owned(self) -> Event<'static> {
        match self {
            Event::StartText(e) => Event::StartText(e.into_owned()),
            Event::Decl(e) => Event::Decl(BytesDecl::from_start(e.element.into_owned())),
            Event::DocType(e) => Event::DocType(e.into_owned()),
            Event::PI(e) => Event::PI(e.into_owned()),
            Event::Start(e) => Event::Start(e.into_owned()),
            Event::End(e) => Event::End(e.into_owned()),
            Event::Empty(e) => Event::Empty(e.into_owned()),
            Event::Text(e) => Event::Text(e.into_owned()),
            Event::CData(e) => Event::CData(e.into_owned()),
            Event::Comment(e) => Event::Comment(e.into_owned()),
            Event::Eof => Event::Eof,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedAttribute {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub specified: bool,
}

impl<'a> From<Attribute<'a>> for OwnedAttribute {
    fn from(a: Attribute<'a>) -> Self {
        OwnedAttribute {
            key: a.key.as_ref().to_vec(),
            value: a.value.into_owned(),
            specified: a.specified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_attribute_list() {
        let start = BytesStart::borrowed(b"tag a=\"1\" b='two'", 3);
        let attrs: Vec<_> = start.attributes().map(|a| a.unwrap()).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].key.as_ref(), b"a");
        assert_eq!(&*attrs[0].value, b"1");
        assert_eq!(attrs[1].key.as_ref(), b"b");
        assert_eq!(&*attrs[1].value, b"two");
    }

    #[test]
    fn rejects_unquoted_attribute_value() {
        let start = BytesStart::borrowed(b"tag a=1", 3);
        let err = start.attributes().next().unwrap().unwrap_err();
        assert!(matches!(err, Error::UnquotedAttributeValue(_)));
    }

    #[test]
    fn decl_reads_version_and_encoding() {
        let start = BytesStart::borrowed(b"xml version=\"1.0\" encoding=\"UTF-8\"", 3);
        let decl = BytesDecl::from_start(start);
        assert_eq!(&*decl.version().unwrap(), b"1.0");
        assert_eq!(decl.encoding().as_deref(), Some(b"UTF-8".as_ref()));
    }

    #[test]
    fn pi_splits_target_from_data() {
        let pi = BytesPI::new(b"xml-stylesheet href=\"x.xsl\"", 14);
        assert_eq!(pi.target(), b"xml-stylesheet");
        assert_eq!(pi.data(), b"href=\"x.xsl\"");
    }
}
