//! The crate's error type and the `Result` alias used throughout.
//!
//! Errors are grouped by *kind* rather than by Rust type: [`Error`] is a
//! single flat enum, and the kind a given
//! variant belongs to (well-formedness, validation, grammar, resource,
//! internal) is documented on the variant itself rather than encoded as
//! a separate wrapper type.

use std::fmt;
use std::io;
use std::str::Utf8Error;

/// The crate's `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;

/// A single error produced while scanning, parsing or validating an XML
/// document.
///
/// # Propagation
///
/// Variants documented as "well-formedness" are always fatal. Variants
/// documented as "validation" are only returned while validating mode is
/// enabled (see `ParserBuilder::validating`); in non-validating mode the
/// underlying condition is tolerated and no error is produced.
#[derive(Debug)]
pub enum Error {
    /// I/O error while reading the underlying byte stream.
    Io(io::Error),
    /// The byte stream was not valid UTF-8 where UTF-8 was required.
    Utf8(Utf8Error),
    /// A byte sequence could not be decoded using the active encoding.
    NonDecodable(Option<Utf8Error>),

    // --- well-formedness -------------------------------------------------
    /// A code point outside the allowed set for the active XML version.
    InvalidCodePoint { code_point: u32, version: &'static str },
    /// Unexpected end of input while looking for the named construct.
    UnexpectedEof(String),
    /// A `<!` was followed by something other than `--`, `[CDATA[` or `DOCTYPE`.
    UnexpectedBang(u8),
    /// An unexpected token was found (e.g. `--` inside a comment).
    UnexpectedToken(String),
    /// A closing tag's name did not match the currently open element.
    EndEventMismatch { expected: String, found: String },
    /// Two attributes with the same name appeared on the same start tag.
    DuplicateAttribute(String),
    /// An attribute value was not properly quoted.
    UnquotedAttributeValue(String),
    /// `]]>` appeared in character content outside of a CDATA section.
    BareCDataClose,
    /// An entity reference could not be resolved and no grammar is active
    /// (predefined entities always resolve; this is for named references).
    UnresolvedEntity(String),
    /// An entity referenced itself, directly or transitively.
    RecursiveEntity(String),
    /// Entity nesting exceeded the configured `max_entity_depth`.
    EntityDepthExceeded(String),
    /// A character reference did not name a valid code point.
    InvalidCharacterReference(String),
    /// A `<?xml declaration?>` was malformed or missing its version.
    XmlDeclWithoutVersion(Option<String>),
    /// More than one root element, or markup after the root element closed.
    ContentAfterRoot,
    /// Input ended before any root element was seen.
    MissingRoot,
    /// A processing instruction's target was (case-insensitively) `xml`.
    ReservedPITarget,
    /// A name did not satisfy the XML `Name`/`NCName` production.
    InvalidName(String),
    /// `read_text_into`/`read_text_into_async` found something other than
    /// a lone `Text` event before the matching end tag.
    TextNotFound,
    /// A `<!DOCTYPE ...>` header could not be split into its name,
    /// external identifier and internal-subset parts.
    MalformedDoctype(String),

    // --- validation (fatal only when validating) -------------------------
    /// An element appeared where the active content model does not allow it.
    ElementNotAllowed { parent: String, child: String, position: usize },
    /// A required attribute was missing, or a prohibited attribute was present.
    AttributeUseViolation { element: String, attribute: String, message: String },
    /// An attribute or text value did not satisfy its simple-type facets.
    FacetViolation { value: String, message: String },
    /// An attribute's fixed value did not match the value actually present.
    FixedValueMismatch { attribute: String, expected: String, found: String },
    /// The same ID value was declared more than once.
    DuplicateId(String),
    /// An IDREF/IDREFS value did not match any declared ID.
    DanglingIdRef(String),
    /// Generic content-model violation with a human-readable explanation.
    ContentModelViolation(String),

    // --- grammar ----------------------------------------------------------
    /// A DTD, XSD or RNG document was malformed.
    MalformedGrammar(String),
    /// An `xs:import`/`xs:include`/`xs:redefine` or RNG `externalRef`/`include`
    /// could not be resolved.
    UnresolvableReference(String),
    /// A schema or DTD external-subset file could not be found.
    GrammarNotFound(String),
    /// A schema inclusion graph contained a cycle.
    CircularInclusion(String),

    // --- resource -----------------------------------------------------------
    /// A catalog entry was malformed.
    MalformedCatalogEntry(String),
    /// A URI scheme other than a local path or `file://` was used.
    UnsupportedScheme(String),
    /// The referenced file does not exist.
    FileNotFound(String),

    // --- internal -----------------------------------------------------------
    /// A particle was reached before its referent was resolved.
    UnresolvedParticle(String),
    /// An unreachable state-machine transition was taken.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Utf8(e) => write!(f, "UTF-8 error: {}", e),
            Error::NonDecodable(_) => write!(f, "cannot decode bytes with the active encoding"),

            Error::InvalidCodePoint { code_point, version } => write!(
                f,
                "invalid XML {} character U+{:04X}",
                version, code_point
            ),
            Error::UnexpectedEof(what) => write!(f, "unexpected EOF while parsing {}", what),
            Error::UnexpectedBang(b) => write!(f, "unexpected byte after '<!': {:?}", *b as char),
            Error::UnexpectedToken(t) => write!(f, "unexpected token: {}", t),
            Error::EndEventMismatch { expected, found } => {
                write!(f, "expected </{}>, found </{}>", expected, found)
            }
            Error::DuplicateAttribute(name) => write!(f, "duplicate attribute: {}", name),
            Error::UnquotedAttributeValue(name) => {
                write!(f, "attribute value is not quoted: {}", name)
            }
            Error::BareCDataClose => write!(f, "']]>' found outside a CDATA section"),
            Error::UnresolvedEntity(name) => write!(f, "unresolved entity reference: &{};", name),
            Error::RecursiveEntity(name) => {
                write!(f, "recursive entity reference: &{};", name)
            }
            Error::EntityDepthExceeded(name) => {
                write!(f, "entity expansion depth exceeded at &{};", name)
            }
            Error::InvalidCharacterReference(s) => {
                write!(f, "invalid character reference: {}", s)
            }
            Error::XmlDeclWithoutVersion(found) => match found {
                Some(found) => write!(f, "XML declaration without version, found: {}", found),
                None => write!(f, "XML declaration without version"),
            },
            Error::ContentAfterRoot => write!(f, "content found after root element"),
            Error::MissingRoot => write!(f, "no root element found"),
            Error::ReservedPITarget => {
                write!(f, "processing instruction target must not be 'xml'")
            }
            Error::InvalidName(name) => write!(f, "invalid XML name: {:?}", name),
            Error::TextNotFound => write!(f, "expected a text event"),
            Error::MalformedDoctype(msg) => write!(f, "malformed DOCTYPE header: {}", msg),

            Error::ElementNotAllowed { parent, child, position } => write!(
                f,
                "element <{}> not allowed at position {} inside <{}>",
                child, position, parent
            ),
            Error::AttributeUseViolation { element, attribute, message } => write!(
                f,
                "attribute '{}' on <{}>: {}",
                attribute, element, message
            ),
            Error::FacetViolation { value, message } => {
                write!(f, "value {:?} violates a facet: {}", value, message)
            }
            Error::FixedValueMismatch { attribute, expected, found } => write!(
                f,
                "attribute '{}' must be fixed to {:?}, found {:?}",
                attribute, expected, found
            ),
            Error::DuplicateId(id) => write!(f, "duplicate ID value: {}", id),
            Error::DanglingIdRef(id) => write!(f, "IDREF does not match any ID: {}", id),
            Error::ContentModelViolation(msg) => write!(f, "content model violation: {}", msg),

            Error::MalformedGrammar(msg) => write!(f, "malformed grammar: {}", msg),
            Error::UnresolvableReference(what) => {
                write!(f, "could not resolve reference: {}", what)
            }
            Error::GrammarNotFound(what) => write!(f, "grammar resource not found: {}", what),
            Error::CircularInclusion(what) => write!(f, "circular schema inclusion: {}", what),

            Error::MalformedCatalogEntry(msg) => write!(f, "malformed catalog entry: {}", msg),
            Error::UnsupportedScheme(scheme) => write!(f, "unsupported URI scheme: {}", scheme),
            Error::FileNotFound(path) => write!(f, "file not found: {}", path),

            Error::UnresolvedParticle(what) => {
                write!(f, "internal error: unresolved particle {}", what)
            }
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Utf8Error> for Error {
    fn from(e: Utf8Error) -> Self {
        Error::Utf8(e)
    }
}

/// Whether a given error is one that must always abort parsing, regardless
/// of whether validating mode is enabled.
impl Error {
    pub fn is_always_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ElementNotAllowed { .. }
                | Error::AttributeUseViolation { .. }
                | Error::FacetViolation { .. }
                | Error::FixedValueMismatch { .. }
                | Error::DuplicateId(_)
                | Error::DanglingIdRef(_)
                | Error::ContentModelViolation(_)
                | Error::MalformedGrammar(_)
                | Error::UnresolvableReference(_)
                | Error::GrammarNotFound(_)
                | Error::CircularInclusion(_)
                | Error::MalformedCatalogEntry(_)
                | Error::UnsupportedScheme(_)
                | Error::FileNotFound(_)
        )
    }
}
