//! `xmlcore`: a streaming, event-driven XML 1.0/1.1 processor.
//!
//! The crate is layered bottom-up, mirroring the pipeline a parse runs
//! through:
//!
//! - [`charstream`] decodes a byte stream into validated Unicode code
//!   points and exposes the lookahead window the scanner needs.
//! - [`reader`] is the character-level scanner: it recognizes markup
//!   delimiters and yields borrowed [`events::Event`]s without judging
//!   document structure.
//! - [`document`] drives the document-level state machine on top of the
//!   scanner: it tracks the element stack, expands entities, normalizes
//!   attributes, and calls into a [`grammar::Grammar`] for validation,
//!   delivering [`handler::ContentHandler`] callbacks as it goes.
//! - [`grammar`] is the validation back-end abstraction (DTD, XSD,
//!   RelaxNG, or a namespace-dispatching composite of those), built on
//!   [`particle`] for content-model matching and [`facets`] for simple-type
//!   checking.
//! - [`catalog`] and [`path`] resolve PUBLIC/SYSTEM identifiers and
//!   `schemaLocation` hints to local files for the grammar back-ends to
//!   read.
//!
//! Most callers only need [`EventParserBuilder`] and a
//! [`ContentHandler`] implementation; the lower layers are public so a
//! caller can drive the scanner directly (e.g. to build a different
//! event model) or assemble a [`grammar::Grammar`] without going through
//! a `<!DOCTYPE>` declaration.

pub mod catalog;
pub mod charstream;
pub mod document;
pub mod errors;
pub mod escape;
pub mod events;
pub mod facets;
pub mod grammar;
pub mod handler;
pub mod name;
pub mod particle;
pub mod path;
pub mod reader;
#[cfg(test)]
mod utils;

pub use document::{EventParser, EventParserBuilder};
pub use errors::{Error, Result};
pub use handler::{ContentHandler, NullHandler};
pub use reader::{DefaultParser, NamespacedParser, Parser, Reader, ReaderBuilder};
