//! The content-handler sink: the trait a caller implements to consume the
//! event stream produced by the reader, plus a do-nothing default used in
//! tests and for well-formedness-only parsing where no downstream
//! consumer cares about the content.

use crate::events::OwnedAttribute;

/// Callback sink for parsed document content. One method per event kind;
/// all methods have a default no-op implementation so implementors only
/// override what they care about.
pub trait ContentHandler {
    /// Called once before any other method, before the source has even
    /// been read, so a handler can allocate or reset per-parse state.
    fn initialize(&mut self) {}

    fn start_document(&mut self) {}
    fn end_document(&mut self) {}

    /// The `<?xml version="..." encoding="..." standalone="..."?>`
    /// declaration, if the document had one. `standalone` is `None` when
    /// the attribute was absent, distinct from `Some(false)`.
    fn xml_declaration(&mut self, _version: &[u8], _encoding: Option<&[u8]>, _standalone: Option<bool>) {}

    fn start_dtd(&mut self, _name: &[u8], _public_id: Option<&[u8]>, _system_id: Option<&[u8]>) {}

    /// The raw text of the internal subset (between `[` and `]` in the
    /// `<!DOCTYPE>`), delivered verbatim before any of its declarations
    /// are applied. Absent when the doctype had no internal subset.
    fn internal_subset(&mut self, _text: &[u8]) {}

    fn end_dtd(&mut self) {}

    fn start_element(&mut self, _name: &[u8], _attributes: &[OwnedAttribute]) {}
    fn end_element(&mut self, _name: &[u8]) {}

    fn characters(&mut self, _text: &[u8]) {}
    fn ignorable_whitespace(&mut self, _text: &[u8]) {}

    fn start_cdata(&mut self) {}
    fn end_cdata(&mut self) {}

    fn comment(&mut self, _text: &[u8]) {}
    fn processing_instruction(&mut self, _target: &[u8], _data: &[u8]) {}

    fn skipped_entity(&mut self, _name: &[u8]) {}
}

/// A handler that discards every event. Useful for exercising the
/// scanner/validator path in tests and benchmarks without building a DOM.
#[derive(Default)]
pub struct NullHandler;

impl ContentHandler for NullHandler {}

/// A handler that records every event it receives, for assertions in
/// tests that need to check the exact sequence and arguments delivered.
#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Vec<String>,
}

impl ContentHandler for RecordingHandler {
    fn initialize(&mut self) {
        self.calls.push("initialize".to_string());
    }

    fn start_document(&mut self) {
        self.calls.push("start_document".to_string());
    }

    fn xml_declaration(&mut self, version: &[u8], encoding: Option<&[u8]>, standalone: Option<bool>) {
        self.calls.push(format!(
            "xml_declaration({}, {:?}, {:?})",
            String::from_utf8_lossy(version),
            encoding.map(String::from_utf8_lossy),
            standalone
        ));
    }

    fn internal_subset(&mut self, text: &[u8]) {
        self.calls.push(format!("internal_subset({:?})", String::from_utf8_lossy(text)));
    }

    fn end_document(&mut self) {
        self.calls.push("end_document".to_string());
    }

    fn start_element(&mut self, name: &[u8], attributes: &[OwnedAttribute]) {
        self.calls.push(format!(
            "start_element({}, {} attrs)",
            String::from_utf8_lossy(name),
            attributes.len()
        ));
    }

    fn end_element(&mut self, name: &[u8]) {
        self.calls.push(format!("end_element({})", String::from_utf8_lossy(name)));
    }

    fn characters(&mut self, text: &[u8]) {
        self.calls.push(format!("characters({:?})", String::from_utf8_lossy(text)));
    }

    fn ignorable_whitespace(&mut self, text: &[u8]) {
        self.calls.push(format!("ignorable_whitespace({:?})", String::from_utf8_lossy(text)));
    }

    fn comment(&mut self, text: &[u8]) {
        self.calls.push(format!("comment({:?})", String::from_utf8_lossy(text)));
    }

    fn processing_instruction(&mut self, target: &[u8], data: &[u8]) {
        self.calls.push(format!(
            "pi({}, {:?})",
            String::from_utf8_lossy(target),
            String::from_utf8_lossy(data)
        ));
    }

    fn skipped_entity(&mut self, name: &[u8]) {
        self.calls.push(format!("skipped_entity({})", String::from_utf8_lossy(name)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_handler_captures_element_sequence() {
        let mut h = RecordingHandler::default();
        h.start_document();
        h.start_element(b"root", &[]);
        h.characters(b"text");
        h.end_element(b"root");
        h.end_document();
        assert_eq!(
            h.calls,
            vec![
                "start_document".to_string(),
                "start_element(root, 0 attrs)".to_string(),
                "characters(\"text\")".to_string(),
                "end_element(root)".to_string(),
                "end_document".to_string(),
            ]
        );
    }

    #[test]
    fn null_handler_accepts_every_call_without_panicking() {
        let mut h = NullHandler;
        h.start_document();
        h.start_element(b"a", &[]);
        h.end_element(b"a");
        h.end_document();
    }
}
