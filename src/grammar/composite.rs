//! Composite grammar: dispatches the capability methods to one of several
//! sub-grammars, keyed by XML namespace URI.
//!
//! A document that mixes, say, a DTD-declared root namespace with an
//! XSD-validated extension namespace loads both grammars separately and
//! combines them here rather than requiring one back-end to understand
//! the other's schema language.

use std::collections::HashMap;

use crate::errors::Result;
use crate::grammar::{AttributeDeclaration, Grammar};

#[derive(Clone, Debug, Default)]
pub struct CompositeGrammar {
    /// Keyed by namespace URI. The empty string is used for the
    /// no-namespace (or DTD, which has no namespace concept) case.
    by_namespace: HashMap<String, Grammar>,
    /// Order entries were added in, used to pick a grammar for element
    /// names this composite has no namespace binding for (e.g. while
    /// validating against a DTD component that never declared a
    /// namespace at all).
    fallback_order: Vec<String>,
}

impl CompositeGrammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace_uri: impl Into<String>, grammar: Grammar) -> Self {
        let key = namespace_uri.into();
        self.fallback_order.push(key.clone());
        self.by_namespace.insert(key, grammar);
        self
    }

    /// Picks the sub-grammar to consult for an element or attribute whose
    /// namespace is `namespace_uri` (`None` or empty for no namespace).
    /// Falls back to the first-registered grammar when there is no exact
    /// binding, since a lone DTD component is commonly registered under
    /// the empty-string key and should still answer for every element.
    fn grammar_for(&self, namespace_uri: Option<&str>) -> Option<&Grammar> {
        if let Some(uri) = namespace_uri {
            if let Some(g) = self.by_namespace.get(uri) {
                return Some(g);
            }
        }
        self.fallback_order.first().and_then(|key| self.by_namespace.get(key))
    }

    pub fn resolve_entity(&self, name: &str) -> Option<String> {
        self.fallback_order.iter().find_map(|ns| self.by_namespace.get(ns)?.resolve_entity(name))
    }

    pub fn element_attributes(&self, element: &str) -> Option<&HashMap<String, AttributeDeclaration>> {
        self.grammar_for(None)?.element_attributes(element)
    }

    pub fn default_attributes(&self, element: &str) -> Vec<(String, String)> {
        self.grammar_for(None).map(|g| g.default_attributes(element)).unwrap_or_default()
    }

    pub fn validate_attributes(&self, element: &str, present: &[(String, String)]) -> Result<()> {
        match self.grammar_for(None) {
            Some(g) => g.validate_attributes(element, present),
            None => Ok(()),
        }
    }

    pub fn validate_element(&self, element: &str, children: &[Vec<u8>]) -> Result<()> {
        match self.grammar_for(None) {
            Some(g) => g.validate_element(element, children),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::DtdGrammar;

    #[test]
    fn falls_back_to_the_only_registered_grammar_for_unbound_namespaces() {
        let dtd = DtdGrammar::parse_str("<!ELEMENT r (a)><!ELEMENT a EMPTY>").unwrap();
        let composite = CompositeGrammar::new().with_namespace("", Grammar::Dtd(dtd));

        assert!(composite.validate_element("r", &[b"a".to_vec()]).is_ok());
        assert!(composite.validate_element("r", &[b"b".to_vec()]).is_err());
    }
}
