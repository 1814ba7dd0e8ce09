//! The Grammar abstraction: a capability set shared by the DTD, XSD and
//! RelaxNG back-ends, plus a composite that dispatches by namespace.
//!
//! Modeled as a tagged enum rather than a trait object: the four variants
//! are closed and the capability methods below dispatch on the tag
//! directly.

pub mod composite;
pub mod dtd;
pub mod rng;
pub mod xsd;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub use composite::CompositeGrammar;
pub use dtd::DtdGrammar;
pub use rng::RngGrammar;
pub use xsd::XsdGrammar;

use crate::errors::Result;

/// How an attribute's declared type constrains and shapes its lexical
/// value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeType {
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Notation(Vec<String>),
    Enumeration(Vec<String>),
    /// A named simple type resolved by the XSD/RNG back-end; facet
    /// checking is delegated to [`crate::facets::SimpleType`].
    Typed(crate::facets::SimpleType),
}

impl AttributeType {
    /// Whether whitespace normalization collapses runs of space (anything
    /// other than `CDATA`).
    pub fn is_cdata(&self) -> bool {
        matches!(self, AttributeType::CData)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeUse {
    Required,
    Optional,
    Prohibited,
}

#[derive(Clone, Debug)]
pub struct AttributeDeclaration {
    pub name: String,
    pub datatype: AttributeType,
    pub use_: AttributeUse,
    pub default_value: Option<String>,
    pub fixed_value: Option<String>,
}

/// Result of validating an element's attribute set, reported as a single
/// error listing every offending attribute.
pub fn check_attribute_uses(
    element: &str,
    declarations: &HashMap<String, AttributeDeclaration>,
    present: &[(String, String)],
) -> Result<()> {
    use crate::errors::Error;

    let mut problems = Vec::new();
    for decl in declarations.values() {
        let found = present.iter().find(|(name, _)| name == &decl.name);
        match (&decl.use_, found) {
            (AttributeUse::Required, None) => {
                problems.push(format!("'{}' is required but missing", decl.name));
            }
            (AttributeUse::Prohibited, Some(_)) => {
                problems.push(format!("'{}' is prohibited but present", decl.name));
            }
            (_, Some((_, value))) => {
                if let Some(fixed) = &decl.fixed_value {
                    if fixed != value {
                        problems.push(format!(
                            "'{}' is fixed to {:?} but found {:?}",
                            decl.name, fixed, value
                        ));
                    }
                }
                if let AttributeType::Typed(simple) = &decl.datatype {
                    if let Err(e) = simple.check(value) {
                        problems.push(format!("'{}': {}", decl.name, e));
                    }
                }
            }
            _ => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::AttributeUseViolation {
            element: element.to_string(),
            attribute: declarations.keys().next().cloned().unwrap_or_default(),
            message: problems.join("; "),
        })
    }
}

/// The tagged Grammar variant set. Each variant satisfies the same
/// entity-lookup/default-attribute/validation capability set.
#[derive(Clone, Debug)]
pub enum Grammar {
    Dtd(DtdGrammar),
    Xsd(XsdGrammar),
    Rng(RngGrammar),
    Composite(CompositeGrammar),
}

impl Grammar {
    /// Looks up a general entity's replacement text (DTD only; XSD/RNG
    /// grammars have no entity table and always return `None`).
    pub fn resolve_entity(&self, name: &str) -> Option<String> {
        match self {
            Grammar::Dtd(g) => g.resolve_entity(name),
            Grammar::Xsd(_) | Grammar::Rng(_) => None,
            Grammar::Composite(g) => g.resolve_entity(name),
        }
    }

    pub fn element_attributes(&self, element: &str) -> Option<&HashMap<String, AttributeDeclaration>> {
        match self {
            Grammar::Dtd(g) => g.element_attributes(element),
            Grammar::Xsd(g) => g.element_attributes(element),
            Grammar::Rng(g) => g.element_attributes(element),
            Grammar::Composite(g) => g.element_attributes(element),
        }
    }

    /// Attributes not present in the instance but declared with a default
    /// or fixed value, to be injected with `specified = false`.
    pub fn default_attributes(&self, element: &str) -> Vec<(String, String)> {
        match self {
            Grammar::Dtd(g) => g.default_attributes(element),
            Grammar::Xsd(g) => g.default_attributes(element),
            Grammar::Rng(g) => g.default_attributes(element),
            Grammar::Composite(g) => g.default_attributes(element),
        }
    }

    pub fn validate_attributes(&self, element: &str, present: &[(String, String)]) -> Result<()> {
        match self {
            Grammar::Dtd(g) => g.validate_attributes(element, present),
            Grammar::Xsd(g) => g.validate_attributes(element, present),
            Grammar::Rng(g) => g.validate_attributes(element, present),
            Grammar::Composite(g) => g.validate_attributes(element, present),
        }
    }

    pub fn validate_element(&self, element: &str, children: &[Vec<u8>]) -> Result<()> {
        match self {
            Grammar::Dtd(g) => g.validate_element(element, children),
            Grammar::Xsd(g) => g.validate_element(element, children),
            Grammar::Rng(g) => g.validate_element(element, children),
            Grammar::Composite(g) => g.validate_element(element, children),
        }
    }
}

/// The one process-wide shared structure: grammars compiled from a
/// schema/DTD file, keyed by the file's normalized absolute path. Entries
/// are written once and read many times.
#[derive(Clone, Default)]
pub struct GrammarCache {
    inner: Arc<Mutex<HashMap<PathBuf, Grammar>>>,
}

impl GrammarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached grammar for `path` if present, otherwise builds
    /// it with `build`, inserts it, and returns it. `build` is only called
    /// on a cache miss.
    pub fn get_or_build(
        &self,
        path: &std::path::Path,
        build: impl FnOnce() -> Result<Grammar>,
    ) -> Result<Grammar> {
        let normalized = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        {
            let guard = self.inner.lock().expect("grammar cache poisoned");
            if let Some(g) = guard.get(&normalized) {
                log::debug!("grammar cache hit for {}", normalized.display());
                return Ok(g.clone());
            }
        }
        log::debug!("grammar cache miss for {}, compiling", normalized.display());
        let grammar = build()?;
        let mut guard = self.inner.lock().expect("grammar cache poisoned");
        guard.entry(normalized).or_insert_with(|| grammar.clone());
        Ok(grammar)
    }
}
