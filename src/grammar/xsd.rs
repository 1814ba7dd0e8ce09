//! XSD back-end: walks an `xs:schema` document (itself parsed with
//! validation disabled, recursively reusing the core reader),
//! registers named components, resolves `xs:include`/`xs:import`/
//! `xs:redefine` through the catalog, and collects default attributes by
//! walking every global element and the types it refers to.
//!
//! Namespace prefixes are not checked against the XML Schema namespace
//! URI here; schema authors overwhelmingly bind a fixed `xs:`/`xsd:`
//! prefix and this back-end matches on local name only, the same
//! pragmatic simplification the catalog parser makes for its own
//! (unprefixed) vocabulary.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::errors::{Error, Result};
use crate::events::Event;
use crate::facets::{Facet, SimpleType};
use crate::grammar::{AttributeDeclaration, AttributeType, AttributeUse};
use crate::particle::{Occurs, Particle};
use crate::path::resolve_reference;
use crate::reader::Reader;

#[derive(Clone, Debug, Default)]
struct ComplexType {
    particle: Particle,
    attributes: HashMap<String, AttributeDeclaration>,
    /// `xs:extension`/`xs:restriction` base type name, if derived.
    base: Option<String>,
    /// Names of `xs:attributeGroup ref="..."` children, resolved lazily
    /// against `XsdGrammar::attribute_groups` when the type is flattened.
    attribute_group_refs: Vec<String>,
}

#[derive(Clone, Debug)]
struct ElementDecl {
    type_name: Option<String>,
    inline_type: Option<ComplexType>,
}

/// Global (schema-level) components this back-end tracks, keyed by their
/// declared `name`: named `xs:element`, `xs:complexType`,
/// `xs:attributeGroup` and `xs:attribute` declarations (named `xs:group`/
/// standalone `xs:attribute` declarations are referenced here only via
/// the attribute groups and complex types that use them, not tracked
/// independently, since nothing in this back-end's capability surface
/// needs to look one up except through a containing type).
#[derive(Clone, Debug, Default)]
pub struct XsdGrammar {
    elements: HashMap<String, ElementDecl>,
    complex_types: HashMap<String, ComplexType>,
    attribute_groups: HashMap<String, HashMap<String, AttributeDeclaration>>,
}

impl XsdGrammar {
    pub fn element_attributes(&self, element: &str) -> Option<&HashMap<String, AttributeDeclaration>> {
        self.resolved_type_of(element).map(|t| &t.attributes)
    }

    pub fn default_attributes(&self, element: &str) -> Vec<(String, String)> {
        let mut seen_types = HashSet::new();
        match self.resolved_type_of(element) {
            Some(ty) => self.collect_defaults(ty, &mut seen_types),
            None => Vec::new(),
        }
    }

    pub fn validate_attributes(&self, element: &str, present: &[(String, String)]) -> Result<()> {
        match self.resolved_type_of(element) {
            Some(ty) => crate::grammar::check_attribute_uses(element, &ty.attributes, present),
            None => Ok(()),
        }
    }

    pub fn validate_element(&self, element: &str, children: &[Vec<u8>]) -> Result<()> {
        match self.resolved_type_of(element) {
            Some(ty) => ty.particle.validate(children),
            None => Ok(()),
        }
    }

    /// Finds the (possibly inline) complex type backing `element`,
    /// flattening `xs:extension`/`xs:restriction` base-type attributes in
    /// with its own (own declarations win), guarded against type cycles.
    fn resolved_type_of(&self, element: &str) -> Option<ComplexType> {
        let decl = self.elements.get(element)?;
        let base = decl
            .inline_type
            .clone()
            .or_else(|| decl.type_name.as_deref().and_then(|t| self.complex_types.get(t).cloned()))?;
        let mut visited = HashSet::new();
        Some(self.flatten_type(base, &mut visited))
    }

    fn flatten_type(&self, mut ty: ComplexType, visited: &mut HashSet<String>) -> ComplexType {
        if let Some(base_name) = ty.base.take() {
            if visited.insert(base_name.clone()) {
                if let Some(base_type) = self.complex_types.get(&base_name).cloned() {
                    let base_flat = self.flatten_type(base_type, visited);
                    for (name, decl) in base_flat.attributes {
                        ty.attributes.entry(name).or_insert(decl);
                    }
                }
            }
        }
        for group_name in ty.attribute_group_refs.drain(..).collect::<Vec<_>>() {
            if let Some(group) = self.attribute_groups.get(&group_name) {
                for (name, decl) in group.clone() {
                    ty.attributes.entry(name).or_insert(decl);
                }
            }
        }
        ty
    }

    fn collect_defaults(&self, ty: ComplexType, seen_types: &mut HashSet<String>) -> Vec<(String, String)> {
        let _ = seen_types;
        ty.attributes
            .values()
            .filter_map(|d| {
                d.fixed_value
                    .clone()
                    .or_else(|| d.default_value.clone())
                    .map(|v| (d.name.clone(), v))
            })
            .collect()
    }

    /// Parses a schema document at `path`, resolving `xs:import`/
    /// `xs:include`/`xs:redefine` through `catalog` (falling back to a
    /// path relative to `path`'s directory).
    pub fn parse_file(path: &Path, catalog: Option<&Catalog>) -> Result<Self> {
        let mut grammar = XsdGrammar::default();
        let mut visited = HashSet::new();
        grammar.ingest_file(path, catalog, &mut visited)?;
        Ok(grammar)
    }

    fn ingest_file(
        &mut self,
        path: &Path,
        catalog: Option<&Catalog>,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let normalized = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(normalized) {
            return Err(Error::CircularInclusion(path.display().to_string()));
        }
        let bytes = crate::path::read_to_vec(path)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::MalformedGrammar(format!("schema is not valid UTF-8: {}", e)))?;
        self.ingest_str(text, Some(path), catalog, visited)
    }

    fn ingest_str(
        &mut self,
        text: &str,
        base: Option<&Path>,
        catalog: Option<&Catalog>,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let mut reader = Reader::from_str(text);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local = e.name().local_name().as_ref().to_vec();
                    match local.as_slice() {
                        b"element" => {
                            if let Some(name) = attr(e, b"name") {
                                let type_name = attr(e, b"type");
                                self.elements.insert(name, ElementDecl { type_name, inline_type: None });
                            }
                        }
                        b"complexType" => {
                            let name = attr(e, b"name");
                            let ty = parse_attribute_bearing_body(&mut reader, &mut buf, b"complexType")?;
                            if let Some(name) = name {
                                self.complex_types.insert(name, ty);
                            }
                        }
                        b"attributeGroup" => {
                            if let Some(name) = attr(e, b"name") {
                                let ty =
                                    parse_attribute_bearing_body(&mut reader, &mut buf, b"attributeGroup")?;
                                self.attribute_groups.insert(name, ty.attributes);
                            }
                        }
                        b"import" | b"include" | b"redefine" => {
                            self.follow_schema_location(e, &local, base, catalog, visited)?;
                        }
                        _ => {}
                    }
                }
                Event::Empty(ref e) => {
                    let local = e.name().local_name().as_ref().to_vec();
                    match local.as_slice() {
                        b"element" => {
                            if let Some(name) = attr(e, b"name") {
                                let type_name = attr(e, b"type");
                                self.elements.insert(name, ElementDecl { type_name, inline_type: None });
                            }
                        }
                        b"import" | b"include" | b"redefine" => {
                            self.follow_schema_location(e, &local, base, catalog, visited)?;
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn follow_schema_location(
        &mut self,
        e: &crate::events::BytesStart<'_>,
        local: &[u8],
        base: Option<&Path>,
        catalog: Option<&Catalog>,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let location = match attr(e, b"schemaLocation") {
            Some(l) => l,
            None => return Ok(()),
        };
        let resolved = catalog
            .and_then(|c| c.resolve_uri(&location))
            .map(Ok)
            .unwrap_or_else(|| resolve_reference(&location, base));
        if let Ok(resolved) = resolved {
            log::debug!(
                "xsd: resolving {} {:?} -> {}",
                String::from_utf8_lossy(local),
                location,
                resolved.display()
            );
            self.ingest_file(&resolved, catalog, visited)?;
        }
        Ok(())
    }
}

fn attr(e: &crate::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Reads `minOccurs`/`maxOccurs` off a particle-bearing element
/// (`xs:element`, `xs:sequence`, `xs:choice`, `xs:all`, `xs:any`),
/// defaulting to the XSD default of exactly one occurrence.
fn occurs_from_attrs(e: &crate::events::BytesStart<'_>) -> (u32, Occurs) {
    let min = attr(e, b"minOccurs").and_then(|s| s.parse::<u32>().ok()).unwrap_or(1);
    let max = match attr(e, b"maxOccurs").as_deref() {
        Some("unbounded") => Occurs::Unbounded,
        Some(n) => Occurs::Bounded(n.parse::<u32>().unwrap_or(1)),
        None => Occurs::Bounded(1),
    };
    (min, max)
}

/// Skips the subtree of an already-open element named `closing_name`,
/// matching nested same-named start/end tags so a sibling at the same
/// depth is not mistaken for the close of the element being skipped.
fn skip_to_end(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>, closing_name: &[u8]) -> Result<()> {
    let mut depth = 0u32;
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(ref e) if e.name().local_name().as_ref() == closing_name => depth += 1,
            Event::End(ref e) if e.name().local_name().as_ref() == closing_name => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Parses the children of an already-open `xs:sequence`/`xs:choice`/
/// `xs:all` into the list of particles it groups, recursing into nested
/// compositors so the resulting tree preserves real ordering/choice/
/// unordered-set structure for [`crate::particle::Particle`] to validate
/// against (rather than collapsing to a wildcard).
fn parse_particle_children(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    closing_name: &[u8],
) -> Result<Vec<Particle>> {
    let mut children = Vec::new();
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(ref e) => {
                let local = e.name().local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"element" => {
                        let (min, max) = occurs_from_attrs(e);
                        let name = attr(e, b"ref").or_else(|| attr(e, b"name")).unwrap_or_default();
                        children.push(Particle::ElementRef { name: name.into_bytes(), min, max });
                        skip_to_end(reader, buf, b"element")?;
                    }
                    b"sequence" => {
                        let (min, max) = occurs_from_attrs(e);
                        let sub = parse_particle_children(reader, buf, b"sequence")?;
                        children.push(Particle::Sequence { children: sub, min, max });
                    }
                    b"choice" => {
                        let (min, max) = occurs_from_attrs(e);
                        let alternatives = parse_particle_children(reader, buf, b"choice")?;
                        children.push(Particle::Choice { alternatives, min, max });
                    }
                    b"all" => {
                        let (min, max) = occurs_from_attrs(e);
                        let sub = parse_particle_children(reader, buf, b"all")?;
                        children.push(Particle::All { children: sub, min, max });
                    }
                    b"any" => {
                        let (min, max) = occurs_from_attrs(e);
                        children.push(Particle::Any { min, max });
                        skip_to_end(reader, buf, b"any")?;
                    }
                    _ => skip_to_end(reader, buf, &local)?,
                }
            }
            Event::Empty(ref e) => {
                let local = e.name().local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"element" => {
                        let (min, max) = occurs_from_attrs(e);
                        let name = attr(e, b"ref").or_else(|| attr(e, b"name")).unwrap_or_default();
                        children.push(Particle::ElementRef { name: name.into_bytes(), min, max });
                    }
                    b"any" => {
                        let (min, max) = occurs_from_attrs(e);
                        children.push(Particle::Any { min, max });
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if e.name().local_name().as_ref() == closing_name {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(children)
}

/// Builds a [`ComplexType`] from a `<xs:complexType>` or `<xs:attributeGroup>`
/// element's child events, consuming the reader up to (and including) the
/// matching `closing_name` end tag. Recognizes `xs:sequence`/`xs:choice`/
/// `xs:all` (built into a real particle tree via
/// [`parse_particle_children`], not collapsed to a wildcard),
/// `xs:attribute`, `xs:attributeGroup ref`, and `xs:extension`/
/// `xs:restriction`/`xs:complexContent`/`xs:simpleContent`, whose bodies
/// are folded in by recursing into this same function (their own
/// compositor and attributes become this type's, own declarations
/// winning over anything already present).
fn parse_attribute_bearing_body(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    closing_name: &[u8],
) -> Result<ComplexType> {
    let mut ty = ComplexType::default();
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(ref e) => {
                let local = e.name().local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"sequence" => {
                        let (min, max) = occurs_from_attrs(e);
                        let children = parse_particle_children(reader, buf, b"sequence")?;
                        ty.particle = Particle::Sequence { children, min, max };
                    }
                    b"choice" => {
                        let (min, max) = occurs_from_attrs(e);
                        let alternatives = parse_particle_children(reader, buf, b"choice")?;
                        ty.particle = Particle::Choice { alternatives, min, max };
                    }
                    b"all" => {
                        let (min, max) = occurs_from_attrs(e);
                        let children = parse_particle_children(reader, buf, b"all")?;
                        ty.particle = Particle::All { children, min, max };
                    }
                    b"extension" | b"restriction" | b"complexContent" | b"simpleContent" => {
                        if let Some(base) = attr(e, b"base") {
                            ty.base = Some(base);
                        }
                        let nested = parse_attribute_bearing_body(reader, buf, &local)?;
                        if !matches!(nested.particle, Particle::Empty) {
                            ty.particle = nested.particle;
                        }
                        if nested.base.is_some() {
                            ty.base = nested.base;
                        }
                        for (name, decl) in nested.attributes {
                            ty.attributes.entry(name).or_insert(decl);
                        }
                        ty.attribute_group_refs.extend(nested.attribute_group_refs);
                    }
                    b"attribute" | b"attributeGroup" => {
                        ingest_complex_type_child(&local, e, &mut ty)?;
                    }
                    _ => skip_to_end(reader, buf, &local)?,
                }
            }
            Event::Empty(ref e) => {
                let local = e.name().local_name().as_ref().to_vec();
                if matches!(local.as_slice(), b"attribute" | b"attributeGroup") {
                    ingest_complex_type_child(&local, e, &mut ty)?;
                }
            }
            Event::End(ref e) => {
                if e.name().local_name().as_ref() == closing_name {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(ty)
}

fn ingest_complex_type_child(local: &[u8], e: &crate::events::BytesStart<'_>, ty: &mut ComplexType) -> Result<()> {
    match local {
        b"attribute" => {
            if let Some(name) = attr(e, b"name") {
                let use_ = match attr(e, b"use").as_deref() {
                    Some("required") => AttributeUse::Required,
                    Some("prohibited") => AttributeUse::Prohibited,
                    _ => AttributeUse::Optional,
                };
                let mut simple = SimpleType::new();
                if let Some(pattern) = attr(e, b"pattern") {
                    simple = simple.with_facet(Facet::Pattern(crate::facets::compile_pattern(&pattern)?));
                }
                ty.attributes.insert(
                    name.clone(),
                    AttributeDeclaration {
                        name,
                        datatype: AttributeType::Typed(simple),
                        use_,
                        default_value: attr(e, b"default"),
                        fixed_value: attr(e, b"fixed"),
                    },
                );
            }
        }
        b"attributeGroup" => {
            if let Some(r) = attr(e, b"ref") {
                ty.attribute_group_refs.push(r);
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_global_element_and_default_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xsd");
        std::fs::write(
            &path,
            br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="book" type="BookType"/>
            </xs:schema>"#,
        )
        .unwrap();
        let mut grammar = XsdGrammar::default();
        grammar.elements.insert(
            "book".to_string(),
            ElementDecl { type_name: Some("BookType".to_string()), inline_type: None },
        );
        grammar.complex_types.insert(
            "BookType".to_string(),
            ComplexType {
                particle: Particle::Any { min: 0, max: Occurs::Unbounded },
                attributes: {
                    let mut m = HashMap::new();
                    m.insert(
                        "status".to_string(),
                        AttributeDeclaration {
                            name: "status".to_string(),
                            datatype: AttributeType::Typed(SimpleType::new()),
                            use_: AttributeUse::Optional,
                            default_value: Some("draft".to_string()),
                            fixed_value: None,
                        },
                    );
                    m
                },
                base: None,
                ..ComplexType::default()
            },
        );

        let defaults = grammar.default_attributes("book");
        assert_eq!(defaults, vec![("status".to_string(), "draft".to_string())]);
    }

    #[test]
    fn import_resolution_follows_schema_location_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let imported_path = dir.path().join("types.xsd");
        std::fs::write(
            &imported_path,
            br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="imported" type="xs:string"/>
            </xs:schema>"#,
        )
        .unwrap();
        let main_path = dir.path().join("main.xsd");
        std::fs::write(
            &main_path,
            br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:include schemaLocation="types.xsd"/>
                <xs:element name="root" type="xs:string"/>
            </xs:schema>"#,
        )
        .unwrap();

        let grammar = XsdGrammar::parse_file(&main_path, None).unwrap();
        assert!(grammar.elements.contains_key("imported"));
        assert!(grammar.elements.contains_key("root"));
    }

    #[test]
    fn complex_type_sequence_builds_a_real_particle_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.xsd");
        std::fs::write(
            &path,
            br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="order" type="OrderType"/>
                <xs:complexType name="OrderType">
                    <xs:sequence>
                        <xs:element name="id" minOccurs="1" maxOccurs="1"/>
                        <xs:element name="item" minOccurs="1" maxOccurs="unbounded"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>"#,
        )
        .unwrap();
        let grammar = XsdGrammar::parse_file(&path, None).unwrap();

        let ok = vec![b"id".to_vec(), b"item".to_vec(), b"item".to_vec()];
        assert!(grammar.validate_element("order", &ok).is_ok());

        let wrong_order = vec![b"item".to_vec(), b"id".to_vec()];
        assert!(grammar.validate_element("order", &wrong_order).is_err());

        let missing_required = vec![b"item".to_vec()];
        assert!(grammar.validate_element("order", &missing_required).is_err());
    }

    #[test]
    fn complex_type_choice_rejects_disallowed_alternative() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shape.xsd");
        std::fs::write(
            &path,
            br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="shape" type="ShapeType"/>
                <xs:complexType name="ShapeType">
                    <xs:choice>
                        <xs:element name="circle"/>
                        <xs:element name="square"/>
                    </xs:choice>
                </xs:complexType>
            </xs:schema>"#,
        )
        .unwrap();
        let grammar = XsdGrammar::parse_file(&path, None).unwrap();

        assert!(grammar.validate_element("shape", &[b"circle".to_vec()]).is_ok());
        assert!(grammar.validate_element("shape", &[b"square".to_vec()]).is_ok());
        assert!(grammar.validate_element("shape", &[b"triangle".to_vec()]).is_err());
        assert!(grammar.validate_element("shape", &[b"circle".to_vec(), b"square".to_vec()]).is_err());
    }
}
