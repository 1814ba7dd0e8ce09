//! RelaxNG back-end: parses RelaxNG XML syntax into a pattern tree and
//! validates child-name sequences by folding each name through the
//! derivative of the current pattern.
//!
//! Only the element-name-level shape of content is derived here (whether
//! a given child name may appear next); attribute/text/data nodes are
//! resolved separately per `<element>` via [`RngGrammar::element_attributes`].
//! This mirrors how the DTD/XSD back-ends also validate one level of
//! children at a time rather than eagerly expanding the whole document
//! tree.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::errors::{Error, Result};
use crate::events::Event;
use crate::grammar::{AttributeDeclaration, AttributeType, AttributeUse};
use crate::reader::Reader;

/// A RelaxNG pattern, restricted to what this back-end's derivative
/// validator needs. `Element`'s child pattern only tracks the content
/// *shape*; the element's own attribute declarations are collected
/// separately into [`RngGrammar::elements`].
#[derive(Clone, Debug)]
enum Pattern {
    Empty,
    NotAllowed,
    /// Character data / `data`/`value` patterns: never consumes an
    /// element-start token, always nullable with respect to child names.
    Text,
    Element { name: Vec<u8> },
    Group(Vec<Pattern>),
    Choice(Vec<Pattern>),
    Interleave(Vec<Pattern>),
    OneOrMore(Box<Pattern>),
    Ref(String),
}

impl Pattern {
    fn nullable(&self, defines: &HashMap<String, Pattern>, visited: &mut HashSet<String>) -> bool {
        match self {
            Pattern::Empty | Pattern::Text => true,
            Pattern::NotAllowed | Pattern::Element { .. } => false,
            Pattern::Group(items) | Pattern::Interleave(items) => {
                items.iter().all(|p| p.nullable(defines, visited))
            }
            Pattern::Choice(items) => items.iter().any(|p| p.nullable(defines, visited)),
            Pattern::OneOrMore(inner) => inner.nullable(defines, visited),
            Pattern::Ref(name) => {
                if !visited.insert(name.clone()) {
                    return false;
                }
                defines.get(name).map(|p| p.nullable(defines, visited)).unwrap_or(false)
            }
        }
    }

    fn derivative(
        &self,
        name: &[u8],
        defines: &HashMap<String, Pattern>,
        visited: &mut HashSet<String>,
    ) -> Pattern {
        match self {
            Pattern::Empty | Pattern::Text | Pattern::NotAllowed => Pattern::NotAllowed,
            Pattern::Element { name: n } => {
                if n.as_slice() == name {
                    Pattern::Empty
                } else {
                    Pattern::NotAllowed
                }
            }
            Pattern::Group(items) => Self::derivative_seq(items, name, defines, visited),
            Pattern::Choice(items) => {
                let options: Vec<Pattern> = items
                    .iter()
                    .map(|p| p.derivative(name, defines, visited))
                    .filter(|p| !matches!(p, Pattern::NotAllowed))
                    .collect();
                combine_choice(options)
            }
            Pattern::Interleave(items) => {
                let mut options = Vec::new();
                for i in 0..items.len() {
                    let d = items[i].derivative(name, defines, visited);
                    if matches!(d, Pattern::NotAllowed) {
                        continue;
                    }
                    let mut rest = items.clone();
                    rest[i] = d;
                    options.push(Pattern::Interleave(rest));
                }
                combine_choice(options)
            }
            Pattern::OneOrMore(inner) => {
                let d = inner.derivative(name, defines, visited);
                if matches!(d, Pattern::NotAllowed) {
                    Pattern::NotAllowed
                } else {
                    Pattern::Group(vec![d, Pattern::Choice(vec![Pattern::OneOrMore(inner.clone()), Pattern::Empty])])
                }
            }
            Pattern::Ref(ref_name) => {
                log::trace!("rng: resolving ref {:?}", ref_name);
                if !visited.insert(ref_name.clone()) {
                    return Pattern::NotAllowed;
                }
                match defines.get(ref_name) {
                    Some(p) => p.derivative(name, defines, visited),
                    None => Pattern::NotAllowed,
                }
            }
        }
    }

    fn derivative_seq(
        items: &[Pattern],
        name: &[u8],
        defines: &HashMap<String, Pattern>,
        visited: &mut HashSet<String>,
    ) -> Pattern {
        let (first, rest) = match items.split_first() {
            Some(x) => x,
            None => return Pattern::NotAllowed,
        };
        let d1 = first.derivative(name, defines, visited);
        let mut options = Vec::new();
        if !matches!(d1, Pattern::NotAllowed) {
            let mut seq = vec![d1];
            seq.extend_from_slice(rest);
            options.push(Pattern::Group(seq));
        }
        if first.nullable(defines, visited) {
            let tail = Self::derivative_seq(rest, name, defines, visited);
            if !matches!(tail, Pattern::NotAllowed) {
                options.push(tail);
            }
        }
        combine_choice(options)
    }
}

fn combine_choice(mut options: Vec<Pattern>) -> Pattern {
    match options.len() {
        0 => Pattern::NotAllowed,
        1 => options.remove(0),
        _ => Pattern::Choice(options),
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Empty
    }
}

#[derive(Clone, Debug, Default)]
struct ElementInfo {
    content: Pattern,
    attributes: HashMap<String, AttributeDeclaration>,
}

#[derive(Clone, Debug, Default)]
pub struct RngGrammar {
    elements: HashMap<String, ElementInfo>,
    defines: HashMap<String, Pattern>,
}

impl RngGrammar {
    pub fn element_attributes(&self, element: &str) -> Option<&HashMap<String, AttributeDeclaration>> {
        self.elements.get(element).map(|e| &e.attributes)
    }

    pub fn default_attributes(&self, element: &str) -> Vec<(String, String)> {
        match self.elements.get(element) {
            Some(info) => info
                .attributes
                .values()
                .filter_map(|d| d.default_value.clone().map(|v| (d.name.clone(), v)))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn validate_attributes(&self, element: &str, present: &[(String, String)]) -> Result<()> {
        match self.elements.get(element) {
            Some(info) => crate::grammar::check_attribute_uses(element, &info.attributes, present),
            None => Ok(()),
        }
    }

    pub fn validate_element(&self, element: &str, children: &[Vec<u8>]) -> Result<()> {
        let info = match self.elements.get(element) {
            Some(info) => info,
            None => return Ok(()),
        };
        let mut pattern = info.content.clone();
        for child in children {
            let mut visited = HashSet::new();
            pattern = pattern.derivative(child, &self.defines, &mut visited);
            if matches!(pattern, Pattern::NotAllowed) {
                return Err(Error::ContentModelViolation(format!(
                    "element {:?} not allowed here per the loaded RelaxNG pattern",
                    String::from_utf8_lossy(child)
                )));
            }
        }
        let mut visited = HashSet::new();
        if pattern.nullable(&self.defines, &mut visited) {
            Ok(())
        } else {
            Err(Error::ContentModelViolation(format!(
                "content of <{}> does not satisfy the RelaxNG pattern",
                element
            )))
        }
    }

    pub fn parse_file(path: &Path) -> Result<Self> {
        let bytes = crate::path::read_to_vec(path)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::MalformedGrammar(format!("RNG is not valid UTF-8: {}", e)))?;
        Self::parse_str(text)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        let mut buf = Vec::new();
        let mut grammar = RngGrammar::default();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.name().local_name().as_ref() == b"define" => {
                    if let Some(name) = attr(e, b"name") {
                        let pattern = parse_pattern_sequence(&mut reader, &mut buf, b"define", &mut grammar)?;
                        grammar.defines.insert(name, pattern);
                    }
                }
                Event::Start(ref e) if e.name().local_name().as_ref() == b"element" => {
                    if let Some(name) = attr(e, b"name") {
                        parse_top_level_element(&mut reader, &mut buf, &name, &mut grammar)?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(grammar)
    }
}

fn attr(e: &crate::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Parses a top-level `<element name="...">` into the grammar's element
/// table: its attribute children (with `a:defaultValue` collected) become
/// `attributes`, and the remaining pattern (references, groups, nested
/// elements collapsed to their own `Element` leaves) becomes `content`.
fn parse_top_level_element(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    name: &str,
    grammar: &mut RngGrammar,
) -> Result<()> {
    let mut attributes = HashMap::new();
    let content = parse_pattern_sequence_collecting_attributes(
        reader,
        buf,
        b"element",
        grammar,
        &mut attributes,
    )?;
    grammar
        .elements
        .insert(name.to_string(), ElementInfo { content, attributes });
    Ok(())
}

fn parse_pattern_sequence(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    closing_name: &[u8],
    grammar: &mut RngGrammar,
) -> Result<Pattern> {
    let mut ignored = HashMap::new();
    parse_pattern_sequence_collecting_attributes(reader, buf, closing_name, grammar, &mut ignored)
}

/// Parses a run of sibling RNG pattern elements up to `closing_name`'s end
/// tag, nested `<attribute>` children are collected into `attributes`
/// rather than becoming part of the returned content pattern (attributes
/// never occupy a position in the element-name derivative stream).
fn parse_pattern_sequence_collecting_attributes(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    closing_name: &[u8],
    grammar: &mut RngGrammar,
    attributes: &mut HashMap<String, AttributeDeclaration>,
) -> Result<Pattern> {
    let mut members = Vec::new();
    let mut depth = 0u32;
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(ref e) => {
                let local = e.name().local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"attribute" => {
                        let decl = parse_attribute_pattern(reader, buf, e)?;
                        attributes.insert(decl.name.clone(), decl);
                    }
                    b"element" => {
                        if let Some(name) = attr(e, b"name") {
                            parse_top_level_element(reader, buf, &name, grammar)?;
                            members.push(Pattern::Element { name: name.into_bytes() });
                        } else {
                            skip_to_end(reader, buf, b"element")?;
                        }
                    }
                    b"group" => {
                        members.push(parse_pattern_sequence(reader, buf, b"group", grammar)?);
                    }
                    b"choice" => {
                        members.push(Pattern::Choice(parse_pattern_children(
                            reader, buf, b"choice", grammar,
                        )?));
                    }
                    b"interleave" => {
                        members.push(Pattern::Interleave(parse_pattern_children(
                            reader, buf, b"interleave", grammar,
                        )?));
                    }
                    b"oneOrMore" => {
                        let inner = parse_pattern_sequence(reader, buf, b"oneOrMore", grammar)?;
                        members.push(Pattern::OneOrMore(Box::new(inner)));
                    }
                    b"zeroOrMore" => {
                        let inner = parse_pattern_sequence(reader, buf, b"zeroOrMore", grammar)?;
                        members.push(Pattern::Choice(vec![
                            Pattern::OneOrMore(Box::new(inner)),
                            Pattern::Empty,
                        ]));
                    }
                    b"optional" => {
                        let inner = parse_pattern_sequence(reader, buf, b"optional", grammar)?;
                        members.push(Pattern::Choice(vec![inner, Pattern::Empty]));
                    }
                    b"text" | b"value" | b"data" => {
                        members.push(Pattern::Text);
                        skip_to_end(reader, buf, &local)?;
                    }
                    _ => {
                        depth += 1;
                    }
                }
            }
            Event::Empty(ref e) => {
                let local = e.name().local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"ref" => {
                        if let Some(name) = attr(e, b"name") {
                            members.push(Pattern::Ref(name));
                        }
                    }
                    b"attribute" => {
                        if let Some(name) = attr(e, b"name") {
                            attributes.insert(
                                name.clone(),
                                AttributeDeclaration {
                                    name,
                                    datatype: AttributeType::CData,
                                    use_: AttributeUse::Optional,
                                    default_value: None,
                                    fixed_value: None,
                                },
                            );
                        }
                    }
                    b"text" | b"empty" => members.push(Pattern::Text),
                    b"notAllowed" => members.push(Pattern::NotAllowed),
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if depth == 0 && e.name().local_name().as_ref() == closing_name {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(Pattern::Group(members))
}

fn parse_pattern_children(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    closing_name: &[u8],
    grammar: &mut RngGrammar,
) -> Result<Vec<Pattern>> {
    match parse_pattern_sequence(reader, buf, closing_name, grammar)? {
        Pattern::Group(members) => Ok(members),
        other => Ok(vec![other]),
    }
}

/// Parses an `<attribute name="...">` element, including an `a:defaultValue`
/// child if present (the RNG DTD-compatibility annotation namespace),
/// consuming through its matching `</attribute>`.
fn parse_attribute_pattern(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    start: &crate::events::BytesStart<'_>,
) -> Result<AttributeDeclaration> {
    let name = attr(start, b"name").unwrap_or_default();
    let mut default_value = None;
    let mut depth = 0u32;
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(ref e) => {
                if e.name().local_name().as_ref() == b"defaultValue" {
                    if let Ok(Event::Text(text)) = reader.read_event_into(buf) {
                        default_value = Some(String::from_utf8_lossy(text.raw()).into_owned());
                    }
                } else {
                    depth += 1;
                }
            }
            Event::End(ref e) => {
                if depth == 0 && e.name().local_name().as_ref() == b"attribute" {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(AttributeDeclaration {
        name,
        datatype: AttributeType::CData,
        use_: AttributeUse::Optional,
        default_value,
        fixed_value: None,
    })
}

fn skip_to_end(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>, closing_name: &[u8]) -> Result<()> {
    let mut depth = 0u32;
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(_) => depth += 1,
            Event::End(ref e) => {
                if depth == 0 && e.name().local_name().as_ref() == closing_name {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}
