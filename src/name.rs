//! Qualified names and namespace resolution.
//!
//! Names borrow from whatever buffer the event that carries them borrows
//! from, matching the zero-copy style of [`crate::events`].

use std::fmt;

/// A qualified name as it appeared in the document, e.g. `xs:element` or
/// `element`. Never mutated once constructed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a>(&'a [u8]);

impl<'a> QName<'a> {
    #[inline]
    pub fn new(name: &'a [u8]) -> Self {
        QName(name)
    }

    #[inline]
    pub fn as_ref(&self) -> &'a [u8] {
        self.0
    }

    /// Splits `prefix:local` into `(Some(prefix), local)`, or `(None, name)`
    /// if there is no colon. A name may contain at most one meaningful
    /// colon; a second colon is treated as part of the local name (first
    /// colon wins).
    pub fn decompose(&self) -> (Option<&'a [u8]>, LocalName<'a>) {
        match memchr::memchr(b':', self.0) {
            Some(i) => (Some(&self.0[..i]), LocalName(&self.0[i + 1..])),
            None => (None, LocalName(self.0)),
        }
    }

    #[inline]
    pub fn local_name(&self) -> LocalName<'a> {
        self.decompose().1
    }

    #[inline]
    pub fn prefix(&self) -> Option<Prefix<'a>> {
        self.decompose().0.map(Prefix)
    }
}

impl<'a> fmt::Debug for QName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({:?})", String::from_utf8_lossy(self.0))
    }
}

/// The local part of a (possibly prefixed) name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalName<'a>(&'a [u8]);

impl<'a> LocalName<'a> {
    #[inline]
    pub fn as_ref(&self) -> &'a [u8] {
        self.0
    }
}

impl<'a> fmt::Debug for LocalName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalName({:?})", String::from_utf8_lossy(self.0))
    }
}

/// A namespace prefix, e.g. the `xs` in `xs:element`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix<'a>(&'a [u8]);

impl<'a> Prefix<'a> {
    #[inline]
    pub fn as_ref(&self) -> &'a [u8] {
        self.0
    }
}

/// Outcome of resolving a (possibly prefixed) name against the active
/// namespace bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveResult<'ns> {
    /// Name had a prefix that resolved to this namespace.
    Bound(&'ns [u8]),
    /// Name had no prefix and there is no default namespace in scope, or
    /// attribute lookup (which never inherits the default namespace).
    Unbound,
    /// Name had a prefix that is not declared anywhere in scope.
    Unknown(Vec<u8>),
}

/// Checks whether `bytes` is a valid XML `Name` (at most one colon) and,
/// separately, whether it is a valid `NCName` (no colon at all).
///
/// Uses the full `NameStartChar`/`NameChar` Unicode productions from
/// [`crate::charstream`] against decoded code points, not just an ASCII
/// subset: non-ASCII letters are as valid in the first or later positions
/// as `is_name_start_char`/`is_name_char` say they are.
pub fn is_valid_name(bytes: &[u8]) -> bool {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return false,
    };
    let mut chars = text.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !crate::charstream::is_name_start_char(first) {
        return false;
    }
    let mut colons = u32::from(first == ':');
    for c in chars {
        if c == ':' {
            colons += 1;
            if colons > 1 {
                return false;
            }
            continue;
        }
        if !crate::charstream::is_name_char(c) {
            return false;
        }
    }
    true
}

pub fn is_valid_ncname(bytes: &[u8]) -> bool {
    is_valid_name(bytes) && !bytes.contains(&b':')
}

const XMLNS: &[u8] = b"http://www.w3.org/2000/xmlns/";
const XML_NS: &[u8] = b"http://www.w3.org/XML/1998/namespace";

/// Tracks namespace bindings across a stack of open elements.
///
/// Always active, regardless of whether the caller asked for namespace
/// resolution on the public API: validating a grammar needs qualified
/// names either way.
#[derive(Clone, Default)]
pub struct NamespaceResolver {
    /// Binding stack: one entry per `xmlns[:prefix]` declaration currently
    /// in scope, in declaration order. `prefix` is empty for the default
    /// namespace.
    bindings: Vec<Binding>,
    /// Number of bindings pushed per open element, so `pop` can undo
    /// exactly the bindings a single `startElement` introduced.
    scope_len: Vec<usize>,
}

#[derive(Clone)]
struct Binding {
    prefix: Vec<u8>,
    uri: Vec<u8>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the namespace declarations carried by a start tag's
    /// attributes and opens a new scope. `buffer` is unused by this
    /// in-memory variant but kept in the signature to match the
    /// borrow-into-caller-buffer convention used elsewhere in the reader.
    pub fn push<'a, 'v, I: IntoIterator<Item = (QName<'a>, &'v [u8])>>(
        &mut self,
        attrs: I,
        _buffer: &mut Vec<u8>,
    ) {
        let start = self.bindings.len();
        for (name, value) in attrs {
            let raw = name.as_ref();
            if raw == b"xmlns" {
                self.bindings.push(Binding { prefix: Vec::new(), uri: value.to_vec() });
            } else if let Some(rest) = raw.strip_prefix(b"xmlns:") {
                self.bindings.push(Binding { prefix: rest.to_vec(), uri: value.to_vec() });
            }
        }
        self.scope_len.push(self.bindings.len() - start);
    }

    pub fn pop(&mut self, _buffer: &mut Vec<u8>) {
        if let Some(n) = self.scope_len.pop() {
            let new_len = self.bindings.len().saturating_sub(n);
            self.bindings.truncate(new_len);
        }
    }

    /// Resolves `name` against the currently bound prefixes.
    ///
    /// `element_name` is true for element names (which inherit the default
    /// namespace when unprefixed) and false for attribute names (which do
    /// not — unprefixed attributes are never implicitly qualified).
    ///
    /// The resolved URI borrows from `self` rather than from a caller-owned
    /// buffer: namespace URIs live in the resolver's own binding stack, so
    /// there is nowhere else for the borrow to come from.
    pub fn resolve<'n>(
        &self,
        name: QName<'n>,
        element_name: bool,
    ) -> (ResolveResult<'_>, LocalName<'n>) {
        let (prefix, local) = name.decompose();
        match prefix {
            Some(b"xml") => (ResolveResult::Bound(XML_NS), local),
            Some(b"xmlns") => (ResolveResult::Bound(XMLNS), local),
            Some(p) => match self.lookup(p) {
                Some(uri) => (ResolveResult::Bound(uri), local),
                None => (ResolveResult::Unknown(p.to_vec()), local),
            },
            None => {
                if element_name {
                    match self.lookup(b"") {
                        Some(uri) if !uri.is_empty() => (ResolveResult::Bound(uri), local),
                        _ => (ResolveResult::Unbound, local),
                    }
                } else {
                    (ResolveResult::Unbound, local)
                }
            }
        }
    }

    fn lookup(&self, prefix: &[u8]) -> Option<&[u8]> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_slice())
    }

    /// Finds the namespace URI currently bound for `name`.
    pub fn find(&self, name: QName<'_>) -> ResolveResult<'_> {
        self.resolve(name, true).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_prefixed_name() {
        let q = QName::new(b"xs:element");
        let (prefix, local) = q.decompose();
        assert_eq!(prefix, Some(b"xs".as_ref()));
        assert_eq!(local.as_ref(), b"element");
    }

    #[test]
    fn unprefixed_name_has_no_prefix() {
        let q = QName::new(b"element");
        assert_eq!(q.prefix(), None);
        assert_eq!(q.local_name().as_ref(), b"element");
    }

    #[test]
    fn resolves_declared_prefix() {
        let mut ns = NamespaceResolver::new();
        let mut buf = Vec::new();
        ns.push(
            vec![(QName::new(b"xmlns:x"), b"urn:example".as_ref())],
            &mut buf,
        );
        let (result, local) = ns.resolve(QName::new(b"x:tag"), true);
        assert_eq!(result, ResolveResult::Bound(b"urn:example"));
        assert_eq!(local.as_ref(), b"tag");
    }

    #[test]
    fn unprefixed_attribute_never_inherits_default_namespace() {
        let mut ns = NamespaceResolver::new();
        let mut buf = Vec::new();
        ns.push(
            vec![(QName::new(b"xmlns"), b"urn:default".as_ref())],
            &mut buf,
        );
        let (result, _) = ns.resolve(QName::new(b"attr"), false);
        assert_eq!(result, ResolveResult::Unbound);
    }

    #[test]
    fn pop_undoes_only_its_own_scope() {
        let mut ns = NamespaceResolver::new();
        let mut buf = Vec::new();
        ns.push(vec![(QName::new(b"xmlns:a"), b"urn:a".as_ref())], &mut buf);
        ns.push(vec![(QName::new(b"xmlns:b"), b"urn:b".as_ref())], &mut buf);
        ns.pop(&mut buf);
        assert!(ns.lookup(b"b").is_none());
        assert_eq!(ns.lookup(b"a"), Some(b"urn:a".as_ref()));
    }

    #[test]
    fn name_validation_rejects_multiple_colons() {
        assert!(is_valid_name(b"a:b"));
        assert!(!is_valid_name(b"a:b:c"));
        assert!(!is_valid_name(b""));
        assert!(!is_valid_name(b"1abc"));
    }
}
