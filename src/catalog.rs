//! Catalog resolver: maps PUBLIC/SYSTEM identifiers and URI hints to local
//! filesystem paths.
//!
//! The catalog file is itself XML, so parsing it reuses the core reader
//! directly (the same bootstrapping trick `NamespaceResolver` needs
//! internally) rather than a separate hand-rolled XML reader.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::events::Event;
use crate::path::resolve_reference;
use crate::reader::Reader;

/// A single entry of a catalog file, in the order it appeared.
#[derive(Clone, Debug)]
pub enum CatalogEntry {
    Public { public_id: String, uri: String },
    System { system_id: String, uri: String },
    Uri { name: String, uri: String },
    RewriteSystem { start: String, prefix: String },
    RewriteUri { start: String, prefix: String },
    NextCatalog { path: PathBuf },
}

/// An ordered list of catalog entries, all `uri` values already resolved
/// relative to the catalog file's own directory.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn empty() -> Self {
        Catalog { entries: Vec::new() }
    }

    /// Parses a catalog file at `path`. Entries' `uri`/`catalog` attributes
    /// are resolved relative to `path`'s parent directory.
    pub fn parse_file(path: &Path) -> Result<Self> {
        let bytes = crate::path::read_to_vec(path)?;
        Self::parse_bytes(&bytes, path)
    }

    fn parse_bytes(bytes: &[u8], base: &Path) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::MalformedCatalogEntry(format!("catalog is not valid UTF-8: {}", e)))?;
        let mut reader = Reader::from_str(text);
        let mut entries = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let local = e.name().local_name();
                    let attrs: Vec<(Vec<u8>, Vec<u8>)> = e
                        .attributes()
                        .filter_map(|a| a.ok())
                        .map(|a| (a.key.as_ref().to_vec(), a.value.into_owned()))
                        .collect();
                    let get = |key: &[u8]| -> Option<String> {
                        attrs
                            .iter()
                            .find(|(k, _)| k == key)
                            .map(|(_, v)| String::from_utf8_lossy(v).into_owned())
                    };
                    match local.as_ref() {
                        b"public" => {
                            let public_id = get(b"publicId").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<public> missing publicId".into())
                            })?;
                            let uri = get(b"uri").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<public> missing uri".into())
                            })?;
                            entries.push(CatalogEntry::Public { public_id, uri });
                        }
                        b"system" => {
                            let system_id = get(b"systemId").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<system> missing systemId".into())
                            })?;
                            let uri = get(b"uri").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<system> missing uri".into())
                            })?;
                            entries.push(CatalogEntry::System { system_id, uri });
                        }
                        b"uri" => {
                            let name = get(b"name").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<uri> missing name".into())
                            })?;
                            let uri = get(b"uri").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<uri> missing uri".into())
                            })?;
                            entries.push(CatalogEntry::Uri { name, uri });
                        }
                        b"rewriteSystem" => {
                            let start = get(b"systemIdStartString").ok_or_else(|| {
                                Error::MalformedCatalogEntry(
                                    "<rewriteSystem> missing systemIdStartString".into(),
                                )
                            })?;
                            let prefix = get(b"rewritePrefix").ok_or_else(|| {
                                Error::MalformedCatalogEntry(
                                    "<rewriteSystem> missing rewritePrefix".into(),
                                )
                            })?;
                            entries.push(CatalogEntry::RewriteSystem { start, prefix });
                        }
                        b"rewriteURI" => {
                            let start = get(b"uriStartString").ok_or_else(|| {
                                Error::MalformedCatalogEntry(
                                    "<rewriteURI> missing uriStartString".into(),
                                )
                            })?;
                            let prefix = get(b"rewritePrefix").ok_or_else(|| {
                                Error::MalformedCatalogEntry(
                                    "<rewriteURI> missing rewritePrefix".into(),
                                )
                            })?;
                            entries.push(CatalogEntry::RewriteUri { start, prefix });
                        }
                        b"nextCatalog" => {
                            let catalog = get(b"catalog").ok_or_else(|| {
                                Error::MalformedCatalogEntry("<nextCatalog> missing catalog".into())
                            })?;
                            let path = resolve_reference(&catalog, Some(base))?;
                            entries.push(CatalogEntry::NextCatalog { path });
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(e),
            }
            buf.clear();
        }

        // Resolve every `uri`-bearing entry's value relative to the catalog's
        // own directory now, so later lookups need not carry `base` around.
        for entry in &mut entries {
            match entry {
                CatalogEntry::Public { uri, .. }
                | CatalogEntry::System { uri, .. }
                | CatalogEntry::Uri { uri, .. } => {
                    if let Ok(resolved) = resolve_reference(uri, Some(base)) {
                        *uri = resolved.display().to_string();
                    }
                }
                _ => {}
            }
        }

        Ok(Catalog { entries })
    }

    pub fn resolve_public(&self, public_id: &str) -> Option<PathBuf> {
        let mut visited = HashSet::new();
        self.resolve_public_guarded(public_id, &mut visited)
    }

    pub fn resolve_system(&self, system_id: &str) -> Option<PathBuf> {
        let mut visited = HashSet::new();
        self.resolve_system_guarded(system_id, &mut visited)
    }

    pub fn resolve_uri(&self, uri: &str) -> Option<PathBuf> {
        let mut visited = HashSet::new();
        self.resolve_uri_guarded(uri, &mut visited)
    }

    fn resolve_public_guarded(&self, public_id: &str, visited: &mut HashSet<PathBuf>) -> Option<PathBuf> {
        for entry in &self.entries {
            if let CatalogEntry::Public { public_id: p, uri } = entry {
                if p == public_id {
                    log::debug!("catalog: matched publicId {:?} -> {}", public_id, uri);
                    return Some(PathBuf::from(uri));
                }
            }
        }
        self.recurse_next_catalog(visited, |c, v| c.resolve_public_guarded(public_id, v))
    }

    fn resolve_system_guarded(&self, system_id: &str, visited: &mut HashSet<PathBuf>) -> Option<PathBuf> {
        for entry in &self.entries {
            if let CatalogEntry::System { system_id: s, uri } = entry {
                if s == system_id {
                    log::debug!("catalog: matched systemId {:?} -> {}", system_id, uri);
                    return Some(PathBuf::from(uri));
                }
            }
        }
        if let Some(rewritten) = self.longest_prefix_rewrite_system(system_id) {
            log::debug!("catalog: rewrote systemId {:?} -> {}", system_id, rewritten);
            return Some(PathBuf::from(rewritten));
        }
        self.recurse_next_catalog(visited, |c, v| c.resolve_system_guarded(system_id, v))
    }

    fn resolve_uri_guarded(&self, uri: &str, visited: &mut HashSet<PathBuf>) -> Option<PathBuf> {
        for entry in &self.entries {
            if let CatalogEntry::Uri { name, uri: target } = entry {
                if name == uri {
                    log::debug!("catalog: matched uri {:?} -> {}", uri, target);
                    return Some(PathBuf::from(target));
                }
            }
        }
        if let Some(rewritten) = self.longest_prefix_rewrite_uri(uri) {
            log::debug!("catalog: rewrote uri {:?} -> {}", uri, rewritten);
            return Some(PathBuf::from(rewritten));
        }
        self.recurse_next_catalog(visited, |c, v| c.resolve_uri_guarded(uri, v))
    }

    /// Applies the longest matching `rewriteSystem` prefix.
    fn longest_prefix_rewrite_system(&self, system_id: &str) -> Option<String> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                CatalogEntry::RewriteSystem { start, prefix } if system_id.starts_with(start.as_str()) => {
                    Some((start, prefix))
                }
                _ => None,
            })
            .max_by_key(|(start, _)| start.len())
            .map(|(start, prefix)| format!("{}{}", prefix, &system_id[start.len()..]))
    }

    fn longest_prefix_rewrite_uri(&self, uri: &str) -> Option<String> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                CatalogEntry::RewriteUri { start, prefix } if uri.starts_with(start.as_str()) => {
                    Some((start, prefix))
                }
                _ => None,
            })
            .max_by_key(|(start, _)| start.len())
            .map(|(start, prefix)| format!("{}{}", prefix, &uri[start.len()..]))
    }

    /// Recurses into every `nextCatalog` entry not already visited,
    /// guaranteeing termination even if two catalogs name each other.
    fn recurse_next_catalog(
        &self,
        visited: &mut HashSet<PathBuf>,
        mut lookup: impl FnMut(&Catalog, &mut HashSet<PathBuf>) -> Option<PathBuf>,
    ) -> Option<PathBuf> {
        for entry in &self.entries {
            if let CatalogEntry::NextCatalog { path } = entry {
                let normalized = path.canonicalize().unwrap_or_else(|_| path.clone());
                if !visited.insert(normalized) {
                    continue;
                }
                log::debug!("catalog: following nextCatalog {}", path.display());
                if let Ok(next) = Catalog::parse_file(path) {
                    if let Some(found) = lookup(&next, visited) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn resolves_public_and_system_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            "catalog.xml",
            r#"<?xml version="1.0"?>
            <catalog>
                <public publicId="-//EX//DOC//EN" uri="doc.dtd"/>
                <system systemId="urn:doc" uri="doc.dtd"/>
            </catalog>"#,
        );
        let catalog = Catalog::parse_file(&path).unwrap();
        assert_eq!(
            catalog.resolve_public("-//EX//DOC//EN"),
            Some(dir.path().join("doc.dtd"))
        );
        assert_eq!(catalog.resolve_system("urn:doc"), Some(dir.path().join("doc.dtd")));
        assert_eq!(catalog.resolve_system("urn:missing"), None);
    }

    #[test]
    fn rewrite_system_picks_the_longest_matching_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            dir.path(),
            "catalog.xml",
            r#"<catalog>
                <rewriteSystem systemIdStartString="http://example.com/" rewritePrefix="/local/"/>
                <rewriteSystem systemIdStartString="http://example.com/a/" rewritePrefix="/local/a/"/>
            </catalog>"#,
        );
        let catalog = Catalog::parse_file(&path).unwrap();
        assert_eq!(
            catalog.resolve_system("http://example.com/a/x.xsd"),
            Some(PathBuf::from("/local/a/x.xsd"))
        );
        assert_eq!(
            catalog.resolve_system("http://example.com/b/x.xsd"),
            Some(PathBuf::from("/local/b/x.xsd"))
        );
    }

    #[test]
    fn next_catalog_cycle_terminates_instead_of_looping() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.xml");
        let b_path = dir.path().join("b.xml");
        write_catalog(dir.path(), "a.xml", &format!(
            r#"<catalog><nextCatalog catalog="{}"/></catalog>"#,
            b_path.display()
        ));
        write_catalog(dir.path(), "b.xml", &format!(
            r#"<catalog><nextCatalog catalog="{}"/></catalog>"#,
            a_path.display()
        ));
        let catalog = Catalog::parse_file(&a_path).unwrap();
        assert_eq!(catalog.resolve_system("urn:anything"), None);
    }
}
