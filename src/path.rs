//! Resolution of system identifiers (external subset paths, schema
//! locations, catalog `nextCatalog` entries) to local filesystem paths.
//!
//! Network schemes are rejected outright: this crate never fetches a
//! remote resource.

use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Resolves `reference`, which may be a bare relative/absolute path or a
/// `file://` URI, against `base` (the document containing the reference,
/// or `None` for a reference given directly by the caller).
///
/// Any other URI scheme (`http://`, `https://`, `urn:`, ...) is rejected:
/// this processor never performs network resolution.
pub fn resolve_reference(reference: &str, base: Option<&Path>) -> Result<PathBuf> {
    if let Some(rest) = reference.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if let Some(scheme_end) = reference.find("://") {
        let scheme = &reference[..scheme_end];
        return Err(Error::UnsupportedScheme(scheme.to_string()));
    }

    let candidate = Path::new(reference);
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }
    match base.and_then(Path::parent) {
        Some(dir) => Ok(dir.join(candidate)),
        None => Ok(candidate.to_path_buf()),
    }
}

/// Reads the file at `path`, mapping a missing file to
/// [`Error::FileNotFound`] rather than the generic I/O error
/// `std::fs::read` produces, since callers need to distinguish "not
/// found" (often tolerated for an optional external subset) from other
/// I/O failures.
pub fn read_to_vec(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_relative_path_against_base_directory() {
        let base = Path::new("/docs/main.xml");
        let resolved = resolve_reference("schema/types.xsd", Some(base)).unwrap();
        assert_eq!(resolved, PathBuf::from("/docs/schema/types.xsd"));
    }

    #[test]
    fn resolves_absolute_path_verbatim() {
        let resolved = resolve_reference("/etc/catalog.xml", None).unwrap();
        assert_eq!(resolved, PathBuf::from("/etc/catalog.xml"));
    }

    #[test]
    fn strips_file_scheme() {
        let resolved = resolve_reference("file:///tmp/x.dtd", None).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/x.dtd"));
    }

    #[test]
    fn rejects_network_schemes() {
        let err = resolve_reference("https://example.com/x.xsd", None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(s) if s == "https"));
    }

    #[test]
    fn missing_file_reports_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.xml");
        let err = read_to_vec(&missing).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn existing_file_reads_its_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("present.xml");
        let mut f = std::fs::File::create(&file_path).unwrap();
        f.write_all(b"<a/>").unwrap();
        assert_eq!(read_to_vec(&file_path).unwrap(), b"<a/>");
    }
}
