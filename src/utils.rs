//! Test-only helpers. Not part of the public API.

use std::fmt;

/// Wraps a byte slice so `assert_eq!`/`Debug` failures print it as a
/// `b"..."` literal with non-printable bytes escaped, instead of a raw
/// `[u8]` slice dump.
#[derive(PartialEq, Eq)]
pub(crate) struct Bytes<'a>(pub &'a [u8]);

impl<'a> fmt::Debug for Bytes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b\"")?;
        for &b in self.0 {
            match b {
                b'\t' => write!(f, "\\t")?,
                b'\n' => write!(f, "\\n")?,
                b'\r' => write!(f, "\\r")?,
                b'\\' => write!(f, "\\\\")?,
                b'"' => write!(f, "\\\"")?,
                0x20..=0x7e => write!(f, "{}", b as char)?,
                _ => write!(f, "\\x{:02x}", b)?,
            }
        }
        write!(f, "\"")
    }
}
