//! PDF header sniffing.
//!
//! Documents are checked before any backend touches them so that a
//! non-PDF file fails fast with [`Error::DocumentOpen`].

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Some producers put junk before the header; readers accept it within
/// the first kilobyte.
const HEADER_SEARCH_LEN: usize = 1024;

/// Return the PDF version declared in the header of `path`.
pub fn sniff_pdf_version<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::open(path, e))?;
    let mut header = Vec::with_capacity(HEADER_SEARCH_LEN);
    file.by_ref()
        .take(HEADER_SEARCH_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| Error::open(path, e))?;

    pdf_version_from_bytes(&header).ok_or_else(|| Error::open(path, "not a PDF file"))
}

/// Find the `%PDF-x.y` header in `data` and return `x.y`.
pub fn pdf_version_from_bytes(data: &[u8]) -> Option<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_LEN)];
    let start = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)?;
    let version = window.get(start + PDF_MAGIC.len()..start + PDF_MAGIC.len() + VERSION_LEN)?;

    let valid = version[0].is_ascii_digit() && version[1] == b'.' && version[2].is_ascii_digit();
    valid.then(|| String::from_utf8_lossy(version).to_string())
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    pdf_version_from_bytes(data).is_some()
}
