//! Input discovery: a single PDF or a directory of PDFs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// File extensions picked up from directories (compared case-insensitively).
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Resolve `source` into an ordered list of documents.
///
/// A file is returned as-is. A directory is listed non-recursively: hidden
/// entries and non-files are skipped, only PDF extensions are kept, and the
/// result is sorted by path so runs are reproducible.
pub fn discover<P: AsRef<Path>>(source: P) -> Result<Vec<PathBuf>> {
    let source = source.as_ref();
    if !source.exists() {
        return Err(Error::SourceNotFound(source.to_path_buf()));
    }
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(source)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) && has_pdf_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        log::warn!("Did not find any .pdf files in {}", source.display());
    } else {
        log::info!("Found {} PDF files in {}", paths.len(), source.display());
    }
    Ok(paths)
}

/// Document title used in task metadata: the file stem.
pub fn document_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PDF_EXTENSIONS.iter().any(|p| p.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", ".hidden.pdf", "notes.txt"] {
            fs::write(dir.path().join(name), b"%PDF-1.4\n").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let paths = discover(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        fs::write(&file, b"anything").unwrap();

        assert_eq!(discover(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_discover_missing() {
        let result = discover("/no/such/folder");
        assert!(matches!(result, Err(Error::SourceNotFound(_))));
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_document_title() {
        assert_eq!(document_title(Path::new("/tmp/paper.v2.pdf")), "paper.v2");
    }
}
