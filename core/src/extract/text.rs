use std::borrow::Cow;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use super::{has_extension, ExtractedDocument, Extractor};
use crate::error::ScanError;

/// Plain `.txt` files. The first non-empty line is the title; every line
/// after it is a body block.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports_file(&self, path: &Path) -> bool {
        has_extension(path, "txt")
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ScanError> {
        let bytes = std::fs::read(path).map_err(|source| ScanError::Unreadable { path: path.to_path_buf(), source })?;
        let text = decode(&bytes);

        let mut lines = text.lines();
        let title = lines
            .by_ref()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .unwrap_or_default();
        let blocks = lines.map(str::to_string).collect();

        tracing::trace!(path = %path.display(), %title, "extracted text document");
        Ok(ExtractedDocument { path: path.to_path_buf(), title, blocks })
    }
}

/// UTF-8 (with or without a byte-order mark), else Windows-1252.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_line_is_title_rest_is_body() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cake.txt");
        fs::write(&path, "\n  Cake  \r\n2 cups sugar\r\n1 tsp salt\n").unwrap();

        let doc = TextExtractor.extract(&path).unwrap();
        assert_eq!(doc.title, "Cake");
        assert_eq!(doc.blocks, vec!["2 cups sugar", "1 tsp salt"]);
        assert_eq!(doc.path, path);
    }

    #[test]
    fn byte_order_mark_is_not_part_of_title() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.txt");
        fs::write(&path, "\u{FEFF}Cake\nsugar\n").unwrap();

        let doc = TextExtractor.extract(&path).unwrap();
        assert_eq!(doc.title, "Cake");
        assert_eq!(doc.blocks, vec!["sugar"]);
    }

    #[test]
    fn non_utf8_falls_back_to_windows_1252() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("salsa.txt");
        fs::write(&path, b"Salsa\n2 jalape\xf1o peppers\n").unwrap();

        let doc = TextExtractor.extract(&path).unwrap();
        assert_eq!(doc.blocks, vec!["2 jalape\u{f1}o peppers"]);
    }

    #[test]
    fn empty_file_has_empty_title() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        let doc = TextExtractor.extract(&path).unwrap();
        assert_eq!(doc.title, "");
        assert!(doc.blocks.is_empty());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = TextExtractor.extract(Path::new("/nonexistent/recipe.txt")).unwrap_err();
        assert!(matches!(err, ScanError::Unreadable { .. }));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(TextExtractor.supports_file(Path::new("a/B.TXT")));
        assert!(!TextExtractor.supports_file(Path::new("a/b.doc")));
        assert!(!TextExtractor.supports_file(Path::new("a/txt")));
    }
}
