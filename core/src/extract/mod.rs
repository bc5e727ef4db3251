//! Pluggable per-file-type text extraction.

use std::path::{Path, PathBuf};

use crate::error::ScanError;

pub mod text;
pub mod word;

pub use text::TextExtractor;
pub use word::WordExtractor;

/// Text pulled out of one file: a title for display and the blocks to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub path: PathBuf,
    pub title: String,
    pub blocks: Vec<String>,
}

impl ExtractedDocument {
    /// Title from the first non-empty block, every block indexed.
    pub fn from_blocks(path: impl Into<PathBuf>, blocks: Vec<String>) -> Self {
        let title = first_non_empty(blocks.iter().map(String::as_str)).unwrap_or_default();
        Self { path: path.into(), title, blocks }
    }
}

/// First non-empty item, trimmed.
pub(crate) fn first_non_empty<'a>(mut items: impl Iterator<Item = &'a str>) -> Option<String> {
    items.find(|s| !s.trim().is_empty()).map(|s| s.trim().to_string())
}

/// Case-insensitive extension test shared by the bundled extractors.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

pub trait Extractor: Send + Sync {
    /// Short label used in diagnostics.
    fn name(&self) -> &'static str;

    fn supports_file(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ScanError>;
}

/// Ordered set of extractors. Every extractor claiming a file is run.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
            .with(WordExtractor)
            .with(TextExtractor)
    }
}

impl ExtractorRegistry {
    /// A registry with no extractors.
    pub fn new() -> Self {
        Self { extractors: Vec::new() }
    }

    pub fn with(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn supports_file(&self, path: &Path) -> bool {
        self.extractors.iter().any(|e| e.supports_file(path))
    }

    /// Run every extractor that claims `path`, in registration order.
    /// Successes and failures are both returned; neither short-circuits.
    pub fn extract_all(&self, path: &Path) -> (Vec<ExtractedDocument>, Vec<ScanError>) {
        let mut docs = Vec::new();
        let mut errors = Vec::new();
        for extractor in self.extractors.iter().filter(|e| e.supports_file(path)) {
            tracing::debug!(extractor = extractor.name(), path = %path.display(), "scanning file");
            match extractor.extract(path) {
                Ok(doc) => docs.push(doc),
                Err(err) => errors.push(err),
            }
        }
        (docs, errors)
    }
}
