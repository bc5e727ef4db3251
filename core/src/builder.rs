use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::extract::{first_non_empty, ExtractedDocument, ExtractorRegistry};
use crate::index::{DocId, IndexWriter, SealedIndex};
use crate::store::DocumentStore;
use crate::tokenizer::Tokenizer;

/// Per-run counters reported alongside a sealed index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Regular files visited.
    pub scanned: usize,
    /// Files that became documents.
    pub indexed: usize,
    /// Files no extractor claimed.
    pub skipped: usize,
    /// Files every claiming extractor failed on.
    pub failed: usize,
}

/// Mutable state of one in-progress build. Only [`BuildContext::seal`] lets
/// anything out.
#[derive(Debug)]
pub struct BuildContext {
    store: DocumentStore,
    writer: IndexWriter,
    tokenizer: Tokenizer,
}

impl BuildContext {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { store: DocumentStore::new(), writer: IndexWriter::new(), tokenizer }
    }

    /// Register one file and index the blocks of every extraction of it.
    /// The title comes from the first extraction that has one.
    pub fn add_document(&mut self, path: &Path, extracted: &[ExtractedDocument]) -> DocId {
        let title = first_non_empty(extracted.iter().map(|d| d.title.as_str())).unwrap_or_default();
        let doc_id = self.store.register(path, title);
        for block in extracted.iter().flat_map(|d| d.blocks.iter()) {
            for term in self.tokenizer.tokenize(block) {
                self.writer.add_occurrence(&term, doc_id);
            }
        }
        doc_id
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn seal(self) -> Result<SealedIndex> {
        let num_docs = self.store.len() as u32;
        let num_terms = self.writer.num_terms();
        let index = self.writer.finish(num_docs);
        tracing::info!(num_docs, num_terms, "sealed index generation");
        SealedIndex::from_parts(index, self.store, self.tokenizer)
    }
}

/// Walks a directory tree and builds one sealed index generation from it.
pub struct IndexBuilder {
    registry: ExtractorRegistry,
    tokenizer: Tokenizer,
    cancel: Option<Arc<AtomicBool>>,
}

impl IndexBuilder {
    pub fn new(registry: ExtractorRegistry) -> Self {
        Self { registry, tokenizer: Tokenizer::default(), cancel: None }
    }

    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Checked between files; once set, the build stops with [`Error::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Index every supported file under `root`. Only an invalid root (or
    /// cancellation) fails the build; per-file problems are logged and skipped.
    pub fn build(&self, root: &Path) -> Result<(SealedIndex, BuildStats)> {
        let root = root
            .canonicalize()
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| Error::InvalidRoot(root.to_path_buf()))?;
        tracing::debug!(root = %root.display(), "creating index");

        let mut ctx = BuildContext::new(self.tokenizer);
        let mut stats = BuildStats::default();

        for entry in WalkDir::new(&root).sort_by_file_name() {
            if self.cancelled() {
                tracing::info!(indexed = stats.indexed, "index build cancelled");
                return Err(Error::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping inaccessible entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                tracing::debug!(dir = %entry.path().display(), "scanning directory");
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            stats.scanned += 1;
            let path = entry.path();
            if !self.registry.supports_file(path) {
                tracing::warn!(path = %path.display(), "no extractor for file, skipping");
                stats.skipped += 1;
                continue;
            }

            let (extracted, errors) = self.registry.extract_all(path);
            for err in &errors {
                tracing::warn!(path = %path.display(), error = %err, "could not process file");
            }
            if extracted.is_empty() {
                stats.failed += 1;
                continue;
            }
            ctx.add_document(path, &extracted);
            stats.indexed += 1;
        }

        tracing::info!(
            scanned = stats.scanned,
            indexed = stats.indexed,
            skipped = stats.skipped,
            failed = stats.failed,
            "index build complete"
        );
        Ok((ctx.seal()?, stats))
    }
}

/// Build with the given extractors and the default tokenizer.
pub fn build_index(root: &Path, registry: ExtractorRegistry) -> Result<SealedIndex> {
    IndexBuilder::new(registry).build(root).map(|(index, _)| index)
}
