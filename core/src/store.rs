use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::index::DocId;

/// Retrievable metadata of one indexed file. Never tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub path: PathBuf,
    pub title: String,
}

/// Documents of one index generation, addressed by dense ids `0..len`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStore {
    docs: Vec<DocMeta>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next sequential id to `path`.
    pub fn register(&mut self, path: impl Into<PathBuf>, title: impl Into<String>) -> DocId {
        let id = self.docs.len() as DocId;
        self.docs.push(DocMeta { path: path.into(), title: title.into() });
        id
    }

    pub fn get(&self, doc_id: DocId) -> Result<&DocMeta> {
        self.docs.get(doc_id as usize).ok_or(Error::NotFound(doc_id))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &DocMeta)> {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId, d))
    }

    pub fn find_path(&self, path: &Path) -> Option<DocId> {
        self.iter().find(|(_, d)| d.path == path).map(|(id, _)| id)
    }
}
