use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::store::{DocMeta, DocumentStore};
use crate::tokenizer::Tokenizer;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Occurrences of the term in this document's indexed blocks.
    pub frequency: u32,
}

/// Build-time accumulator. Owned by exactly one in-progress build.
#[derive(Debug, Default)]
pub struct IndexWriter {
    dictionary: HashMap<String, TermId>,
    postings: Vec<Vec<Posting>>,
    doc_lengths: Vec<u32>,
}

impl IndexWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `term` in `doc_id`, creating the term's
    /// postings list and the posting on first sight.
    pub fn add_occurrence(&mut self, term: &str, doc_id: DocId) {
        let tid = match self.dictionary.get(term) {
            Some(&tid) => tid,
            None => {
                let tid = self.postings.len() as TermId;
                self.dictionary.insert(term.to_string(), tid);
                self.postings.push(Vec::new());
                tid
            }
        };
        let plist = &mut self.postings[tid as usize];
        // documents arrive in id order, so this is almost always the last slot
        match plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(i) => plist[i].frequency += 1,
            Err(i) => plist.insert(i, Posting { doc_id, frequency: 1 }),
        }

        let slot = doc_id as usize;
        if self.doc_lengths.len() <= slot {
            self.doc_lengths.resize(slot + 1, 0);
        }
        self.doc_lengths[slot] += 1;
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    /// Freeze the accumulated postings for a generation of `num_docs` documents.
    pub fn finish(mut self, num_docs: u32) -> InvertedIndex {
        self.doc_lengths.resize(num_docs as usize, 0);
        InvertedIndex {
            dictionary: self.dictionary,
            postings: self.postings,
            doc_lengths: self.doc_lengths,
            num_docs,
        }
    }
}

/// Term -> postings mapping. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub(crate) dictionary: HashMap<String, TermId>,
    /// Indexed by term id; each list sorted by doc id.
    pub(crate) postings: Vec<Vec<Posting>>,
    pub(crate) doc_lengths: Vec<u32>,
    pub(crate) num_docs: u32,
}

impl InvertedIndex {
    /// Postings of `term` in doc-id order; empty for unknown terms.
    pub fn postings_for(&self, term: &str) -> &[Posting] {
        self.dictionary
            .get(term)
            .and_then(|&tid| self.postings.get(tid as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn document_count(&self) -> u32 {
        self.num_docs
    }

    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Number of terms indexed for `doc_id`.
    pub fn document_length(&self, doc_id: DocId) -> Option<u32> {
        self.doc_lengths.get(doc_id as usize).copied()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.dictionary.keys().map(String::as_str)
    }

    /// Check the structural invariants a loaded or freshly built index must hold.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.doc_lengths.len() != self.num_docs as usize {
            return Err(Error::Corrupt(format!(
                "{} field lengths for {} documents",
                self.doc_lengths.len(),
                self.num_docs
            )));
        }
        if self.dictionary.len() != self.postings.len() {
            return Err(Error::Corrupt(format!(
                "{} terms in dictionary, {} postings lists",
                self.dictionary.len(),
                self.postings.len()
            )));
        }
        // each postings list belongs to exactly one term
        let mut owned = vec![false; self.postings.len()];
        for (term, &tid) in &self.dictionary {
            let plist = self
                .postings
                .get(tid as usize)
                .ok_or_else(|| Error::Corrupt(format!("term {term:?} has no postings list")))?;
            if std::mem::replace(&mut owned[tid as usize], true) {
                return Err(Error::Corrupt(format!("term id {tid} is shared by several terms")));
            }
            let mut prev: Option<DocId> = None;
            for p in plist {
                if p.doc_id >= self.num_docs {
                    return Err(Error::Corrupt(format!("term {term:?} references missing document {}", p.doc_id)));
                }
                if prev.is_some_and(|d| d >= p.doc_id) {
                    return Err(Error::Corrupt(format!("postings of {term:?} are not sorted and unique")));
                }
                prev = Some(p.doc_id);
            }
        }
        Ok(())
    }
}

/// An inverted index plus its document store, immutable and safe to share
/// between concurrent searchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedIndex {
    index: InvertedIndex,
    store: DocumentStore,
    tokenizer: Tokenizer,
}

impl SealedIndex {
    pub fn from_parts(index: InvertedIndex, store: DocumentStore, tokenizer: Tokenizer) -> Result<Self> {
        if store.len() != index.num_docs as usize {
            return Err(Error::Corrupt(format!(
                "document store holds {} documents, index expects {}",
                store.len(),
                index.num_docs
            )));
        }
        index.validate()?;
        Ok(Self { index, store, tokenizer })
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn tokenizer(&self) -> Tokenizer {
        self.tokenizer
    }

    pub fn document(&self, doc_id: DocId) -> Result<&DocMeta> {
        self.store.get(doc_id)
    }

    pub fn document_count(&self) -> u32 {
        self.index.document_count()
    }
}
