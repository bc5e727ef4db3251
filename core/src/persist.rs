//! On-disk form of a sealed index generation.
//!
//! ```text
//! <index>/dictionary.bin   term -> term id            (bincode)
//! <index>/postings.bin     term id -> postings        (bincode)
//! <index>/docs.bin         document store + lengths   (bincode)
//! <index>/meta.json        counts, format version, tokenizer
//! ```
//!
//! A generation is written into a staging directory next to the target and
//! renamed into place once complete.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::index::{InvertedIndex, Posting, SealedIndex, TermId};
use crate::store::DocumentStore;
use crate::tokenizer::Tokenizer;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub fold_case: bool,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn dictionary(&self) -> PathBuf { self.root.join("dictionary.bin") }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// Whether a complete generation appears to be present.
    pub fn exists(&self) -> bool {
        self.meta().is_file()
    }

    fn sibling(&self, suffix: &str) -> Result<PathBuf> {
        let name = self.root.file_name().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("index directory {} has no name", self.root.display()),
            ))
        })?;
        let mut name = name.to_os_string();
        name.push(suffix);
        Ok(self.root.with_file_name(name))
    }
}

#[derive(Serialize, Deserialize)]
struct DocsFile {
    store: DocumentStore,
    doc_lengths: Vec<u32>,
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let r = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(r)?)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let json = fs::read_to_string(paths.meta())?;
    Ok(serde_json::from_str(&json)?)
}

fn write_generation(paths: &IndexPaths, sealed: &SealedIndex) -> Result<()> {
    let index = sealed.index();
    write_bin(&paths.dictionary(), &index.dictionary)?;
    write_bin(&paths.postings(), &index.postings)?;
    write_bin(&paths.docs(), &DocsFile { store: sealed.store().clone(), doc_lengths: index.doc_lengths.clone() })?;
    let meta = MetaFile {
        num_docs: index.num_docs,
        num_terms: index.term_count() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        fold_case: sealed.tokenizer().fold_case,
    };
    save_meta(paths, &meta)
}

/// Persist `sealed` to `dir`, replacing any previous generation there.
pub fn save_index<P: AsRef<Path>>(dir: P, sealed: &SealedIndex) -> Result<()> {
    let target = IndexPaths::new(dir);
    let staging = IndexPaths::new(target.sibling(".staging")?);
    let retired = target.sibling(".old")?;

    if staging.root.exists() {
        fs::remove_dir_all(&staging.root)?;
    }
    fs::create_dir_all(&staging.root)?;
    if let Err(err) = write_generation(&staging, sealed) {
        let _ = fs::remove_dir_all(&staging.root);
        return Err(err);
    }

    if target.root.exists() {
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        fs::rename(&target.root, &retired)?;
    }
    fs::rename(&staging.root, &target.root)?;
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }

    tracing::info!(output = %target.root.display(), num_docs = sealed.document_count(), "index persisted");
    Ok(())
}

/// Load and validate a persisted generation.
pub fn load_index<P: AsRef<Path>>(dir: P) -> Result<SealedIndex> {
    let paths = IndexPaths::new(dir);
    let meta = load_meta(&paths)?;
    if meta.version != FORMAT_VERSION {
        return Err(Error::Corrupt(format!("unsupported index format version {}", meta.version)));
    }

    let dictionary: HashMap<String, TermId> = read_bin(&paths.dictionary())?;
    let postings: Vec<Vec<Posting>> = read_bin(&paths.postings())?;
    let docs: DocsFile = read_bin(&paths.docs())?;
    if dictionary.len() != meta.num_terms as usize || postings.len() != dictionary.len() {
        return Err(Error::Corrupt(format!(
            "{} terms in dictionary, {} postings lists, meta says {}",
            dictionary.len(),
            postings.len(),
            meta.num_terms
        )));
    }

    let index = InvertedIndex { dictionary, postings, doc_lengths: docs.doc_lengths, num_docs: meta.num_docs };
    let sealed = SealedIndex::from_parts(index, docs.store, Tokenizer::new(meta.fold_case))?;
    tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, created_at = %meta.created_at, "index loaded");
    Ok(sealed)
}
