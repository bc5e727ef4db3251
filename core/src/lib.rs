//! Indexing and search core: extract text from files on disk, build an
//! in-memory inverted index over it, persist it, and answer conjunctive
//! term-frequency queries.

pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod persist;
pub mod query;
pub mod store;
pub mod tokenizer;

pub use builder::{build_index, BuildContext, BuildStats, IndexBuilder};
pub use config::Config;
pub use error::{Error, Result, ScanError};
pub use extract::{ExtractedDocument, Extractor, ExtractorRegistry};
pub use index::{DocId, InvertedIndex, IndexWriter, Posting, SealedIndex, TermId};
pub use query::{search, SearchHit, SearchOptions};
pub use store::{DocMeta, DocumentStore};
pub use tokenizer::Tokenizer;
