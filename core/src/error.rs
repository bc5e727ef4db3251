use std::path::PathBuf;
use thiserror::Error;

use crate::index::DocId;

/// Per-file extraction failure. Always recovered by the index builder.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl ScanError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ScanError::Malformed { path: path.into(), reason: reason.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            ScanError::Unreadable { path, .. } | ScanError::Malformed { path, .. } => path,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is not a directory")]
    InvalidRoot(PathBuf),

    #[error("document {0} is not part of this index generation")]
    NotFound(DocId),

    #[error("index build cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt index: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;
