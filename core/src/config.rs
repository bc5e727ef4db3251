use std::path::PathBuf;

use crate::query::SearchOptions;
use crate::tokenizer::Tokenizer;

/// Environment variable overriding the base settings directory.
pub const HOME_ENV: &str = "RECIPE_INDEX_HOME";

/// Settings shared by the indexer and the query server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the documents to index, if one was configured.
    pub doc_root: Option<PathBuf>,
    /// Directory the sealed index generation is persisted to.
    pub index_dir: PathBuf,
    /// Queries shorter than this many characters return nothing.
    pub min_query_chars: usize,
    pub max_results: usize,
    /// Lowercase terms at build and query time.
    pub fold_case: bool,
}

impl Config {
    /// `$RECIPE_INDEX_HOME`, else `~/.recipe-index`, else `./.recipe-index`.
    pub fn default_base_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .map(|home| home.join(".recipe-index"))
            .unwrap_or_else(|| PathBuf::from(".recipe-index"))
    }

    pub fn new(doc_root: Option<PathBuf>, index_dir: Option<PathBuf>) -> Self {
        Self {
            doc_root,
            index_dir: index_dir.unwrap_or_else(|| Self::default_base_dir().join("index")),
            ..Self::default()
        }
    }

    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.fold_case)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions { min_query_chars: self.min_query_chars, max_results: self.max_results }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = SearchOptions::default();
        Self {
            doc_root: None,
            index_dir: Self::default_base_dir().join("index"),
            min_query_chars: defaults.min_query_chars,
            max_results: defaults.max_results,
            fold_case: true,
        }
    }
}
