use serde::{Deserialize, Serialize};

/// Whitespace tokenizer shared by index build and query evaluation.
///
/// Tokens are split on runs of Unicode whitespace and trimmed of stray
/// control characters. Punctuation is kept, so `cups` and `cup` stay distinct
/// terms. With `fold_case` on, terms are lowercased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    pub fold_case: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self { fold_case: true }
    }
}

impl Tokenizer {
    pub fn new(fold_case: bool) -> Self {
        Self { fold_case }
    }

    /// Lazily yield the terms of `text`. Never yields an empty term.
    pub fn tokenize<'a>(&self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        let fold_case = self.fold_case;
        text.split_whitespace()
            .map(|tok| tok.trim_matches(|c: char| c.is_whitespace() || c.is_control()))
            .filter(|tok| !tok.is_empty())
            .map(move |tok| if fold_case { tok.to_lowercase() } else { tok.to_string() })
    }
}
