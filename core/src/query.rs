use serde::Serialize;
use std::path::PathBuf;

use crate::index::{DocId, Posting, SealedIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Shorter queries return nothing without touching the index.
    pub min_query_chars: usize,
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { min_query_chars: 2, max_results: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub path: PathBuf,
    pub title: String,
    /// Sum of the query terms' frequencies in the document.
    pub score: u32,
}

/// Evaluate `query` conjunctively: a document matches only if it contains
/// every query term. Hits are ordered by descending score, then doc id.
pub fn search(index: &SealedIndex, query: &str, opts: &SearchOptions) -> Vec<SearchHit> {
    if query.chars().count() < opts.min_query_chars {
        return Vec::new();
    }

    let mut terms: Vec<String> = Vec::new();
    for term in index.tokenizer().tokenize(query) {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    if terms.is_empty() {
        return Vec::new();
    }

    let mut lists: Vec<&[Posting]> = terms.iter().map(|t| index.index().postings_for(t)).collect();
    if lists.iter().any(|l| l.is_empty()) {
        tracing::debug!(query, "search found 0 hits");
        return Vec::new();
    }
    lists.sort_by_key(|l| l.len());

    let Some((shortest, rest)) = lists.split_first() else {
        return Vec::new();
    };
    let mut scored: Vec<(DocId, u32)> = shortest
        .iter()
        .filter_map(|p| {
            let mut score = p.frequency;
            for list in rest {
                let i = list.binary_search_by_key(&p.doc_id, |q| q.doc_id).ok()?;
                score += list[i].frequency;
            }
            Some((p.doc_id, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let total_hits = scored.len();
    scored.truncate(opts.max_results);
    tracing::debug!(query, total_hits, "search complete");

    scored
        .into_iter()
        .filter_map(|(doc_id, score)| match index.document(doc_id) {
            Ok(meta) => Some(SearchHit { doc_id, path: meta.path.clone(), title: meta.title.clone(), score }),
            Err(err) => {
                tracing::error!(doc_id, error = %err, "posting references unknown document");
                debug_assert!(false, "posting references unknown document {doc_id}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuildContext;
    use crate::extract::ExtractedDocument;
    use crate::tokenizer::Tokenizer;
    use std::path::Path;

    /// Blocks are given one per line.
    fn index_of(docs: &[(&str, &str, &str)]) -> SealedIndex {
        let mut ctx = BuildContext::new(Tokenizer::default());
        for (path, title, blocks) in docs {
            let doc = ExtractedDocument {
                path: PathBuf::from(path),
                title: title.to_string(),
                blocks: blocks.lines().map(str::to_string).collect(),
            };
            ctx.add_document(Path::new(path), &[doc]);
        }
        ctx.seal().unwrap()
    }

    #[test]
    fn requires_every_term() {
        let idx = index_of(&[
            ("/r/a.txt", "Cake", "2 cups sugar\n1 tsp salt"),
            ("/r/b.txt", "Pie", "1 cup sugar"),
        ]);
        let hits = search(&idx, "sugar salt", &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Cake");
        assert_eq!(hits[0].score, 2);
    }

    #[test]
    fn ranks_by_frequency_then_doc_id() {
        let idx = index_of(&[
            ("/r/a.txt", "A", "salt"),
            ("/r/b.txt", "B", "salt salt salt"),
            ("/r/c.txt", "C", "salt"),
        ]);
        let hits = search(&idx, "salt", &SearchOptions::default());
        let order: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(order, vec![1, 0, 2]);
        assert_eq!(hits[0].score, 3);
    }

    #[test]
    fn short_and_blank_queries_are_empty() {
        let idx = index_of(&[("/r/a.txt", "A", "a b c")]);
        let opts = SearchOptions::default();
        assert!(search(&idx, "", &opts).is_empty());
        assert!(search(&idx, "a", &opts).is_empty());
        assert!(search(&idx, "     ", &opts).is_empty());
        assert_eq!(search(&idx, "a ", &opts).len(), 1);
    }

    #[test]
    fn repeated_query_terms_count_once() {
        let idx = index_of(&[("/r/a.txt", "A", "rice rice")]);
        let hits = search(&idx, "rice RICE", &SearchOptions::default());
        assert_eq!(hits[0].score, 2);
    }

    #[test]
    fn results_are_capped() {
        let docs: Vec<(String, String)> = (0..20).map(|i| (format!("/r/{i}.txt"), format!("T{i}"))).collect();
        let mut ctx = BuildContext::new(Tokenizer::default());
        for (path, title) in &docs {
            let doc = ExtractedDocument { path: path.into(), title: title.clone(), blocks: vec!["egg".into()] };
            ctx.add_document(Path::new(path), &[doc]);
        }
        let idx = ctx.seal().unwrap();
        let hits = search(&idx, "egg", &SearchOptions { min_query_chars: 2, max_results: 5 });
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[4].doc_id, 4);
    }
}
