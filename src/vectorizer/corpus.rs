use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vectorizer::term::TermFrequency;

/// Per-term statistics gathered over a fit corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    /// documents containing the term
    pub doc_freq: u64,
    /// occurrences across all documents
    pub total: u64,
}

/// Corpus
/// Keeps the document count and per-term statistics needed for
/// vocabulary pruning and IDF. Document text is never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    doc_num: u64,
    term_stats: IndexMap<Box<str>, TermStats>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document's term counts
    pub fn add_doc(&mut self, doc: &TermFrequency) {
        self.doc_num += 1;
        for (term, count) in doc.iter() {
            if !self.term_stats.contains_key(term) {
                self.term_stats.insert(term.into(), TermStats::default());
            }
            if let Some(stats) = self.term_stats.get_mut(term) {
                stats.doc_freq += 1;
                stats.total += count;
            }
        }
    }

    /// Get the number of documents in the corpus
    #[inline]
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Number of documents containing `term`
    #[inline]
    pub fn get_doc_freq(&self, term: &str) -> u64 {
        self.term_stats.get(term).map_or(0, |s| s.doc_freq)
    }

    /// Number of distinct terms seen
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_stats.len()
    }

    /// Terms surviving document-frequency bounds and the size cap,
    /// in lexicographic order.
    ///
    /// A term is kept when `min_df <= df <= max_df_count`. If more than
    /// `max_features` survive, the highest corpus totals win and ties go
    /// to the lexicographically smaller term.
    pub fn prune(&self, min_df: u64, max_df_count: f64, max_features: Option<usize>) -> Vec<Box<str>> {
        let mut kept: Vec<(&Box<str>, u64)> = self
            .term_stats
            .iter()
            .filter(|(_, s)| s.doc_freq >= min_df && s.doc_freq as f64 <= max_df_count)
            .map(|(t, s)| (t, s.total))
            .collect();

        if let Some(limit) = max_features {
            if kept.len() > limit {
                kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                kept.truncate(limit);
            }
        }

        let mut terms: Vec<Box<str>> = kept.into_iter().map(|(t, _)| t.clone()).collect();
        terms.sort();
        terms
    }
}
