pub mod stopwords;

use std::collections::{BTreeSet, HashSet};

/// Retweet marker that carries no topical signal.
pub const RETWEET_MARKER: &str = "RT";

/// Text Normalizer
/// Reduces raw text to ASCII-alphabetic tokens of at least two characters.
/// Case is preserved, and stopwords and drop tokens only match exactly, so
/// "The" survives a stopword list that holds "the".
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    stop_words: Option<HashSet<Box<str>>>,
    drop_tokens: HashSet<Box<str>>,
}

impl Normalizer {
    /// Plain normalizer: no stopword or token removal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer for user posts (drops the retweet marker).
    pub fn posts() -> Self {
        Self::new().with_drop_tokens(&[RETWEET_MARKER])
    }

    /// Normalizer used on both sides of article matching. Posts are already
    /// stripped of the retweet marker before they get here, so it is not
    /// dropped from article text.
    pub fn matching() -> Self {
        Self::new().with_stop_words(stopwords::ENGLISH)
    }

    pub fn with_stop_words<T: AsRef<str>>(mut self, words: &[T]) -> Self {
        self.stop_words = Some(words.iter().map(|w| Box::<str>::from(w.as_ref())).collect());
        self
    }

    /// Tokens dropped on exact (case-sensitive) match.
    pub fn with_drop_tokens<T: AsRef<str>>(mut self, tokens: &[T]) -> Self {
        self.drop_tokens.extend(tokens.iter().map(|t| Box::<str>::from(t.as_ref())));
        self
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words
            .as_ref()
            .is_some_and(|sw| sw.contains(token))
    }

    /// Ordered token sequence of `raw`.
    pub fn normalize(&self, raw: &str) -> Vec<String> {
        raw.split(|c: char| !c.is_ascii_alphabetic())
            .filter(|tok| tok.len() > 1)
            .filter(|tok| !self.drop_tokens.contains(*tok))
            .filter(|tok| !self.is_stop_word(tok))
            .map(str::to_string)
            .collect()
    }

    /// Tokens joined by single spaces.
    pub fn normalize_to_string(&self, raw: &str) -> String {
        self.normalize(raw).join(" ")
    }

    /// De-duplicated token set, ordered for deterministic iteration.
    pub fn token_set(&self, raw: &str) -> BTreeSet<String> {
        self.normalize(raw).into_iter().collect()
    }

    /// Add the tokens of `raw` to an existing set.
    pub fn extend_token_set(&self, set: &mut BTreeSet<String>, raw: &str) {
        set.extend(self.normalize(raw));
    }
}
