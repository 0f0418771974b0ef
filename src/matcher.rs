use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::Category;
use crate::error::{Error, Result};
use crate::text::Normalizer;

/// Article offered for one category by an article source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateArticle {
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub url: String,
    pub section: String,
    pub subsection: String,
    /// descriptor, organization and person facets
    pub entity_facets: Vec<String>,
}

impl CandidateArticle {
    /// Every textual field, space-joined.
    pub fn text(&self) -> String {
        let mut fields = vec![
            self.title.as_str(),
            self.summary.as_str(),
            self.section.as_str(),
            self.subsection.as_str(),
        ];
        fields.extend(self.entity_facets.iter().map(String::as_str));
        fields.join(" ")
    }
}

/// `1 - |a ∩ b| / |a ∪ b|`, and 1.0 when both sets are empty.
pub fn jaccard_distance(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 1.0;
    }
    1.0 - intersection as f64 / union as f64
}

/// A candidate that passed validation, with its token set.
#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    /// position in the original candidate list
    pub index: usize,
    pub article: &'a CandidateArticle,
    pub tokens: BTreeSet<String>,
}

/// Candidates with usable text, plus the number rejected.
#[derive(Debug, Clone)]
pub struct ValidatedPool<'a> {
    pub valid: Vec<ScoredCandidate<'a>>,
    pub rejected: usize,
}

/// Closest candidate and its distance.
#[derive(Debug, Clone, Copy)]
pub struct ArticleMatch<'a> {
    pub index: usize,
    pub article: &'a CandidateArticle,
    pub distance: f64,
}

/// Article Matcher
/// Picks the candidate whose vocabulary is nearest to the user's by
/// Jaccard distance. Ties go to the earliest candidate.
#[derive(Debug, Clone)]
pub struct ArticleMatcher {
    normalizer: Normalizer,
}

impl Default for ArticleMatcher {
    fn default() -> Self {
        Self::new(Normalizer::matching())
    }
}

impl ArticleMatcher {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Tokenize every candidate and set aside those with no tokens.
    pub fn validate<'a>(&self, candidates: &'a [CandidateArticle]) -> ValidatedPool<'a> {
        let mut valid = Vec::with_capacity(candidates.len());
        let mut rejected = 0;
        for (index, article) in candidates.iter().enumerate() {
            let tokens = self.normalizer.token_set(&article.text());
            if tokens.is_empty() {
                rejected += 1;
                continue;
            }
            valid.push(ScoredCandidate { index, article, tokens });
        }
        ValidatedPool { valid, rejected }
    }

    /// Nearest candidate to `user_tokens`.
    /// Fails with [`Error::EmptyCandidatePool`] when no candidate has usable text.
    pub fn best_match<'a>(
        &self,
        category: Category,
        user_tokens: &BTreeSet<String>,
        candidates: &'a [CandidateArticle],
    ) -> Result<ArticleMatch<'a>> {
        let pool = self.validate(candidates);
        if pool.rejected > 0 {
            debug!(%category, rejected = pool.rejected, kept = pool.valid.len(), "skipped candidates without text");
        }

        let mut best: Option<ArticleMatch<'a>> = None;
        for cand in &pool.valid {
            let distance = jaccard_distance(user_tokens, &cand.tokens);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(ArticleMatch { index: cand.index, article: cand.article, distance });
            }
        }
        best.ok_or(Error::EmptyCandidatePool { category })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn article(title: &str) -> CandidateArticle {
        CandidateArticle { title: title.to_string(), ..CandidateArticle::default() }
    }

    #[test]
    fn jaccard_bounds_identity_and_symmetry() {
        let sets = [set(&["cat"]), set(&["cat", "dog"]), set(&["fish"]), set(&[])];
        for a in &sets {
            for b in &sets {
                let d = jaccard_distance(a, b);
                assert!((0.0..=1.0).contains(&d));
                assert_eq!(d, jaccard_distance(b, a));
            }
            if !a.is_empty() {
                assert_eq!(jaccard_distance(a, a), 0.0);
            }
        }
        assert_eq!(jaccard_distance(&set(&["cat"]), &set(&["cat", "dog"])), 0.5);
    }

    #[test]
    fn both_empty_is_maximal() {
        assert_eq!(jaccard_distance(&set(&[]), &set(&[])), 1.0);
    }

    #[test]
    fn selects_minimum_distance() {
        let matcher = ArticleMatcher::default();
        let candidates = vec![article("cat"), article("cat dog"), article("fish")];
        let m = matcher.best_match(Category::Science, &set(&["cat", "dog"]), &candidates).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.distance, 0.0);
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let matcher = ArticleMatcher::default();
        let candidates = vec![article("cat bird"), article("cat fish")];
        let m = matcher.best_match(Category::Science, &set(&["cat"]), &candidates).unwrap();
        assert_eq!(m.index, 0);
    }

    #[test]
    fn capitalized_stop_words_take_part_in_matching() {
        let matcher = ArticleMatcher::default();
        let user = matcher.normalizer().token_set("The Who tour");
        assert_eq!(user, set(&["The", "Who", "tour"]));

        let candidates = vec![article("Who cares"), article("The Who")];
        let m = matcher.best_match(Category::Arts, &user, &candidates).unwrap();
        assert_eq!(m.index, 1);
        assert!((m.distance - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn candidates_without_text_are_never_selected() {
        let matcher = ArticleMatcher::default();
        let candidates = vec![article("!!! 42"), article("the of"), article("weather")];
        let pool = matcher.validate(&candidates);
        assert_eq!(pool.rejected, 2);

        let m = matcher.best_match(Category::NY, &set(&[]), &candidates).unwrap();
        assert_eq!(m.index, 2);
        assert_eq!(m.distance, 1.0);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let matcher = ArticleMatcher::default();
        let err = matcher.best_match(Category::Travel, &set(&["cat"]), &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyCandidatePool { category: Category::Travel }));

        let degenerate = vec![article("...")];
        assert!(matcher.best_match(Category::Travel, &set(&["cat"]), &degenerate).is_err());
    }

    #[test]
    fn candidate_tokens_cover_all_fields() {
        let a = CandidateArticle {
            title: "Mets rally".into(),
            summary: "A late comeback".into(),
            url: "https://example.com/mets".into(),
            section: "Sports".into(),
            subsection: "baseball".into(),
            entity_facets: vec!["New York Mets".into()],
        };
        let tokens = ArticleMatcher::default().normalizer().token_set(&a.text());
        for w in ["Mets", "rally", "late", "comeback", "Sports", "baseball", "New", "York"] {
            assert!(tokens.contains(w), "missing {w}");
        }
        assert!(!tokens.contains("https"));
    }
}
