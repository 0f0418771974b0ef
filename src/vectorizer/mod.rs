pub mod corpus;
pub mod term;
pub mod tfidf;

use std::marker::PhantomData;

use indexmap::IndexMap;
use num::Float;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::text::{stopwords, Normalizer};
use crate::utils::sparse::{FeatureMatrix, SparseVec};
use crate::vectorizer::{
    corpus::Corpus,
    term::TermFrequency,
    tfidf::{DefaultTFIDFEngine, TFIDFEngine},
};

/// Options recognized by [`TfidfVectorizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// inclusive word n-gram range (min_n, max_n)
    pub ngram_range: (usize, usize),
    /// vocabulary size cap
    pub max_features: Option<usize>,
    /// minimum number of documents a term must appear in
    pub min_df: u64,
    /// maximum fraction of documents a term may appear in
    pub max_df: f64,
    /// drop English stopwords before building n-grams
    pub stop_words: bool,
    pub lowercase: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_range: (1, 1),
            max_features: Some(10_000),
            min_df: 1,
            max_df: 1.0,
            stop_words: true,
            lowercase: true,
        }
    }
}

impl VectorizerConfig {
    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::InvalidConfig(format!("invalid ngram_range ({min_n}, {max_n})")));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(Error::InvalidConfig(format!("max_df {} must be in (0, 1]", self.max_df)));
        }
        if self.max_features == Some(0) {
            return Err(Error::InvalidConfig("max_features must be positive".to_string()));
        }
        Ok(())
    }
}

/// Frozen result of a fit: vocabulary and IDF weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerState<N = f32>
where
    N: Float,
{
    /// term -> feature position, positions dense in `[0, D)`
    pub vocabulary: IndexMap<Box<str>, u32>,
    /// IDF weight per position
    pub idf: Vec<N>,
    /// documents the state was fit on
    pub doc_num: u64,
}

/// TF-IDF Vectorizer
/// Learns a vocabulary from a corpus and maps text onto fixed-dimension
/// TF-IDF vectors.
///
/// `TfidfVectorizer<N, E>` has the following generic parameters:
/// - `N`: float type of the feature values (f32 or f64)
/// - `E`: weighting engine (see [`TFIDFEngine`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer<N = f32, E = DefaultTFIDFEngine>
where
    N: Float,
{
    config: VectorizerConfig,
    state: Option<VectorizerState<N>>,
    #[serde(skip)]
    _marker: PhantomData<E>,
}

impl<N, E> TfidfVectorizer<N, E>
where
    N: Float + Send + Sync,
    E: TFIDFEngine<N> + Send + Sync,
{
    pub fn new(config: VectorizerConfig) -> Self {
        Self { config, state: None, _marker: PhantomData }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Result<&VectorizerState<N>> {
        self.state.as_ref().ok_or(Error::NotFitted("vectorizer"))
    }

    /// Feature dimension D
    pub fn n_features(&self) -> Result<usize> {
        Ok(self.state()?.vocabulary.len())
    }

    pub fn vocabulary(&self) -> Result<&IndexMap<Box<str>, u32>> {
        Ok(&self.state()?.vocabulary)
    }

    /// Split `text` into the terms the vocabulary is built from.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens: Vec<String> = Normalizer::new()
            .normalize(text)
            .into_iter()
            .map(|t| if self.config.lowercase { t.to_ascii_lowercase() } else { t })
            .filter(|t| !(self.config.stop_words && stopwords::is_english(&t.to_ascii_lowercase())))
            .collect();

        let (min_n, max_n) = self.config.ngram_range;
        if min_n == 1 && max_n == 1 {
            return tokens;
        }
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            terms.extend(tokens.windows(n).map(|gram| gram.join(" ")));
        }
        terms
    }

    fn term_frequency(&self, text: &str) -> TermFrequency {
        let mut freq = TermFrequency::new();
        freq.add_terms(&self.analyze(text));
        freq
    }

    /// Learn vocabulary and IDF from `documents`.
    /// Replaces any previous fit.
    pub fn fit<S>(&mut self, documents: &[S]) -> Result<()>
    where
        S: AsRef<str> + Sync,
    {
        self.config.validate()?;
        if documents.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let n_docs = documents.len();
        let max_df_count = self.config.max_df * n_docs as f64;
        if max_df_count < self.config.min_df as f64 {
            return Err(Error::InvalidConfig(format!(
                "max_df {} over {n_docs} documents allows fewer documents than min_df {}",
                self.config.max_df, self.config.min_df
            )));
        }

        let freqs: Vec<TermFrequency> = documents
            .par_iter()
            .map(|doc| self.term_frequency(doc.as_ref()))
            .collect();
        let mut corpus = Corpus::new();
        for freq in &freqs {
            corpus.add_doc(freq);
        }
        debug!(docs = n_docs, distinct_terms = corpus.vocab_size(), "corpus analyzed");

        let terms = corpus.prune(self.config.min_df, max_df_count, self.config.max_features);
        if terms.is_empty() {
            return Err(Error::EmptyVocabulary);
        }
        let vocabulary: IndexMap<Box<str>, u32> =
            terms.into_iter().enumerate().map(|(idx, term)| (term, idx as u32)).collect();
        let idf = E::idf_vec(&corpus, &vocabulary);
        info!(docs = n_docs, features = vocabulary.len(), "vectorizer fitted");

        self.state = Some(VectorizerState { vocabulary, idf, doc_num: corpus.get_doc_num() });
        Ok(())
    }

    /// Feature vector of one text against the frozen vocabulary.
    pub fn transform(&self, text: &str) -> Result<SparseVec<N>> {
        let state = self.state()?;
        E::tf_idf_vec(&self.term_frequency(text), &state.vocabulary, &state.idf)
    }

    /// Transform many texts in parallel, preserving order.
    pub fn transform_batch<S>(&self, texts: &[S]) -> Result<FeatureMatrix<N>>
    where
        S: AsRef<str> + Sync,
    {
        let n_features = self.n_features()?;
        let rows = texts
            .par_iter()
            .map(|t| self.transform(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        FeatureMatrix::new(rows, n_features)
    }

    pub fn fit_transform<S>(&mut self, documents: &[S]) -> Result<FeatureMatrix<N>>
    where
        S: AsRef<str> + Sync,
    {
        self.fit(documents)?;
        self.transform_batch(documents)
    }
}

impl<N, E> Default for TfidfVectorizer<N, E>
where
    N: Float + Send + Sync,
    E: TFIDFEngine<N> + Send + Sync,
{
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VectorizerConfig {
        VectorizerConfig { max_features: None, ..VectorizerConfig::default() }
    }

    fn docs() -> Vec<&'static str> {
        vec![
            "The senate passed the budget bill",
            "Senate votes on the election bill",
            "The team won the baseball game",
            "Baseball season opens with a win",
        ]
    }

    #[test]
    fn transform_before_fit_is_not_fitted() {
        let v: TfidfVectorizer = TfidfVectorizer::default();
        assert!(matches!(v.transform("anything"), Err(Error::NotFitted(_))));
        assert!(matches!(v.n_features(), Err(Error::NotFitted(_))));
    }

    #[test]
    fn analyze_lowercases_and_drops_stop_words() {
        let v: TfidfVectorizer = TfidfVectorizer::new(config());
        assert_eq!(v.analyze("The Senate, and THE bill!"), vec!["senate", "bill"]);
    }

    #[test]
    fn analyze_builds_bigrams() {
        let v: TfidfVectorizer =
            TfidfVectorizer::new(VectorizerConfig { ngram_range: (1, 2), ..config() });
        assert_eq!(
            v.analyze("senate budget bill"),
            vec!["senate", "budget", "bill", "senate budget", "budget bill"]
        );
    }

    #[test]
    fn fit_is_deterministic() {
        let mut a: TfidfVectorizer = TfidfVectorizer::new(config());
        let mut b: TfidfVectorizer = TfidfVectorizer::new(config());
        a.fit(&docs()).unwrap();
        b.fit(&docs()).unwrap();
        assert_eq!(a.n_features().unwrap(), b.n_features().unwrap());
        assert_eq!(a.state().unwrap(), b.state().unwrap());
    }

    #[test]
    fn transform_stays_in_range_and_ignores_unseen_terms() {
        let mut v: TfidfVectorizer = TfidfVectorizer::new(config());
        v.fit(&docs()).unwrap();
        let d = v.n_features().unwrap();

        let known = v.transform("senate bill").unwrap();
        let with_noise = v.transform("senate bill zyzzyva quokka").unwrap();
        assert_eq!(known, with_noise);
        assert!(known.indices().iter().all(|&i| (i as usize) < d));
        assert_eq!(known.len(), d);

        let unseen = v.transform("zyzzyva quokka").unwrap();
        assert_eq!(unseen.nnz(), 0);
        assert_eq!(v.n_features().unwrap(), d);
    }

    #[test]
    fn df_bounds_prune_vocabulary() {
        let mut v: TfidfVectorizer =
            TfidfVectorizer::new(VectorizerConfig { min_df: 2, max_df: 0.5, ..config() });
        v.fit(&docs()).unwrap();
        let vocab: Vec<&str> = v.vocabulary().unwrap().keys().map(|k| &**k).collect();
        assert_eq!(vocab, vec!["baseball", "bill", "senate"]);
    }

    #[test]
    fn max_features_caps_dimension() {
        let mut v: TfidfVectorizer =
            TfidfVectorizer::new(VectorizerConfig { max_features: Some(2), ..config() });
        v.fit(&docs()).unwrap();
        assert_eq!(v.n_features().unwrap(), 2);
    }

    #[test]
    fn fit_errors() {
        let mut v: TfidfVectorizer = TfidfVectorizer::new(config());
        let empty: Vec<&str> = Vec::new();
        assert!(matches!(v.fit(&empty), Err(Error::EmptyCorpus)));
        assert!(matches!(v.fit(&["the and of", "is a"]), Err(Error::EmptyVocabulary)));

        let mut bad: TfidfVectorizer =
            TfidfVectorizer::new(VectorizerConfig { ngram_range: (2, 1), ..config() });
        assert!(matches!(bad.fit(&docs()), Err(Error::InvalidConfig(_))));

        let mut bounds: TfidfVectorizer =
            TfidfVectorizer::new(VectorizerConfig { min_df: 3, max_df: 0.5, ..config() });
        assert!(matches!(bounds.fit(&docs()), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn fit_transform_shape() {
        let mut v: TfidfVectorizer = TfidfVectorizer::new(config());
        let m = v.fit_transform(&docs()).unwrap();
        assert_eq!(m.shape(), (4, v.n_features().unwrap()));
    }
}
