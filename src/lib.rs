//! This crate recommends news sections and articles to a user from the text of their recent posts.
pub mod aggregate;
pub mod category;
pub mod classifier;
pub mod config;
pub mod error;
pub mod matcher;
pub mod model;
pub mod recommend;
pub mod sources;
pub mod text;
pub mod training;
pub mod utils;
pub mod vectorizer;

/// Error and Result types
/// Every fallible operation of the crate returns `Result<T>`.
/// `Error::kind()` groups the variants into the coarse `ErrorKind`
/// categories a front end renders distinct messages for.
pub use error::{Error, ErrorKind, Result};

/// News Category
/// The fixed set of 14 sections a text is classified into.
/// Codes are dense and 0-based, and each section has the key the
/// article source addresses it by.
pub use category::Category;

/// Text Normalizer
/// Reduces raw text to ASCII-alphabetic tokens of two or more characters,
/// with optional stopword and token removal.
pub use text::Normalizer;

/// TF-IDF Vectorizer
/// Learns a vocabulary and smoothed IDF weights from a corpus, then maps
/// text onto L2-normalized sparse vectors of a fixed dimension.
///
/// `TfidfVectorizer<N, E>` has the following generic parameters:
/// - `N`: float type of the feature values (f32 or f64)
/// - `E`: TF-IDF calculation engine (e.g., `DefaultTFIDFEngine`)
///
/// # Serialization
/// Supported. The fitted vocabulary, IDF vector and configuration are
/// stored together.
pub use vectorizer::{TfidfVectorizer, VectorizerConfig};

/// Term Frequency structure
/// Counts of each term within one document, in first-seen order.
pub use vectorizer::term::TermFrequency;

/// Corpus statistics
/// Document count plus per-term document frequency and total count,
/// used for vocabulary pruning and IDF calculation.
pub use vectorizer::corpus::Corpus;

/// TF IDF Calculation Engine Trait
/// By implementing this trait, you can plug different weighting strategies
/// into `TfidfVectorizer<N, E>`.
pub use vectorizer::tfidf::{DefaultTFIDFEngine, TFIDFEngine};

/// Sparse vector and row-major sparse matrix used as classifier input.
pub use utils::sparse::{FeatureMatrix, SparseVec};

/// Softmax Logistic Regression
/// Multinomial linear classifier over TF-IDF rows, trained by
/// deterministic full-batch gradient descent.
pub use classifier::{ClassifierConfig, LogisticRegression};

/// Model Bundle
/// A fitted vectorizer and classifier from the same training run, tied by
/// a fingerprint and persisted as CBOR.
pub use model::ModelBundle;

/// Training Pipeline and its input document type.
pub use training::{Document, TrainingPipeline, TrainingReport};

/// Top-K category aggregation with first-encounter tie-break.
pub use aggregate::aggregate;

/// Article Matcher
/// Jaccard-distance selection of the candidate article closest to a
/// user's vocabulary.
pub use matcher::{jaccard_distance, ArticleMatcher, CandidateArticle};

/// Recommendation Orchestrator
/// Posts in, one recommendation (or error) per top category out.
pub use recommend::{CategoryOutcome, Recommendation, Recommender};

/// Producer seams for corpora, posts and candidate articles.
pub use sources::{ArticleSource, CorpusLoader, PostSource};

/// Settings loaded from TOML.
pub use config::Config;
