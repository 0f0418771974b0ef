use thiserror::Error;

use crate::category::Category;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the pipeline can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} used before it was fitted")]
    NotFitted(&'static str),

    #[error("requested {requested} top categories but only {available} distinct categories were predicted")]
    InsufficientClasses { requested: usize, available: usize },

    #[error("no usable candidate articles for category {category}")]
    EmptyCandidatePool { category: Category },

    #[error("no usable input text after normalization")]
    NoUsableInput,

    #[error("{origin} unavailable: {reason}")]
    SourceUnavailable { origin: String, reason: String },

    #[error("label {label} is outside the known category range")]
    InvalidLabel { label: u32 },

    #[error("training document {index} has no label")]
    MissingLabel { index: usize },

    #[error("malformed training corpus: {0}")]
    InvalidCorpus(String),

    #[error("training corpus is empty after filtering")]
    EmptyCorpus,

    #[error("no terms remain after vocabulary pruning")]
    EmptyVocabulary,

    #[error("classifier needs at least two distinct categories, found {found}")]
    TooFewClasses { found: usize },

    #[error("feature dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("vectorizer (run {vectorizer}) and classifier (run {classifier}) come from different training runs")]
    ModelMismatch { vectorizer: String, classifier: String },

    #[error("model file is inconsistent: {0}")]
    CorruptModel(String),

    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedModelVersion { found: u32, expected: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("model codec error: {0}")]
    Codec(#[from] serde_cbor::Error),
}

/// Coarse classification of [`Error`] used by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFitted,
    InsufficientClasses,
    EmptyCandidatePool,
    NoUsableInput,
    SourceUnavailable,
    InvalidTrainingData,
    InvalidConfig,
    ModelMismatch,
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFitted(_) => ErrorKind::NotFitted,
            Error::InsufficientClasses { .. } => ErrorKind::InsufficientClasses,
            Error::EmptyCandidatePool { .. } => ErrorKind::EmptyCandidatePool,
            Error::NoUsableInput => ErrorKind::NoUsableInput,
            Error::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Error::InvalidLabel { .. }
            | Error::MissingLabel { .. }
            | Error::InvalidCorpus(_)
            | Error::EmptyCorpus
            | Error::EmptyVocabulary
            | Error::TooFewClasses { .. } => ErrorKind::InvalidTrainingData,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::DimensionMismatch { .. }
            | Error::ModelMismatch { .. }
            | Error::CorruptModel(_)
            | Error::UnsupportedModelVersion { .. } => ErrorKind::ModelMismatch,
            Error::Io(_) | Error::Codec(_) => ErrorKind::Storage,
        }
    }

    /// One message per error kind, phrased for the person at the terminal.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InsufficientClasses => match self {
                Error::InsufficientClasses { requested, available } => format!(
                    "Your posts only point to {available} topic(s), so {requested} cannot be recommended. Ask for fewer categories."
                ),
                _ => self.to_string(),
            },
            ErrorKind::EmptyCandidatePool => match self {
                Error::EmptyCandidatePool { category } => {
                    format!("There are no current articles to recommend for {category}.")
                }
                _ => self.to_string(),
            },
            ErrorKind::NoUsableInput => "None of the posts contain words the model can use.".to_string(),
            ErrorKind::SourceUnavailable => {
                format!("An error occurred - maybe the user does not exist or there are no posts? ({self})")
            }
            ErrorKind::NotFitted => "The model is not trained yet. Run `train` first.".to_string(),
            ErrorKind::InvalidTrainingData => format!("The training data was rejected: {self}"),
            ErrorKind::InvalidConfig => format!("Configuration problem: {self}"),
            ErrorKind::ModelMismatch => format!("The model files do not belong together: {self}"),
            ErrorKind::Storage => format!("Could not read or write a file: {self}"),
        }
    }

    /// Shorthand for a [`Error::SourceUnavailable`].
    pub fn source_unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}
