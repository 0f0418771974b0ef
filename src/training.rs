use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::category::Category;
use crate::classifier::{ClassifierConfig, LogisticRegression};
use crate::error::{Error, Result};
use crate::model::ModelBundle;
use crate::text::Normalizer;
use crate::vectorizer::{TfidfVectorizer, VectorizerConfig};

/// A piece of text, labeled with a category code when used for training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub raw_text: String,
    pub label: Option<u32>,
}

impl Document {
    pub fn labeled(raw_text: impl Into<String>, label: u32) -> Self {
        Self { raw_text: raw_text.into(), label: Some(label) }
    }

    pub fn unlabeled(raw_text: impl Into<String>) -> Self {
        Self { raw_text: raw_text.into(), label: None }
    }
}

/// What happened to the input documents of one training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub total: usize,
    pub kept: usize,
    /// documents with no tokens after normalization
    pub skipped_empty: usize,
    pub n_features: usize,
    pub classes: Vec<Category>,
    /// accuracy of the fitted classifier on its own training rows
    pub train_accuracy: f32,
}

/// Training Pipeline
/// Normalizes a labeled corpus, fits the vectorizer and classifier, and
/// returns them as one [`ModelBundle`]. Nothing is returned on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingPipeline {
    pub vectorizer: VectorizerConfig,
    pub classifier: ClassifierConfig,
}

impl TrainingPipeline {
    pub fn new(vectorizer: VectorizerConfig, classifier: ClassifierConfig) -> Self {
        Self { vectorizer, classifier }
    }

    pub fn run(&self, documents: &[Document]) -> Result<(ModelBundle, TrainingReport)> {
        self.vectorizer.validate()?;
        self.classifier.validate()?;

        let mut labels = Vec::with_capacity(documents.len());
        for (index, doc) in documents.iter().enumerate() {
            let label = doc.label.ok_or(Error::MissingLabel { index })?;
            Category::from_code(label)?;
            labels.push(label);
        }

        let normalizer = Normalizer::new();
        let mut texts = Vec::with_capacity(documents.len());
        let mut kept_labels = Vec::with_capacity(documents.len());
        for (doc, &label) in documents.iter().zip(&labels) {
            let text = normalizer.normalize_to_string(&doc.raw_text);
            if text.is_empty() {
                continue;
            }
            texts.push(text);
            kept_labels.push(label);
        }
        let skipped_empty = documents.len() - texts.len();
        if skipped_empty > 0 {
            warn!(skipped = skipped_empty, total = documents.len(), "skipped documents without usable text");
        }
        if texts.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let mut vectorizer: TfidfVectorizer<f32> = TfidfVectorizer::new(self.vectorizer.clone());
        let x = vectorizer.fit_transform(&texts)?;
        let mut classifier = LogisticRegression::new(self.classifier.clone());
        classifier.fit(&x, &kept_labels)?;
        let train_accuracy = classifier.score(&x, &kept_labels)?;

        let report = TrainingReport {
            total: documents.len(),
            kept: texts.len(),
            skipped_empty,
            n_features: x.n_features(),
            classes: classifier.classes()?.to_vec(),
            train_accuracy,
        };
        let bundle = ModelBundle::new(vectorizer, classifier)?;
        info!(
            kept = report.kept,
            features = report.n_features,
            classes = report.classes.len(),
            train_accuracy,
            fingerprint = bundle.fingerprint(),
            "training finished"
        );
        Ok((bundle, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        let p = Category::Politics.code();
        let s = Category::Sports.code();
        vec![
            Document::labeled("Senate passes budget", p),
            Document::labeled("Senate debates election law", p),
            Document::labeled("--- 42 ---", p),
            Document::labeled("Pitcher throws perfect game", s),
            Document::labeled("Baseball playoffs begin", s),
        ]
    }

    #[test]
    fn skips_empty_documents_and_reports_them() {
        let (bundle, report) = TrainingPipeline::default().run(&corpus()).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.kept, 4);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(report.classes, vec![Category::Politics, Category::Sports]);
        assert_eq!(report.n_features, bundle.n_features().unwrap());
        assert_eq!(bundle.classify("senate budget").unwrap(), Category::Politics);
    }

    #[test]
    fn missing_or_out_of_range_labels_are_fatal() {
        let mut docs = corpus();
        docs.push(Document::unlabeled("unlabeled text"));
        assert!(matches!(TrainingPipeline::default().run(&docs), Err(Error::MissingLabel { index: 5 })));

        let mut docs = corpus();
        docs[1].label = Some(14);
        assert!(matches!(TrainingPipeline::default().run(&docs), Err(Error::InvalidLabel { label: 14 })));
    }

    #[test]
    fn all_empty_is_empty_corpus() {
        let docs = vec![Document::labeled("!!", 0), Document::labeled("a b c", 1)];
        assert!(matches!(TrainingPipeline::default().run(&docs), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn invalid_config_fails_before_training() {
        let pipeline = TrainingPipeline {
            classifier: ClassifierConfig { c: 0.0, ..ClassifierConfig::default() },
            ..TrainingPipeline::default()
        };
        assert!(matches!(pipeline.run(&corpus()), Err(Error::InvalidConfig(_))));
    }
}
