use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::info;

use crate::category::Category;
use crate::classifier::{ClassifierState, LogisticRegression};
use crate::error::{Error, Result};
use crate::utils::sparse::SparseVec;
use crate::vectorizer::{TfidfVectorizer, VectorizerState};

/// Version written into every bundle and state file.
pub const FORMAT_VERSION: u32 = 1;

/// A fitted vectorizer and classifier from one training run.
///
/// The fingerprint is a SHA-256 over both fitted states. It is written
/// alongside the states and recomputed on load, so a vectorizer can never
/// be served with a classifier trained on a different vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    format_version: u32,
    fingerprint: String,
    vectorizer: TfidfVectorizer<f32>,
    classifier: LogisticRegression,
}

/// One half of a bundle stored on its own.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile<T> {
    format_version: u32,
    fingerprint: String,
    state: T,
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

impl ModelBundle {
    /// Pair two fitted components. Their feature widths must agree.
    pub fn new(vectorizer: TfidfVectorizer<f32>, classifier: LogisticRegression) -> Result<Self> {
        let fingerprint = fingerprint(vectorizer.state()?, classifier.state()?)?;
        Ok(Self { format_version: FORMAT_VERSION, fingerprint, vectorizer, classifier })
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer<f32> {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn n_features(&self) -> Result<usize> {
        self.vectorizer.n_features()
    }

    pub fn classes(&self) -> Result<&[Category]> {
        self.classifier.classes()
    }

    /// Vectorize `text` and classify it.
    pub fn classify(&self, text: &str) -> Result<Category> {
        let row: SparseVec<f32> = self.vectorizer.transform(text)?;
        self.classifier.predict_one(&row)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_cbor(path.as_ref(), self)?;
        info!(path = %path.as_ref().display(), fingerprint = %self.fingerprint, "model bundle saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bundle: ModelBundle = read_cbor(path.as_ref())?;
        bundle.verify()?;
        info!(path = %path.as_ref().display(), fingerprint = %bundle.fingerprint, "model bundle loaded");
        Ok(bundle)
    }

    /// Store the vectorizer and classifier in two files, each tagged with
    /// the run fingerprint.
    pub fn save_split(&self, vectorizer_path: impl AsRef<Path>, classifier_path: impl AsRef<Path>) -> Result<()> {
        write_cbor(
            vectorizer_path.as_ref(),
            &StateFile { format_version: self.format_version, fingerprint: self.fingerprint.clone(), state: &self.vectorizer },
        )?;
        write_cbor(
            classifier_path.as_ref(),
            &StateFile { format_version: self.format_version, fingerprint: self.fingerprint.clone(), state: &self.classifier },
        )?;
        info!(fingerprint = %self.fingerprint, "model states saved separately");
        Ok(())
    }

    /// Load two state files written by [`Self::save_split`].
    /// Fails with [`Error::ModelMismatch`] unless both come from the same run.
    pub fn load_split(vectorizer_path: impl AsRef<Path>, classifier_path: impl AsRef<Path>) -> Result<Self> {
        let vec_file: StateFile<TfidfVectorizer<f32>> = read_cbor(vectorizer_path.as_ref())?;
        let clf_file: StateFile<LogisticRegression> = read_cbor(classifier_path.as_ref())?;
        if vec_file.fingerprint != clf_file.fingerprint {
            return Err(Error::ModelMismatch { vectorizer: vec_file.fingerprint, classifier: clf_file.fingerprint });
        }
        let bundle = ModelBundle {
            format_version: vec_file.format_version,
            fingerprint: vec_file.fingerprint,
            vectorizer: vec_file.state,
            classifier: clf_file.state,
        };
        bundle.verify()?;
        Ok(bundle)
    }

    /// Check the decoded shapes, then recompute the fingerprint and compare
    /// it with the stored one.
    fn verify(&self) -> Result<()> {
        self.check_structure()?;
        let actual = fingerprint(self.vectorizer.state()?, self.classifier.state()?)?;
        if actual != self.fingerprint {
            return Err(Error::ModelMismatch { vectorizer: self.fingerprint.clone(), classifier: actual });
        }
        Ok(())
    }

    /// Shapes every later lookup indexes by.
    fn check_structure(&self) -> Result<()> {
        self.vectorizer.config().validate()?;
        let vectorizer = self.vectorizer.state()?;
        let classifier = self.classifier.state()?;

        let n_features = vectorizer.vocabulary.len();
        if vectorizer.idf.len() != n_features {
            return Err(Error::CorruptModel(format!(
                "{} idf weights for {n_features} vocabulary terms",
                vectorizer.idf.len()
            )));
        }
        if let Some((term, idx)) = vectorizer.vocabulary.iter().find(|(_, idx)| **idx as usize >= n_features) {
            return Err(Error::CorruptModel(format!("term {term:?} maps to position {idx} of {n_features}")));
        }

        if classifier.n_features != n_features {
            return Err(Error::DimensionMismatch { expected: n_features, found: classifier.n_features });
        }
        let n_classes = classifier.classes.len();
        if n_classes == 0 || classifier.coef.len() != n_classes || classifier.intercept.len() != n_classes {
            return Err(Error::CorruptModel(format!(
                "{n_classes} classes with {} weight rows and {} intercepts",
                classifier.coef.len(),
                classifier.intercept.len()
            )));
        }
        if let Some(row) = classifier.coef.iter().find(|row| row.len() != n_features) {
            return Err(Error::CorruptModel(format!("weight row of width {} for {n_features} features", row.len())));
        }
        Ok(())
    }
}

fn fingerprint(vectorizer: &VectorizerState<f32>, classifier: &ClassifierState) -> Result<String> {
    let n_features = vectorizer.vocabulary.len();
    if classifier.n_features != n_features {
        return Err(Error::DimensionMismatch { expected: n_features, found: classifier.n_features });
    }

    let mut hasher = Sha256::new();
    hasher.update((n_features as u64).to_le_bytes());
    for (term, &idx) in &vectorizer.vocabulary {
        hasher.update(term.as_bytes());
        hasher.update([0u8]);
        hasher.update(idx.to_le_bytes());
    }
    for w in &vectorizer.idf {
        hasher.update(w.to_le_bytes());
    }
    hasher.update(vectorizer.doc_num.to_le_bytes());
    for class in &classifier.classes {
        hasher.update(class.code().to_le_bytes());
    }
    for row in &classifier.coef {
        for w in row {
            hasher.update(w.to_le_bytes());
        }
    }
    for b in &classifier.intercept {
        hasher.update(b.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Encode into a temporary file next to `path` and move it into place, so
/// a failed write never leaves a truncated file at `path`.
fn write_cbor<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_cbor::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Read a bundle or state file, rejecting unknown format versions before
/// decoding the payload.
fn read_cbor<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    let header: VersionHeader = serde_cbor::from_slice(&bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(Error::UnsupportedModelVersion { found: header.format_version, expected: FORMAT_VERSION });
    }
    Ok(serde_cbor::from_slice(&bytes)?)
}
