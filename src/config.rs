use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierConfig;
use crate::error::{Error, Result};
use crate::sources::http::RetryPolicy;
use crate::training::TrainingPipeline;
use crate::vectorizer::VectorizerConfig;

/// Settings file layout. Every section and field is optional.
///
/// ```toml
/// [vectorizer]
/// ngram_range = [1, 2]
/// min_df = 50
/// max_df = 0.25
///
/// [recommend]
/// num_categories = 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vectorizer: VectorizerConfig,
    pub classifier: ClassifierConfig,
    pub model: ModelConfig,
    pub sources: SourcesConfig,
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// bundle written by `train` and read by `recommend`
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("model.cbor") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub top_stories_url: String,
    pub timeline_url: String,
    pub timeout_secs: u64,
    /// attempts per request, including the first
    pub max_retries: usize,
    pub retry_base_ms: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            top_stories_url: "https://api.nytimes.com/svc/topstories/v2".to_string(),
            timeline_url: "https://api.twitter.com".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_ms: 500,
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_attempts: self.max_retries, base_delay: Duration::from_millis(self.retry_base_ms) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// most recent posts read per user
    pub num_posts: usize,
    pub num_categories: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self { num_posts: 100, num_categories: 1 }
    }
}

impl Config {
    /// Parse and validate a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.vectorizer.validate()?;
        self.classifier.validate()?;
        if self.sources.max_retries == 0 {
            return Err(Error::InvalidConfig("sources.max_retries must be at least 1".to_string()));
        }
        if self.sources.timeout_secs == 0 {
            return Err(Error::InvalidConfig("sources.timeout_secs must be positive".to_string()));
        }
        if self.recommend.num_posts == 0 {
            return Err(Error::InvalidConfig("recommend.num_posts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn training_pipeline(&self) -> TrainingPipeline {
        TrainingPipeline::new(self.vectorizer.clone(), self.classifier.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[vectorizer]\nngram_range = [1, 2]\nmin_df = 50\nmax_df = 0.25\n\n[recommend]\nnum_categories = 2"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.vectorizer.ngram_range, (1, 2));
        assert_eq!(config.vectorizer.min_df, 50);
        assert_eq!(config.vectorizer.max_features, Some(10_000));
        assert_eq!(config.recommend.num_categories, 2);
        assert_eq!(config.recommend.num_posts, 100);
        assert_eq!(config.classifier, ClassifierConfig::default());
        assert_eq!(config.model.path, PathBuf::from("model.cbor"));
    }

    #[test]
    fn malformed_or_invalid_values_are_rejected() {
        let mut bad_toml = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad_toml, "[vectorizer\nmin_df = ").unwrap();
        assert!(matches!(Config::load(bad_toml.path()), Err(Error::InvalidConfig(_))));

        let mut bad_value = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad_value, "[vectorizer]\nmax_df = 1.5").unwrap();
        assert!(matches!(Config::load(bad_value.path()), Err(Error::InvalidConfig(_))));

        let mut no_retries = tempfile::NamedTempFile::new().unwrap();
        writeln!(no_retries, "[sources]\nmax_retries = 0").unwrap();
        assert!(matches!(Config::load(no_retries.path()), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_path_means_defaults() {
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
