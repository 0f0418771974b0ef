use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::category::Category;
use crate::error::{Error, Result};
use crate::matcher::CandidateArticle;
use crate::sources::{ArticleSource, PostSource};

/// Posts held in memory, newest first. The user argument is ignored.
#[derive(Debug, Clone, Default)]
pub struct OfflinePosts {
    posts: Vec<String>,
}

impl OfflinePosts {
    pub fn new(posts: Vec<String>) -> Self {
        Self { posts }
    }

    /// One post per line; blank lines are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let posts = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { posts })
    }
}

impl PostSource for OfflinePosts {
    fn fetch_posts(&self, _user: &str, limit: usize) -> Result<Vec<String>> {
        if self.posts.is_empty() {
            return Err(Error::source_unavailable("posts file", "no posts"));
        }
        Ok(self.posts.iter().take(limit).cloned().collect())
    }
}

/// Candidate articles per category, held in memory.
#[derive(Debug, Clone, Default)]
pub struct OfflineArticles {
    by_category: HashMap<Category, Vec<CandidateArticle>>,
}

impl OfflineArticles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, category: Category, candidates: Vec<CandidateArticle>) -> Self {
        self.by_category.insert(category, candidates);
        self
    }

    /// JSON object mapping category source keys (`"arts"`, `"dining"`, ...)
    /// to arrays of articles. Unknown keys are skipped with a warning.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let raw: HashMap<String, Vec<CandidateArticle>> = serde_json::from_str(&contents)
            .map_err(|e| Error::source_unavailable("candidates file", format!("{}: {e}", path.display())))?;

        let mut by_category = HashMap::with_capacity(raw.len());
        for (key, candidates) in raw {
            match Category::from_source_key(&key) {
                Some(category) => {
                    by_category.insert(category, candidates);
                }
                None => warn!(key = %key, "unknown section key in candidates file"),
            }
        }
        Ok(Self { by_category })
    }
}

impl ArticleSource for OfflineArticles {
    fn fetch_candidates(&self, category: Category) -> Result<Vec<CandidateArticle>> {
        Ok(self.by_category.get(&category).cloned().unwrap_or_default())
    }
}
