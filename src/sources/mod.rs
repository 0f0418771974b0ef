//! Producers feeding the pipeline: training corpora, user posts and
//! candidate articles.

pub mod corpus;
pub mod http;
pub mod offline;
pub mod timeline;
pub mod top_stories;

use crate::category::Category;
use crate::error::Result;
use crate::matcher::CandidateArticle;
use crate::training::Document;

/// Labeled training documents.
pub trait CorpusLoader {
    fn load(&self) -> Result<Vec<Document>>;
}

/// Most recent posts of a user, newest first.
pub trait PostSource {
    /// At most `limit` posts. An unknown user or an empty timeline is
    /// [`crate::Error::SourceUnavailable`].
    fn fetch_posts(&self, user: &str, limit: usize) -> Result<Vec<String>>;
}

/// Current articles of one category.
pub trait ArticleSource {
    fn fetch_candidates(&self, category: Category) -> Result<Vec<CandidateArticle>>;
}

impl<T: PostSource + ?Sized> PostSource for &T {
    fn fetch_posts(&self, user: &str, limit: usize) -> Result<Vec<String>> {
        (**self).fetch_posts(user, limit)
    }
}

impl<T: ArticleSource + ?Sized> ArticleSource for &T {
    fn fetch_candidates(&self, category: Category) -> Result<Vec<CandidateArticle>> {
        (**self).fetch_candidates(category)
    }
}

impl<T: ArticleSource + ?Sized> ArticleSource for Box<T> {
    fn fetch_candidates(&self, category: Category) -> Result<Vec<CandidateArticle>> {
        (**self).fetch_candidates(category)
    }
}
