use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use html_escape::decode_html_entities;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::category::Category;
use crate::error::{Error, Result};
use crate::matcher::ArticleMatcher;
use crate::model::ModelBundle;
use crate::sources::{ArticleSource, PostSource};
use crate::text::Normalizer;

/// Article picked for one predicted category, with HTML entities decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: Category,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub url: String,
    /// Jaccard distance between the user's tokens and the article's
    pub distance: f64,
}

/// Result for one of the top categories.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: Category,
    pub result: Result<Recommendation>,
}

impl CategoryOutcome {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.result.as_ref().ok()
    }
}

/// Opening phrase for the category at `rank` (0-based).
pub fn lead_in(rank: usize) -> &'static str {
    const LEAD_INS: [&str; 4] = [
        "You are probably",
        "It seems like you are also",
        "However, you are possibly also",
        "Furthermore, you could even be",
    ];
    LEAD_INS[rank.min(LEAD_INS.len() - 1)]
}

/// Renders one outcome the way the CLI prints it.
pub struct DisplayOutcome<'a> {
    pub rank: usize,
    pub outcome: &'a CategoryOutcome,
}

impl fmt::Display for DisplayOutcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} interested in the topic: {}", lead_in(self.rank), self.outcome.category)?;
        match &self.outcome.result {
            Ok(rec) => {
                writeln!(f, "Maybe you find the following article from this topic interesting...")?;
                writeln!(f)?;
                writeln!(f, "TITLE:\n{}\n", rec.title)?;
                writeln!(f, "ABSTRACT:\n{}\n", rec.summary)?;
                writeln!(f, "URL:\n{}", rec.url)
            }
            Err(err) => writeln!(f, "No article could be recommended for this topic ({err})."),
        }
    }
}

/// Recommendation Orchestrator
/// Classifies a user's posts, keeps the most frequent categories and picks
/// the closest current article in each of them.
///
/// The model is shared read-only, so one `Recommender` can serve
/// concurrent requests.
#[derive(Debug)]
pub struct Recommender<A> {
    model: Arc<ModelBundle>,
    articles: A,
    posts: Normalizer,
    matcher: ArticleMatcher,
}

impl<A> Recommender<A>
where
    A: ArticleSource,
{
    pub fn new(model: Arc<ModelBundle>, articles: A) -> Self {
        Self { model, articles, posts: Normalizer::posts(), matcher: ArticleMatcher::default() }
    }

    pub fn model(&self) -> &ModelBundle {
        &self.model
    }

    /// Top `num_categories` categories for `posts`, each with its best
    /// article or the error that prevented one.
    pub fn recommend<S: AsRef<str>>(&self, posts: &[S], num_categories: usize) -> Result<Vec<CategoryOutcome>> {
        let texts: Vec<String> = posts
            .iter()
            .map(|post| self.posts.normalize_to_string(post.as_ref()))
            .filter(|text| !text.is_empty())
            .collect();
        if texts.len() < posts.len() {
            debug!(dropped = posts.len() - texts.len(), kept = texts.len(), "dropped posts without text");
        }
        if texts.is_empty() {
            return Err(Error::NoUsableInput);
        }

        let x = self.model.vectorizer().transform_batch(&texts)?;
        let predicted = self.model.classifier().predict(&x)?;
        let top = aggregate(&predicted, num_categories)?;
        info!(posts = texts.len(), categories = ?top, "posts classified");

        let outcomes: Vec<CategoryOutcome> = top
            .into_iter()
            .map(|category| {
                let mut tokens = BTreeSet::new();
                for (text, _) in texts.iter().zip(&predicted).filter(|(_, &c)| c == category) {
                    self.matcher.normalizer().extend_token_set(&mut tokens, text);
                }
                CategoryOutcome { category, result: self.recommend_in(category, &tokens) }
            })
            .collect();

        if !outcomes.is_empty() && outcomes.iter().all(|o| o.result.is_err()) {
            if let Some(CategoryOutcome { result: Err(err), .. }) = outcomes.into_iter().next() {
                return Err(err);
            }
            return Err(Error::NoUsableInput);
        }
        Ok(outcomes)
    }

    fn recommend_in(&self, category: Category, user_tokens: &BTreeSet<String>) -> Result<Recommendation> {
        let candidates = self.articles.fetch_candidates(category).map_err(|err| {
            warn!(%category, error = %err, "candidate fetch failed");
            err
        })?;
        let best = self.matcher.best_match(category, user_tokens, &candidates)?;
        info!(%category, candidates = candidates.len(), distance = best.distance, "article selected");
        Ok(Recommendation {
            category,
            title: decode_html_entities(&best.article.title).into_owned(),
            summary: decode_html_entities(&best.article.summary).into_owned(),
            url: decode_html_entities(&best.article.url).into_owned(),
            distance: best.distance,
        })
    }

    /// Fetch the most recent `num_posts` posts of `user` and recommend on them.
    pub fn recommend_for_user<P>(
        &self,
        post_source: &P,
        user: &str,
        num_posts: usize,
        num_categories: usize,
    ) -> Result<Vec<CategoryOutcome>>
    where
        P: PostSource + ?Sized,
    {
        let posts = post_source.fetch_posts(user, num_posts)?;
        self.recommend(&posts, num_categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_ins_repeat_the_last_phrase() {
        assert_eq!(lead_in(0), "You are probably");
        assert_eq!(lead_in(1), "It seems like you are also");
        assert_eq!(lead_in(3), "Furthermore, you could even be");
        assert_eq!(lead_in(9), "Furthermore, you could even be");
    }

    #[test]
    fn display_renders_article_or_error() {
        let ok = CategoryOutcome {
            category: Category::Sports,
            result: Ok(Recommendation {
                category: Category::Sports,
                title: "Rangers Win".into(),
                summary: "A late goal.".into(),
                url: "https://example.com/a".into(),
                distance: 0.5,
            }),
        };
        let text = DisplayOutcome { rank: 0, outcome: &ok }.to_string();
        assert!(text.starts_with("You are probably interested in the topic: Sports\n"));
        assert!(text.contains("TITLE:\nRangers Win"));
        assert!(text.contains("URL:\nhttps://example.com/a"));

        let failed = CategoryOutcome {
            category: Category::Travel,
            result: Err(Error::EmptyCandidatePool { category: Category::Travel }),
        };
        let text = DisplayOutcome { rank: 1, outcome: &failed }.to_string();
        assert!(text.starts_with("It seems like you are also interested in the topic: Travel"));
        assert!(text.contains("No article could be recommended"));
    }

    #[test]
    fn recommendation_serializes_abstract() {
        let rec = Recommendation {
            category: Category::Arts,
            title: "t".into(),
            summary: "s".into(),
            url: "u".into(),
            distance: 1.0,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["abstract"], "s");
        assert_eq!(json["category"], "Arts");
    }
}
