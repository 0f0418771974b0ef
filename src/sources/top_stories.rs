use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::debug;

use crate::category::Category;
use crate::config::SourcesConfig;
use crate::error::{Error, Result};
use crate::matcher::CandidateArticle;
use crate::sources::http::JsonClient;
use crate::sources::ArticleSource;

const ORIGIN: &str = "top stories";

/// Current articles per section from a Top-Stories style endpoint:
/// `GET {base}/{section}.json?api-key={key}`.
#[derive(Debug, Clone)]
pub struct TopStoriesSource {
    http: JsonClient,
    base_url: String,
    api_key: String,
}

impl TopStoriesSource {
    pub fn new(config: &SourcesConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("missing top stories API key".to_string()));
        }
        let http = JsonClient::new(ORIGIN, config.timeout(), config.retry_policy(), HeaderMap::new())?;
        Ok(Self { http, base_url: config.top_stories_url.trim_end_matches('/').to_string(), api_key })
    }
}

impl ArticleSource for TopStoriesSource {
    fn fetch_candidates(&self, category: Category) -> Result<Vec<CandidateArticle>> {
        let url = format!("{}/{}.json", self.base_url, category.source_key());
        let response: TopStoriesResponse = self.http.get_json(&url, &[("api-key", self.api_key.as_str())])?;
        debug!(%category, results = response.results.len(), "top stories fetched");
        Ok(response.results.into_iter().map(CandidateArticle::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct TopStoriesResponse {
    #[serde(default)]
    results: Vec<Story>,
}

#[derive(Debug, Deserialize)]
struct Story {
    #[serde(default)]
    title: String,
    #[serde(default, rename = "abstract")]
    summary: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    subsection: String,
    #[serde(default)]
    des_facet: Facet,
    #[serde(default)]
    org_facet: Facet,
    #[serde(default)]
    per_facet: Facet,
}

/// Facets arrive as a list, or as `""` when a story has none.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Facet {
    List(Vec<String>),
    Text(String),
}

impl Default for Facet {
    fn default() -> Self {
        Facet::List(Vec::new())
    }
}

impl Facet {
    fn into_vec(self) -> Vec<String> {
        match self {
            Facet::List(values) => values,
            Facet::Text(text) if text.trim().is_empty() => Vec::new(),
            Facet::Text(text) => vec![text],
        }
    }
}

impl From<Story> for CandidateArticle {
    fn from(story: Story) -> Self {
        let mut entity_facets = story.des_facet.into_vec();
        entity_facets.extend(story.org_facet.into_vec());
        entity_facets.extend(story.per_facet.into_vec());
        CandidateArticle {
            title: story.title,
            summary: story.summary,
            url: story.url,
            section: story.section,
            subsection: story.subsection,
            entity_facets,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const BODY: &str = r#"{
        "status": "OK",
        "num_results": 2,
        "results": [
            {"title": "Rangers Win", "abstract": "A late goal.", "url": "https://example.com/a",
             "section": "sports", "subsection": "hockey",
             "des_facet": ["Hockey, Ice"], "org_facet": "", "per_facet": ["Doe, Jane"]},
            {"title": "Trade Deadline", "abstract": "", "url": "https://example.com/b",
             "section": "sports", "subsection": "", "des_facet": "", "org_facet": ["Rangers"]}
        ]
    }"#;

    fn source(base: String) -> TopStoriesSource {
        let config = SourcesConfig {
            top_stories_url: base,
            max_retries: 1,
            retry_base_ms: 1,
            ..SourcesConfig::default()
        };
        TopStoriesSource::new(&config, "secret").unwrap()
    }

    #[test]
    fn facets_may_be_lists_or_empty_strings() {
        let response: TopStoriesResponse = serde_json::from_str(BODY).unwrap();
        let articles: Vec<CandidateArticle> = response.results.into_iter().map(CandidateArticle::from).collect();
        assert_eq!(articles[0].entity_facets, vec!["Hockey, Ice", "Doe, Jane"]);
        assert_eq!(articles[1].entity_facets, vec!["Rangers"]);
        assert_eq!(articles[0].summary, "A late goal.");
    }

    #[test]
    fn fetches_by_source_key() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/sports.json")
            .match_query(mockito::Matcher::UrlEncoded("api-key".into(), "secret".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create();

        let articles = source(server.url()).fetch_candidates(Category::Sports).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Rangers Win");
        mock.assert();
    }

    #[test]
    fn auth_failure_is_source_unavailable_without_key() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/dining.json")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create();

        let err = source(server.url()).fetch_candidates(Category::Food).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let config = SourcesConfig { timeout_secs: 1, ..SourcesConfig::default() };
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert!(matches!(TopStoriesSource::new(&config, "  "), Err(Error::InvalidConfig(_))));
    }
}
