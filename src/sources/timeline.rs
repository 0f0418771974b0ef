use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;

use crate::config::SourcesConfig;
use crate::error::{Error, Result};
use crate::sources::http::JsonClient;
use crate::sources::PostSource;

const ORIGIN: &str = "timeline";
/// page size bounds accepted by the timeline endpoint
const MIN_PAGE: usize = 5;
const MAX_PAGE: usize = 100;

/// Canonical form of a user handle: trimmed, without a leading `@`, lowercased.
pub fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).to_lowercase()
}

/// Recent posts of a user from a v2-style timeline API, authenticated
/// with a bearer token.
#[derive(Debug, Clone)]
pub struct TimelineSource {
    http: JsonClient,
    base_url: String,
}

impl TimelineSource {
    pub fn new(config: &SourcesConfig, bearer_token: &str) -> Result<Self> {
        if bearer_token.trim().is_empty() {
            return Err(Error::InvalidConfig("missing timeline bearer token".to_string()));
        }
        let auth = HeaderValue::from_str(&format!("Bearer {}", bearer_token.trim()))
            .map_err(|_| Error::InvalidConfig("invalid timeline bearer token".to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        let http = JsonClient::new(ORIGIN, config.timeout(), config.retry_policy(), headers)?;
        Ok(Self { http, base_url: config.timeline_url.trim_end_matches('/').to_string() })
    }

    fn resolve_user_id(&self, handle: &str) -> Result<String> {
        let url = format!("{}/2/users/by/username/{handle}", self.base_url);
        let response: UserLookup = self.http.get_json(&url, &[])?;
        response
            .data
            .map(|user| user.id)
            .ok_or_else(|| Error::source_unavailable(ORIGIN, format!("unknown user {handle}")))
    }
}

/// Handles are ASCII letters, digits and underscores; anything else would
/// change the request path.
fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty() && handle.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl PostSource for TimelineSource {
    fn fetch_posts(&self, user: &str, limit: usize) -> Result<Vec<String>> {
        let handle = normalize_handle(user);
        if handle.is_empty() {
            return Err(Error::source_unavailable(ORIGIN, "empty user handle"));
        }
        if !is_valid_handle(&handle) {
            return Err(Error::source_unavailable(ORIGIN, format!("invalid user handle {handle:?}")));
        }
        let user_id = self.resolve_user_id(&handle)?;
        let url = format!("{}/2/users/{user_id}/tweets", self.base_url);

        let mut posts = Vec::with_capacity(limit);
        let mut next_token: Option<String> = None;
        while posts.len() < limit {
            let page_size = (limit - posts.len()).clamp(MIN_PAGE, MAX_PAGE).to_string();
            let mut query = vec![("max_results", page_size.as_str())];
            if let Some(token) = next_token.as_deref() {
                query.push(("pagination_token", token));
            }
            let page: TimelinePage = self.http.get_json(&url, &query)?;
            posts.extend(page.data.into_iter().map(|post| post.text));
            next_token = page.meta.and_then(|meta| meta.next_token);
            if next_token.is_none() {
                break;
            }
        }
        posts.truncate(limit);

        debug!(user = %handle, posts = posts.len(), "timeline fetched");
        if posts.is_empty() {
            return Err(Error::source_unavailable(ORIGIN, format!("no posts for {handle}")));
        }
        Ok(posts)
    }
}

#[derive(Debug, Deserialize)]
struct UserLookup {
    data: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TimelinePage {
    #[serde(default)]
    data: Vec<Post>,
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct Post {
    text: String,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_token: Option<String>,
}
