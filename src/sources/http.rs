use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// attempts per request, including the first
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling up to 32x.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.base_delay * (1 << capped)
    }

    fn should_retry_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn should_retry_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
    }
}

/// Blocking JSON GET client shared by the HTTP sources.
#[derive(Debug, Clone)]
pub struct JsonClient {
    origin: &'static str,
    client: Client,
    retry: RetryPolicy,
}

impl JsonClient {
    /// `origin` names the remote service in errors and logs.
    pub fn new(origin: &'static str, timeout: Duration, retry: RetryPolicy, headers: HeaderMap) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::source_unavailable(origin, e))?;
        Ok(Self { origin, client, retry })
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }

    /// GET `url` with `query` and decode the JSON body.
    /// Retries 429, 5xx and transport failures with exponential backoff.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = self.client.get(url).query(query).send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .map_err(|e| Error::source_unavailable(self.origin, e.without_url()));
                    }
                    if RetryPolicy::should_retry_status(status) && attempt < max_attempts {
                        warn!(origin = self.origin, %status, attempt, "retrying request");
                        thread::sleep(self.retry.backoff(attempt));
                        continue;
                    }
                    return Err(Error::source_unavailable(self.origin, format!("HTTP {status}")));
                }
                Err(err) => {
                    // the URL may carry an API key
                    let err = err.without_url();
                    if RetryPolicy::should_retry_error(&err) && attempt < max_attempts {
                        warn!(origin = self.origin, error = %err, attempt, "retrying request");
                        thread::sleep(self.retry.backoff(attempt));
                        continue;
                    }
                    debug!(origin = self.origin, attempt, "giving up");
                    return Err(Error::source_unavailable(self.origin, err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn client(max_attempts: usize) -> JsonClient {
        let retry = RetryPolicy { max_attempts, base_delay: Duration::from_millis(1) };
        JsonClient::new("test service", Duration::from_secs(5), retry, HeaderMap::new()).unwrap()
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy { max_attempts: 10, base_delay: Duration::from_millis(10) };
        assert_eq!(policy.backoff(1), Duration::from_millis(20));
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
        assert_eq!(policy.backoff(9), Duration::from_millis(320));
    }

    #[test]
    fn decodes_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/ping")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create();

        let pong: Pong = client(3).get_json(&format!("{}/ping", server.url()), &[("q", "1")]).unwrap();
        assert!(pong.ok);
        mock.assert();
    }

    #[test]
    fn server_errors_are_retried_then_reported() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/ping")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .expect(3)
            .create();

        let err = client(3).get_json::<Pong>(&format!("{}/ping", server.url()), &[]).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
        assert!(err.to_string().contains("503"));
        mock.assert();
    }

    #[test]
    fn client_errors_are_not_retried() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/ping")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .expect(1)
            .create();

        let err = client(3).get_json::<Pong>(&format!("{}/ping", server.url()), &[]).unwrap_err();
        assert!(err.to_string().contains("401"));
        mock.assert();
    }
}
