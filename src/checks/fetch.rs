// src/checks/fetch.rs
// =============================================================================
// The shared fetch context handed to every check in a phase.
//
// One FetchContext wraps one reqwest Client (and therefore one connection
// pool). The pipeline builds a fresh context before each phase and drops it
// once every check in that phase has settled. Checks only ever borrow it, so
// nothing a check does can change what its siblings see.
//
// Error handling:
// - reqwest errors are sorted into a small FetchError enum (timeout, DNS,
//   TLS, ...) so checks can turn them into readable `error` results
// - a non-200 response is NOT an error here; each check decides what a 404
//   means for its own rule
// =============================================================================

use crate::checks::CheckInfo;
use crate::checks::CheckResult;
use crate::config::HttpSettings;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

// Some sites only render their analytics/OpenGraph tags for real browsers
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en;q=0.8";

/// Why a request did not produce a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("could not resolve hostname")]
    Dns,
    #[error("connection failed")]
    Connect,
    #[error("SSL certificate error")]
    Tls,
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        let error_string = error.to_string().to_lowercase();

        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            // reqwest reports DNS failures as connect errors
            if error_string.contains("dns") {
                FetchError::Dns
            } else {
                FetchError::Connect
            }
        } else if error_string.contains("certificate") || error_string.contains("ssl") {
            FetchError::Tls
        } else {
            FetchError::Other(error.to_string())
        }
    }
}

/// A fetched response: status, headers and the decoded body
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Page {
    // Checks only trust a plain 200 OK
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP context shared read-only by all checks of one phase
#[derive(Debug, Clone)]
pub struct FetchContext {
    client: Client,
}

impl FetchContext {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .context("failed to build the HTTP client")?;

        Ok(Self { client })
    }

    /// Plain GET with a per-request timeout
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Page, FetchError> {
        Self::send(self.client.get(url), timeout).await
    }

    /// GET that presents itself as a desktop browser
    pub async fn get_as_browser(&self, url: &str, timeout: Duration) -> Result<Page, FetchError> {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE);
        Self::send(request, timeout).await
    }

    async fn send(request: RequestBuilder, timeout: Duration) -> Result<Page, FetchError> {
        let response = request.timeout(timeout).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(Page { status, headers, body })
    }
}

impl CheckInfo {
    /// Result for a check whose own request never produced a response
    pub fn unreachable(&self, what: &str, error: &FetchError) -> CheckResult {
        match error {
            FetchError::Timeout => self.error(format!("Timed out while checking {}", what)),
            other => self.error(format!("Check failed: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Category, CheckStatus};
    use crate::config::Settings;

    #[tokio::test]
    async fn test_get_returns_status_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .with_status(404)
            .with_header("x-robots-tag", "noindex")
            .with_body("gone")
            .create_async()
            .await;

        let ctx = FetchContext::new(&Settings::default().http).unwrap();
        let page = ctx
            .get(&format!("{}/page", server.url()), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!page.is_ok());
        assert_eq!(page.status, StatusCode::NOT_FOUND);
        assert_eq!(page.header("X-Robots-Tag"), Some("noindex"));
        assert_eq!(page.body, "gone");
    }

    #[tokio::test]
    async fn test_browser_get_sends_browser_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", BROWSER_USER_AGENT)
            .match_header("accept-language", BROWSER_ACCEPT_LANGUAGE)
            .with_status(200)
            .create_async()
            .await;

        let ctx = FetchContext::new(&Settings::default().http).unwrap();
        let page = ctx
            .get_as_browser(&format!("{}/", server.url()), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(page.is_ok());
        mock.assert_async().await;
    }

    #[test]
    fn test_unreachable_distinguishes_timeout() {
        let info = CheckInfo::new("tech-demo", "Demo", Category::Technical);

        let timed_out = info.unreachable("robots.txt", &FetchError::Timeout);
        assert_eq!(timed_out.status, CheckStatus::Error);
        assert_eq!(timed_out.message, "Timed out while checking robots.txt");

        let refused = info.unreachable("robots.txt", &FetchError::Connect);
        assert_eq!(refused.message, "Check failed: connection failed");
    }
}
