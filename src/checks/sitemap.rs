// src/checks/sitemap.rs
// =============================================================================
// sitemap.xml: is it there, and does it list pages?
//
// This is the one phase-one check with a side output. When the sitemap lists
// pages, their <loc> URLs are published through a oneshot channel so the
// second phase can sample them. If the check fails or finds nothing, the
// sender is simply dropped and the receiver sees "nothing discovered".
//
// Rules:
// - anything but 200                              -> problem, critical
// - <urlset> with <url> entries                   -> ok (publishes URLs)
// - <sitemapindex> with <sitemap> entries         -> partial, enhancement
//   (nested sitemaps are not followed)
// - a sitemap document with no entries            -> problem, important
// - not a sitemap document at all                 -> problem, critical
// =============================================================================

use super::{site_path, CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("tech-sitemap", "Sitemap.xml", Category::Technical);
const TIMEOUT: Duration = Duration::from_secs(10);

// Namespace prefixes ("ns:url") are allowed on every element
static DOCUMENT_ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(?:[\w.-]+:)?(urlset|sitemapindex)\b").expect("static regex"));
static URL_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<\s*(?:[\w.-]+:)?url\b[^>]*>(.*?)</\s*(?:[\w.-]+:)?url\s*>").expect("static regex")
});
static SITEMAP_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(?:[\w.-]+:)?sitemap\b[^>]*>").expect("static regex"));
static LOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<\s*(?:[\w.-]+:)?loc\s*>\s*(.*?)\s*</\s*(?:[\w.-]+:)?loc\s*>").expect("static regex")
});

pub struct SitemapXml {
    discovered: Mutex<Option<oneshot::Sender<Vec<String>>>>,
}

impl SitemapXml {
    /// A sitemap check wired to a discovery channel
    pub fn with_discovery() -> (Self, oneshot::Receiver<Vec<String>>) {
        let (tx, rx) = oneshot::channel();
        let check = Self {
            discovered: Mutex::new(Some(tx)),
        };
        (check, rx)
    }

    // Sends the discovered URLs at most once; later calls are no-ops
    fn publish(&self, urls: Vec<String>) {
        let sender = match self.discovered.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        if let Some(tx) = sender {
            debug!(count = urls.len(), "publishing sitemap URLs");
            // The pipeline may already have given up on us
            let _ = tx.send(urls);
        }
    }
}

#[async_trait]
impl CheckUnit for SitemapXml {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let url = site_path(target, "/sitemap.xml")?;

        let page = match ctx.get(&url, TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("sitemap.xml", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.problem(Severity::Critical, "sitemap.xml not found"));
        }

        let (result, urls) = analyze(&page.body);
        if !urls.is_empty() {
            self.publish(urls);
        }

        Ok(result)
    }
}

// Classifies the document and extracts the page URLs it lists
fn analyze(body: &str) -> (CheckResult, Vec<String>) {
    if !DOCUMENT_ROOT.is_match(body) {
        let result = INFO.problem(
            Severity::Critical,
            "sitemap.xml found, but it is not a valid sitemap document",
        );
        return (result, Vec::new());
    }

    let entries: Vec<&str> = URL_ENTRY
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if !entries.is_empty() {
        let urls: Vec<String> = entries
            .iter()
            .filter_map(|entry| LOC.captures(entry))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().replace("&amp;", "&"))
            .filter(|loc| !loc.is_empty())
            .collect();

        let result = INFO.ok(format!("sitemap.xml found, lists {} URLs", entries.len()));
        return (result, urls);
    }

    let nested = SITEMAP_ENTRY.find_iter(body).count();
    let result = if nested > 0 {
        INFO.partial(
            Severity::Enhancement,
            format!("Sitemap index with {} sitemaps found (nested sitemaps are not checked)", nested),
        )
    } else {
        INFO.problem(Severity::Important, "sitemap.xml found, but it lists no URLs")
    };

    (result, Vec::new())
}
