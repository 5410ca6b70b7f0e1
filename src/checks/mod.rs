// src/checks/mod.rs
// =============================================================================
// This module contains the check battery.
//
// Every check implements one trait, CheckUnit, and is registered in an
// explicit ordered list below. There is no discovery magic: if a check is not
// in `phase_one` or `phase_two`, it does not run.
//
// The contract every check follows:
// - foreseeable failures (target unreachable, non-200, unparsable content)
//   are turned into a CheckResult with status `error` and returned as Ok
// - only genuinely unexpected failures come back as Err (or a panic), and
//   the runner isolates those for that check alone
// - every check declares its own timeout; the runner honours it
//
// Submodules:
// - result: CheckResult and its status/severity/category enums
// - fetch: the shared HTTP context and request error classification
// - one file per check rule
// =============================================================================

mod analytics;
mod canonical;
mod fetch;
mod headings;
mod html_sitemap;
mod meta_tags;
mod noindex;
mod opengraph;
mod result;
mod robots;
mod schema;
mod sitemap;

pub use analytics::Analytics;
pub use canonical::Canonical;
pub use fetch::{FetchContext, FetchError, Page};
pub use headings::Headings;
pub use html_sitemap::HtmlSitemap;
pub use meta_tags::MetaTags;
pub use noindex::Noindex;
pub use opengraph::OpenGraph;
pub use result::{Category, CheckInfo, CheckResult, CheckStatus, Severity};
pub use robots::RobotsTxt;
pub use schema::SchemaMarkup;
pub use sitemap::SitemapXml;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;

/// A single, independent inspection rule
#[async_trait]
pub trait CheckUnit: Send + Sync {
    /// Identity used for every result this check reports
    fn info(&self) -> CheckInfo;

    /// How long this check may take before the runner abandons it
    fn timeout(&self) -> Duration;

    /// Inspect `target`. Foreseeable failures come back as `Ok` with an
    /// `error` status; an `Err` is treated as an infrastructure failure.
    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult>;
}

/// A registered list of checks, ready to hand to the runner
pub type CheckSet = Vec<Arc<dyn CheckUnit>>;

// The first phase: every check that needs nothing but the target.
//
// Returns the checks plus the receiving end of the sitemap's discovery
// channel. The receiver resolves once the sitemap check has published its
// URLs, or errors out if that check ends without publishing (failed, timed
// out, crashed), which callers treat as "nothing discovered".
pub fn phase_one() -> (CheckSet, oneshot::Receiver<Vec<String>>) {
    let (sitemap, discovered) = SitemapXml::with_discovery();

    let checks: CheckSet = vec![
        Arc::new(RobotsTxt),
        Arc::new(sitemap),
        Arc::new(Analytics),
        Arc::new(Noindex),
        Arc::new(MetaTags),
        Arc::new(Headings),
        Arc::new(Canonical),
        Arc::new(OpenGraph),
        Arc::new(HtmlSitemap),
    ];

    (checks, discovered)
}

// The second phase: checks that consume the pages sampled from phase one
pub fn phase_two(pages: Vec<String>) -> CheckSet {
    vec![Arc::new(SchemaMarkup::new(pages))]
}

// Resolves a root-relative path (like "/robots.txt") against the target
pub(crate) fn site_path(target: &Url, path: &str) -> Result<String> {
    Ok(target.join(path)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_one_registration_order() {
        let (checks, _discovered) = phase_one();
        let ids: Vec<&str> = checks.iter().map(|c| c.info().id).collect();
        assert_eq!(
            ids,
            vec![
                "tech-robots",
                "tech-sitemap",
                "tech-analytics",
                "tech-noindex",
                "content-meta",
                "content-headings",
                "tech-canonical",
                "content-opengraph",
                "content-sitemap-html",
            ]
        );
    }

    #[test]
    fn test_phase_two_contains_schema_check() {
        let checks = phase_two(vec!["https://example.com/".to_string()]);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].info().id, "content-schema");
    }

    #[test]
    fn test_checks_declare_distinct_timeouts() {
        let (checks, _discovered) = phase_one();
        let robots = checks[0].timeout();
        let analytics = checks[2].timeout();
        assert_eq!(robots, Duration::from_secs(5));
        assert_eq!(analytics, Duration::from_secs(15));
    }

    #[test]
    fn test_site_path_is_root_relative() {
        let target = Url::parse("https://example.com/catalog/").unwrap();
        assert_eq!(
            site_path(&target, "/robots.txt").unwrap(),
            "https://example.com/robots.txt"
        );
    }
}
