// src/checks/html_sitemap.rs
// =============================================================================
// Human-readable HTML sitemap.
//
// Probes a few conventional paths in order and stops at the first one that
// answers 200 with at least a handful of links. Each probe has its own short
// timeout; a probe that fails just moves on to the next path.
// =============================================================================

use super::{site_path, CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("content-sitemap-html", "HTML Sitemap", Category::Content);

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
// Enough for every probe to run to its own timeout
const TIMEOUT: Duration = Duration::from_secs(25);

const CANDIDATE_PATHS: [&str; 4] = ["/sitemap/", "/sitemap.html", "/karta-sajta/", "/map/"];
const MIN_LINKS: usize = 5;

pub struct HtmlSitemap;

#[async_trait]
impl CheckUnit for HtmlSitemap {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        for path in CANDIDATE_PATHS {
            let url = site_path(target, path)?;

            let page = match ctx.get(&url, PROBE_TIMEOUT).await {
                Ok(page) => page,
                Err(e) => {
                    debug!(%url, error = %e, "HTML sitemap probe failed");
                    continue;
                }
            };

            if !page.is_ok() {
                continue;
            }

            let links = count_links(&page.body);
            if links >= MIN_LINKS {
                return Ok(INFO.ok(format!(
                    "HTML sitemap found ({}), contains {} links",
                    path, links
                )));
            }
        }

        Ok(INFO.problem(
            Severity::Important,
            format!("HTML sitemap not found (checked {})", CANDIDATE_PATHS.join(", ")),
        ))
    }
}

fn count_links(html: &str) -> usize {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a").unwrap();
    document.select(&selector).count()
}
