// src/checks/noindex.rs
// =============================================================================
// Is the main page hidden from search engines?
//
// Looks in two places:
// - the X-Robots-Tag response header
// - <meta name="robots" content="..."> in the page
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("tech-noindex", "Noindex Check", Category::Technical);
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Noindex;

#[async_trait]
impl CheckUnit for Noindex {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let page = match ctx.get(target.as_str(), TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("noindex", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.error("Could not load the main page"));
        }

        Ok(analyze(page.header("x-robots-tag"), &page.body))
    }
}

fn analyze(robots_header: Option<&str>, html: &str) -> CheckResult {
    if robots_header.is_some_and(|h| h.to_lowercase().contains("noindex")) {
        return INFO.problem(Severity::Critical, "Noindex found in the X-Robots-Tag HTTP header");
    }

    if meta_robots(html).is_some_and(|content| content.contains("noindex")) {
        return INFO.problem(Severity::Critical, "Noindex found in the meta robots tag on the main page");
    }

    INFO.ok("No noindex on the main page")
}

// Lowercased content of the first <meta name="robots">, if any
fn meta_robots(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    // Constant selector, known to be valid
    let selector = Selector::parse("meta[name]").unwrap();

    document
        .select(&selector)
        .find(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("robots"))
        })
        .map(|meta| meta.value().attr("content").unwrap_or("").to_lowercase())
}
