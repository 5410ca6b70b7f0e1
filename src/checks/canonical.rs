// src/checks/canonical.rs
// =============================================================================
// <link rel="canonical"> on the main page.
//
// A relative href is resolved against the target, the same way a crawler
// would. The canonical must point at the target's own host and port.
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("tech-canonical", "Canonical URL", Category::Technical);
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Canonical;

#[async_trait]
impl CheckUnit for Canonical {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let page = match ctx.get(target.as_str(), TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("canonical URL", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.error("Could not load the main page"));
        }

        Ok(analyze(target, &page.body))
    }
}

fn analyze(target: &Url, html: &str) -> CheckResult {
    let document = Html::parse_document(html);
    // rel is a token list ("canonical alternate" is legal)
    let selector = Selector::parse(r#"link[rel~="canonical"]"#).unwrap();

    let Some(link) = document.select(&selector).next() else {
        return INFO.problem(
            Severity::Critical,
            "Canonical URL is missing (may lead to duplicate pages)",
        );
    };

    let href = link.value().attr("href").unwrap_or("").trim();
    if href.is_empty() {
        return INFO.problem(Severity::Critical, "Canonical URL is present, but its href is empty");
    }

    let canonical = match target.join(href) {
        Ok(url) => url,
        Err(_) => {
            return INFO.problem(
                Severity::Critical,
                format!("Canonical URL is not a valid URL: {}", href),
            )
        }
    };

    if canonical.host_str() != target.host_str() {
        return INFO.problem(
            Severity::Critical,
            format!(
                "Canonical URL points to another domain: {}",
                canonical.host_str().unwrap_or("")
            ),
        );
    }

    // An explicit default port (":443" on https) is the same origin
    if canonical.port_or_known_default() != target.port_or_known_default() {
        return INFO.problem(
            Severity::Critical,
            format!(
                "Canonical URL points to another port: {}",
                canonical.port_or_known_default().map_or_else(String::new, |p| p.to_string())
            ),
        );
    }

    INFO.ok("Canonical URL is set correctly")
}
