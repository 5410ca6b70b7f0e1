// src/checks/opengraph.rs
// =============================================================================
// OpenGraph tags (og:title, og:description, og:image) on the main page.
//
// Sites disagree on whether to use property= or name=, so both count.
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("content-opengraph", "OpenGraph Tags", Category::Content);
const TIMEOUT: Duration = Duration::from_secs(15);

const REQUIRED_TAGS: [&str; 3] = ["og:title", "og:description", "og:image"];

pub struct OpenGraph;

#[async_trait]
impl CheckUnit for OpenGraph {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let page = match ctx.get_as_browser(target.as_str(), TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("OpenGraph tags", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.error("Could not load the main page"));
        }

        Ok(analyze(&page.body))
    }
}

fn analyze(html: &str) -> CheckResult {
    let document = Html::parse_document(html);
    let meta = Selector::parse("meta").unwrap();
    let app_root = Selector::parse("#root, #__next, #app").unwrap();

    let declared: Vec<String> = document
        .select(&meta)
        .filter_map(|m| m.value().attr("property").or_else(|| m.value().attr("name")))
        .map(|p| p.to_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_TAGS
        .iter()
        .copied()
        .filter(|tag| !declared.iter().any(|d| d == tag))
        .collect();

    let lowered = html.to_lowercase();
    let js_rendered = document.select(&app_root).next().is_some()
        || lowered.contains("react")
        || lowered.contains("vue");

    match missing.len() {
        0 => INFO.ok("OpenGraph tags are set (title, description, image)"),
        n if n == REQUIRED_TAGS.len() => {
            let disclaimer = if js_rendered {
                " (the site may render with JavaScript)"
            } else {
                ""
            };
            INFO.problem(
                Severity::Critical,
                format!("OpenGraph tags are missing entirely{}", disclaimer),
            )
        }
        _ => {
            let disclaimer = if js_rendered {
                " (the site may render with JavaScript, verify manually)"
            } else {
                ""
            };
            INFO.partial(
                Severity::Important,
                format!("OpenGraph: missing tags - {}{}", missing.join(", "), disclaimer),
            )
        }
    }
}
