// src/checks/meta_tags.rs
// =============================================================================
// <title> and <meta name="description"> on the main page.
//
// Recommended lengths (in characters, not bytes):
// - title: 30-65
// - description: 120-160
// A missing title is critical; every other deviation is collected into one
// partial result so the message lists all of them.
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::ops::RangeInclusive;
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("content-meta", "Meta Tags", Category::Content);
const TIMEOUT: Duration = Duration::from_secs(10);

const TITLE_RANGE: RangeInclusive<usize> = 30..=65;
const DESCRIPTION_RANGE: RangeInclusive<usize> = 120..=160;

pub struct MetaTags;

#[async_trait]
impl CheckUnit for MetaTags {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let page = match ctx.get(target.as_str(), TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("meta tags", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.error("Could not load the main page"));
        }

        Ok(analyze(&page.body))
    }
}

fn analyze(html: &str) -> CheckResult {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").unwrap();
    let meta_selector = Selector::parse("meta[name]").unwrap();

    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let description = document
        .select(&meta_selector)
        .find(|m| {
            m.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("description"))
        })
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if title.is_empty() {
        return INFO.problem(Severity::Critical, "Title is missing");
    }

    let title_len = title.chars().count();
    let desc_len = description.chars().count();
    let mut issues = Vec::new();

    if title_len < *TITLE_RANGE.start() {
        issues.push(format!("Title is short ({} chars, recommended 30-65)", title_len));
    } else if title_len > *TITLE_RANGE.end() {
        issues.push(format!("Title is long ({} chars, recommended 30-65)", title_len));
    }

    if description.is_empty() {
        issues.push("Description is missing".to_string());
    } else if desc_len < *DESCRIPTION_RANGE.start() {
        issues.push(format!("Description is short ({} chars, recommended 120-160)", desc_len));
    } else if desc_len > *DESCRIPTION_RANGE.end() {
        issues.push(format!("Description is long ({} chars, recommended 120-160)", desc_len));
    }

    if issues.is_empty() {
        INFO.ok(format!(
            "Title ({} chars) and Description ({} chars) are within range",
            title_len, desc_len
        ))
    } else {
        INFO.partial(Severity::Important, issues.join("; "))
    }
}
