// src/checks/headings.rs
// =============================================================================
// H1/H2 structure of the main page: exactly one H1, at least one H2.
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("content-headings", "Headings", Category::Content);
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Headings;

#[async_trait]
impl CheckUnit for Headings {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let page = match ctx.get(target.as_str(), TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("headings", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.error("Could not load the main page"));
        }

        Ok(analyze(&page.body))
    }
}

fn analyze(html: &str) -> CheckResult {
    let document = Html::parse_document(html);
    let h1 = Selector::parse("h1").unwrap();
    let h2 = Selector::parse("h2").unwrap();

    let h1_count = document.select(&h1).count();
    let h2_count = document.select(&h2).count();

    match (h1_count, h2_count) {
        (0, _) => INFO.problem(Severity::Critical, "H1 is missing on the main page"),
        (1, 0) => INFO.partial(
            Severity::Enhancement,
            "H1 present, but no H2 (adding some is recommended)",
        ),
        (1, h2_count) => INFO.ok(format!("Structure is fine (1 H1, {} H2)", h2_count)),
        (h1_count, _) => INFO.partial(
            Severity::Important,
            format!("Found {} H1 headings (there should be 1)", h1_count),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;

    #[test]
    fn test_no_h1_is_critical() {
        let result = analyze("<h2>Only a subheading</h2>");
        assert_eq!(result.status, CheckStatus::Problem);
        assert_eq!(result.severity, Some(Severity::Critical));
    }

    #[test]
    fn test_several_h1_is_important() {
        let result = analyze("<h1>One</h1><h1>Two</h1><h2>Sub</h2>");
        assert_eq!(result.status, CheckStatus::Partial);
        assert_eq!(result.severity, Some(Severity::Important));
        assert_eq!(result.message, "Found 2 H1 headings (there should be 1)");
    }

    #[test]
    fn test_missing_h2_is_enhancement() {
        let result = analyze("<h1>Title</h1>");
        assert_eq!(result.severity, Some(Severity::Enhancement));
    }

    #[test]
    fn test_good_structure_is_ok() {
        let result = analyze("<h1>Title</h1><h2>A</h2><h2>B</h2>");
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.message, "Structure is fine (1 H1, 2 H2)");
    }
}
