// src/checks/analytics.rs
// =============================================================================
// Analytics counters on the main page (Yandex.Metrika, Google Analytics).
//
// This is a plain substring scan of the lowercased HTML. Sites that inject
// their counters from JavaScript can produce false negatives, so when the
// page looks like a JS-rendered app the problem message says so.
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("tech-analytics", "Analytics", Category::Technical);

// Full page fetch with browser headers; these pages tend to be heavy
const TIMEOUT: Duration = Duration::from_secs(15);

const YANDEX_MARKERS: &[&str] = &["mc.yandex.ru/metrika", "metrika/tag.js", "metrika/watch.js"];
const GOOGLE_MARKERS: &[&str] = &[
    "googletagmanager.com/gtag",
    "google-analytics.com/analytics.js",
    "gtag(",
];
const JS_FRAMEWORK_MARKERS: &[&str] = &[r#"id="root""#, r#"id="__next""#, r#"id="app""#, "react", "vue"];

pub struct Analytics;

#[async_trait]
impl CheckUnit for Analytics {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let page = match ctx.get_as_browser(target.as_str(), TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("analytics", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.error("Could not load the main page"));
        }

        Ok(analyze(&page.body))
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn analyze(html: &str) -> CheckResult {
    let html = html.to_lowercase();

    let has_yandex = contains_any(&html, YANDEX_MARKERS);
    let has_google = contains_any(&html, GOOGLE_MARKERS);

    match (has_yandex, has_google) {
        (true, true) => INFO.ok("Installed: Yandex.Metrika and Google Analytics"),
        (true, false) => INFO.ok("Installed: Yandex.Metrika"),
        (false, true) => INFO.ok("Installed: Google Analytics"),
        (false, false) => {
            let disclaimer = if contains_any(&html, JS_FRAMEWORK_MARKERS) {
                " (the site renders with JavaScript, the result may be inaccurate)"
            } else {
                ""
            };
            INFO.problem(
                Severity::Important,
                format!("No analytics counters found{}", disclaimer),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;

    #[test]
    fn test_detects_both_counters() {
        let html = r#"
            <script src="https://mc.yandex.ru/metrika/tag.js"></script>
            <script async src="https://www.googletagmanager.com/gtag/js?id=G-1"></script>
        "#;
        let result = analyze(html);
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.message, "Installed: Yandex.Metrika and Google Analytics");
    }

    #[test]
    fn test_detects_google_only() {
        let result = analyze("<script>GTAG('config', 'G-1');</script>");
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.message, "Installed: Google Analytics");
    }

    #[test]
    fn test_missing_counters_on_js_app_mentions_rendering() {
        let result = analyze(r#"<div id="root"></div>"#);
        assert_eq!(result.status, CheckStatus::Problem);
        assert_eq!(result.severity, Some(Severity::Important));
        assert!(result.message.contains("JavaScript"));
    }

    #[test]
    fn test_missing_counters_on_static_page() {
        let result = analyze("<html><body><h1>Hello</h1></body></html>");
        assert_eq!(result.message, "No analytics counters found");
    }
}
