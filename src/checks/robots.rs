// src/checks/robots.rs
// =============================================================================
// robots.txt: is it there, and does it name crawlers and a sitemap?
//
// Rules:
// - no robots.txt (anything but 200)     -> problem, critical
// - has "User-agent:" and "Sitemap:"     -> ok
// - has "User-agent:" only               -> partial, important
// - neither                              -> problem, critical
// =============================================================================

use super::{site_path, CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("tech-robots", "Robots.txt", Category::Technical);

// Auxiliary lookup: keep it short
const TIMEOUT: Duration = Duration::from_secs(5);

pub struct RobotsTxt;

#[async_trait]
impl CheckUnit for RobotsTxt {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let url = site_path(target, "/robots.txt")?;

        let page = match ctx.get(&url, TIMEOUT).await {
            Ok(page) => page,
            Err(e) => return Ok(INFO.unreachable("robots.txt", &e)),
        };

        if !page.is_ok() {
            return Ok(INFO.problem(Severity::Critical, "robots.txt not found"));
        }

        Ok(analyze(&page.body))
    }
}

fn analyze(content: &str) -> CheckResult {
    let content = content.to_lowercase();
    let has_user_agent = content.contains("user-agent:");
    let has_sitemap = content.contains("sitemap:");

    match (has_user_agent, has_sitemap) {
        (true, true) => INFO.ok("robots.txt found, contains User-agent and Sitemap"),
        (true, false) => INFO.partial(
            Severity::Important,
            "robots.txt found, but the Sitemap directive is missing",
        ),
        _ => INFO.problem(
            Severity::Critical,
            "robots.txt found, but the User-agent directive is missing",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;
    use crate::config::Settings;

    #[test]
    fn test_complete_robots_is_ok() {
        let result = analyze("User-agent: *\nDisallow: /admin\nSitemap: https://example.com/sitemap.xml");
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.severity, None);
    }

    #[test]
    fn test_missing_sitemap_is_partial() {
        let result = analyze("USER-AGENT: *\nDisallow:");
        assert_eq!(result.status, CheckStatus::Partial);
        assert_eq!(result.severity, Some(Severity::Important));
    }

    #[test]
    fn test_missing_user_agent_is_critical() {
        let result = analyze("Sitemap: https://example.com/sitemap.xml");
        assert_eq!(result.status, CheckStatus::Problem);
        assert_eq!(result.severity, Some(Severity::Critical));
    }

    #[tokio::test]
    async fn test_missing_file_is_critical_problem() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/robots.txt")
            .with_status(404)
            .create_async()
            .await;

        let ctx = FetchContext::new(&Settings::default().http).unwrap();
        let target = Url::parse(&server.url()).unwrap();
        let result = RobotsTxt.evaluate(&target, &ctx).await.unwrap();

        assert_eq!(result.id, "tech-robots");
        assert_eq!(result.status, CheckStatus::Problem);
        assert_eq!(result.severity, Some(Severity::Critical));
    }
}
