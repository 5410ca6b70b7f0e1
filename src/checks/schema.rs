// src/checks/schema.rs
// =============================================================================
// Schema.org JSON-LD markup across a sample of pages.
//
// This is the second-phase check. It is constructed with the page list the
// pipeline sampled (the main page plus up to 14 pages from the sitemap) and
// fetches those pages concurrently, a few at a time.
//
// Rules:
// - no page could be fetched                         -> error
// - no JSON-LD types at all                          -> problem, important
// - Organization plus at least two key types         -> ok
// - Organization but few key types                   -> partial, important
// - types present but no Organization                -> partial, important
// =============================================================================

use super::{CheckInfo, CheckResult, CheckUnit, Category, FetchContext, Severity};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

const INFO: CheckInfo = CheckInfo::new("content-schema", "Schema.org Markup", Category::Content);

const PAGE_TIMEOUT: Duration = Duration::from_secs(5);
const TIMEOUT: Duration = Duration::from_secs(30);
const CONCURRENT_PAGES: usize = 5;

const ORGANIZATION_TYPES: [&str; 2] = ["Organization", "RealEstateAgent"];
const OTHER_KEY_TYPES: [&str; 3] = ["ApartmentComplex", "Product", "BreadcrumbList"];

pub struct SchemaMarkup {
    pages: Vec<String>,
}

impl SchemaMarkup {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl CheckUnit for SchemaMarkup {
    fn info(&self) -> CheckInfo {
        INFO
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn evaluate(&self, _target: &Url, ctx: &FetchContext) -> Result<CheckResult> {
        let fetches: Vec<_> = self
            .pages
            .iter()
            .map(|url: &String| fetch_types(ctx, url))
            .collect();

        let per_page: Vec<Option<Vec<String>>> = stream::iter(fetches)
            .buffer_unordered(CONCURRENT_PAGES)
            .collect()
            .await;

        let pages_checked = per_page.iter().filter(|p| p.is_some()).count();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for schema_type in per_page.into_iter().flatten().flatten() {
            *counts.entry(schema_type).or_insert(0) += 1;
        }

        Ok(evaluate_types(pages_checked, &counts))
    }
}

// None when the page could not be loaded
async fn fetch_types(ctx: &FetchContext, url: &str) -> Option<Vec<String>> {
    match ctx.get(url, PAGE_TIMEOUT).await {
        Ok(page) if page.is_ok() => Some(extract_types(&page.body)),
        Ok(page) => {
            debug!(%url, status = %page.status, "skipping page");
            None
        }
        Err(e) => {
            debug!(%url, error = %e, "skipping page");
            None
        }
    }
}

// All JSON-LD @type values on one page. Broken JSON blocks are skipped.
fn extract_types(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();

    let mut types = Vec::new();
    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };

        match data {
            Value::Array(items) => items.iter().for_each(|item| push_types(item, &mut types)),
            item => push_types(&item, &mut types),
        }
    }
    types
}

fn push_types(item: &Value, types: &mut Vec<String>) {
    match item.get("@type") {
        Some(Value::String(t)) => types.push(t.clone()),
        Some(Value::Array(ts)) => types.extend(ts.iter().filter_map(|t| t.as_str()).map(String::from)),
        Some(_) => {}
        None if item.is_object() => types.push("Unknown".to_string()),
        None => {}
    }
}

fn evaluate_types(pages_checked: usize, counts: &BTreeMap<String, usize>) -> CheckResult {
    if pages_checked == 0 {
        return INFO.error("Could not fetch any page to check");
    }

    if counts.is_empty() {
        return INFO.problem(
            Severity::Important,
            format!("No Schema.org markup found ({} pages checked)", pages_checked),
        );
    }

    let has = |name: &str| counts.contains_key(name);
    let has_organization = ORGANIZATION_TYPES.iter().any(|t| has(t));
    let key_types = usize::from(has_organization) + OTHER_KEY_TYPES.iter().filter(|t| has(t)).count();

    let type_count = counts.len();
    let listed = counts.keys().cloned().collect::<Vec<_>>().join(", ");

    if has_organization && key_types >= 2 {
        INFO.ok(format!("Schema.org markup is set up ({} types): {}", type_count, listed))
    } else if has_organization {
        INFO.partial(
            Severity::Important,
            format!("Organization present, but few types ({}): {}", type_count, listed),
        )
    } else {
        INFO.partial(
            Severity::Important,
            format!("Markup is incomplete, no Organization ({} types): {}", type_count, listed),
        )
    }
}
