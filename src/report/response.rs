// src/report/response.rs
// =============================================================================
// The JSON shapes handed back to callers.
//
// AuditResponse is the wire form of a finished audit: the report flattened
// to the top level, every check result, and run metadata. ErrorBody is the
// wire form of a rejected or failed audit.
// =============================================================================

use super::score::{CategoryGroup, Priority, Report};
use crate::checks::CheckResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub checked_at: String,
    pub processing_time_sec: u64,
    pub checks_total: usize,
    pub checks_completed: usize,
    pub checks_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditResponse {
    pub score: f64,
    pub problems_critical: usize,
    pub problems_important: usize,
    pub checks_ok: usize,
    pub categories: Vec<CategoryGroup>,
    pub top_priorities: Vec<Priority>,
    pub detailed_checks: Vec<CheckResult>,
    pub metadata: Metadata,
}

impl AuditResponse {
    // `checks_total` is every check launched; results + failed == launched
    // whenever each launched check produced exactly one outcome.
    pub fn assemble(
        report: Report,
        results: Vec<CheckResult>,
        checks_total: usize,
        checks_failed: usize,
        checked_at: DateTime<Utc>,
        processing_time_sec: u64,
    ) -> Self {
        let metadata = Metadata {
            checked_at: checked_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            processing_time_sec,
            checks_total,
            checks_completed: results.len(),
            checks_failed,
        };

        Self {
            score: report.score,
            problems_critical: report.summary.problems_critical,
            problems_important: report.summary.problems_important,
            checks_ok: report.summary.checks_ok,
            categories: report.categories,
            top_priorities: report.top_priorities,
            detailed_checks: results,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_sec: Option<u64>,
}

/// `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl ErrorBody {
    pub fn rate_limited(retry_after_sec: u64) -> Self {
        Self {
            error: ErrorDetail {
                code: "rate_limit_exceeded".to_string(),
                message: "Audit limit exceeded for this caller. Try again later.".to_string(),
                retry_after_sec: Some(retry_after_sec),
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: "internal_error".to_string(),
                message: message.into(),
                retry_after_sec: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Category, CheckInfo, Severity};
    use crate::report::build_report;
    use chrono::TimeZone;

    #[test]
    fn test_response_has_the_wire_shape() {
        let robots = CheckInfo::new("tech-robots", "Robots.txt", Category::Technical);
        let meta = CheckInfo::new("content-meta", "Meta Tags", Category::Content);
        let results = vec![
            robots.ok("found"),
            meta.problem(Severity::Critical, "Title is missing"),
        ];
        let report = build_report(&results);
        let checked_at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 30, 0).unwrap();

        let response = AuditResponse::assemble(report, results, 3, 1, checked_at, 7);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["score"], 5.0);
        assert_eq!(json["problems_critical"], 1);
        assert_eq!(json["problems_important"], 0);
        assert_eq!(json["checks_ok"], 1);
        assert_eq!(json["categories"].as_array().unwrap().len(), 2);
        assert_eq!(json["top_priorities"][0]["title"], "Meta Tags");
        assert_eq!(json["top_priorities"][0]["severity"], "critical");
        assert_eq!(json["detailed_checks"][1]["id"], "content-meta");
        assert!(json["detailed_checks"][0].get("severity").is_none());
        assert_eq!(json["metadata"]["checked_at"], "2026-10-16T12:30:00.000000Z");
        assert_eq!(json["metadata"]["processing_time_sec"], 7);
        assert_eq!(json["metadata"]["checks_total"], 3);
        assert_eq!(json["metadata"]["checks_completed"], 2);
        assert_eq!(json["metadata"]["checks_failed"], 1);
    }

    #[test]
    fn test_rate_limit_body() {
        let json = serde_json::to_value(ErrorBody::rate_limited(3600)).unwrap();
        assert_eq!(json["error"]["code"], "rate_limit_exceeded");
        assert_eq!(json["error"]["retry_after_sec"], 3600);
    }

    #[test]
    fn test_internal_error_body_has_no_retry() {
        let json = serde_json::to_value(ErrorBody::internal("boom")).unwrap();
        assert_eq!(json["error"]["code"], "internal_error");
        assert!(json["error"].get("retry_after_sec").is_none());
    }
}
