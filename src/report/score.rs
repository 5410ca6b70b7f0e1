// src/report/score.rs
// =============================================================================
// Turning check outcomes into a score and a report.
//
// The one rule that matters most here is the split between the two failure
// tiers:
// - a check that ran and reported `error` is a CheckResult: it sits in the
//   denominator and earns 0 points
// - a check that timed out or crashed is an infrastructure failure: it is
//   left out of the score entirely and only shows up as a count
//
// Everything in this file is pure and deterministic. The score does not
// depend on the order of the results; category order and priority ties do,
// on purpose (first occurrence wins).
// =============================================================================

use crate::audit::CheckOutcome;
use crate::checks::{CheckResult, CheckStatus, Severity};
use serde::Serialize;

const TOP_PRIORITY_LIMIT: usize = 3;

/// One report section: how many of its checks passed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub name: String,
    #[serde(rename = "score")]
    pub ok_count: usize,
    pub total: usize,
    #[serde(rename = "checks")]
    pub check_ids: Vec<String>,
}

/// An issue worth fixing first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Priority {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub check_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_checks: usize,
    pub checks_ok: usize,
    pub problems_critical: usize,
    pub problems_important: usize,
}

/// Aggregate built fresh for every audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub score: f64,
    pub categories: Vec<CategoryGroup>,
    pub top_priorities: Vec<Priority>,
    pub summary: Summary,
}

// Separates completed results from infrastructure failures.
// Returns the results (in outcome order) and how many checks failed.
pub fn split_outcomes(outcomes: Vec<CheckOutcome>) -> (Vec<CheckResult>, usize) {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut failed = 0;

    for outcome in outcomes {
        match outcome {
            CheckOutcome::Completed(result) => results.push(result),
            CheckOutcome::Failed(_) => failed += 1,
        }
    }

    (results, failed)
}

// Score from 0.0 to 10.0, one decimal place.
//
// ok = 1 point, partial = 0.5, problem/error = 0.
pub fn calculate_score(results: &[CheckResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let points: f64 = results.iter().map(|r| r.status.points()).sum();
    round_to_tenth(points / results.len() as f64 * 10.0)
}

// Rounds the exact binary value to one decimal, ties to even: 6.25 is a
// true tie and becomes 6.2, while 0.05 is stored just above 0.05 and
// becomes 0.1. Scaling by 10 first would round twice and get that wrong.
fn round_to_tenth(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

// Groups results by category, in order of first appearance
pub fn group_by_category(results: &[CheckResult]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for result in results {
        let name = result.category.as_str();
        let index = match groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                groups.push(CategoryGroup {
                    name: name.to_string(),
                    ok_count: 0,
                    total: 0,
                    check_ids: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        group.total += 1;
        if result.status == CheckStatus::Ok {
            group.ok_count += 1;
        }
        group.check_ids.push(result.id.clone());
    }

    groups
}

// Up to three problem/partial results with a severity, most severe first.
// sort_by_key is stable, so equal severities keep their original order.
pub fn top_priorities(results: &[CheckResult]) -> Vec<Priority> {
    let mut candidates: Vec<(Severity, &CheckResult)> = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Problem | CheckStatus::Partial))
        .filter_map(|r| r.severity.map(|s| (s, r)))
        .collect();

    candidates.sort_by_key(|(severity, _)| severity.rank());

    candidates
        .into_iter()
        .take(TOP_PRIORITY_LIMIT)
        .map(|(severity, r)| Priority {
            severity,
            title: r.name.clone(),
            message: r.message.clone(),
            check_id: r.id.clone(),
        })
        .collect()
}

pub fn summarize(results: &[CheckResult]) -> Summary {
    let count_severity = |s: Severity| results.iter().filter(|r| r.severity == Some(s)).count();

    Summary {
        total_checks: results.len(),
        checks_ok: results.iter().filter(|r| r.status == CheckStatus::Ok).count(),
        problems_critical: count_severity(Severity::Critical),
        problems_important: count_severity(Severity::Important),
    }
}

pub fn build_report(results: &[CheckResult]) -> Report {
    Report {
        score: calculate_score(results),
        categories: group_by_category(results),
        top_priorities: top_priorities(results),
        summary: summarize(results),
    }
}
