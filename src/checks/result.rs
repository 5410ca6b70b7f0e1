// src/checks/result.rs
// =============================================================================
// The value every check produces.
//
// A CheckResult is created exactly once per completed check and never changed
// afterwards. The constructors on CheckInfo are the only way the checks build
// them, which keeps the severity rule in one place:
// - ok and error results never carry a severity
// - partial and problem results carry one
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single inspection, as reported by the check itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Everything the check looks for is in place
    Ok,
    /// Present but incomplete (scores half a point)
    Partial,
    /// Missing or wrong
    Problem,
    /// The check could not complete its own inspection
    Error,
}

impl CheckStatus {
    // Points contributed to the overall score
    pub fn points(self) -> f64 {
        match self {
            CheckStatus::Ok => 1.0,
            CheckStatus::Partial => 0.5,
            CheckStatus::Problem | CheckStatus::Error => 0.0,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Partial => "partial",
            CheckStatus::Problem => "problem",
            CheckStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// How urgent a problem is. Declaration order is the priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Important,
    Enhancement,
}

impl Severity {
    // Lower rank = shown first in top priorities
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Important => 1,
            Severity::Enhancement => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Enhancement => "enhancement",
        };
        f.write_str(label)
    }
}

/// Report section a check belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technical,
    Content,
    Structure,
    Seo,
    Social,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Content => "content",
            Category::Structure => "structure",
            Category::Seo => "seo",
            Category::Social => "social",
        }
    }
}

/// Result of one check unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Static identity of a check: its id, display name and category.
///
/// Every check keeps one of these as a constant and builds its results
/// through it, so a check can never report under someone else's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
}

impl CheckInfo {
    pub const fn new(id: &'static str, name: &'static str, category: Category) -> Self {
        Self { id, name, category }
    }

    pub fn ok(&self, message: impl Into<String>) -> CheckResult {
        self.build(CheckStatus::Ok, None, message.into())
    }

    pub fn partial(&self, severity: Severity, message: impl Into<String>) -> CheckResult {
        self.build(CheckStatus::Partial, Some(severity), message.into())
    }

    pub fn problem(&self, severity: Severity, message: impl Into<String>) -> CheckResult {
        self.build(CheckStatus::Problem, Some(severity), message.into())
    }

    pub fn error(&self, message: impl Into<String>) -> CheckResult {
        self.build(CheckStatus::Error, None, message.into())
    }

    fn build(&self, status: CheckStatus, severity: Option<Severity>, message: String) -> CheckResult {
        CheckResult {
            id: self.id.to_string(),
            name: self.name.to_string(),
            status,
            message,
            category: self.category,
            severity,
        }
    }
}
