// src/lib.rs
// =============================================================================
// site-auditor: audits a website against a battery of SEO checks.
//
// Modules:
// - checks: the check battery and the shared HTTP fetch context
// - audit: runner, two-phase pipeline, request lifecycle, Auditor entrypoint
// - report: scoring, grouping, priorities and the response wire shapes
// - limiter: per-caller rate limiting over a trailing window
// - ledger: background persistence of requests and reports
// - config: layered settings (defaults, YAML file, environment)
// - logging: tracing subscriber setup
// =============================================================================

pub mod audit;
pub mod checks;
pub mod config;
pub mod ledger;
pub mod limiter;
pub mod logging;
pub mod report;

pub use audit::{AuditError, Auditor};
pub use config::Settings;
pub use report::AuditResponse;
