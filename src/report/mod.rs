// src/report/mod.rs
// =============================================================================
// This module turns settled check outcomes into what the caller sees.
//
// Submodules:
// - score: the score, category groups, top priorities and summary counts
// - response: the JSON response and error shapes
// =============================================================================

mod response;
mod score;

pub use response::{AuditResponse, ErrorBody, ErrorDetail, Metadata};
pub use score::{
    build_report, calculate_score, group_by_category, split_outcomes, summarize, top_priorities,
    CategoryGroup, Priority, Report, Summary,
};
