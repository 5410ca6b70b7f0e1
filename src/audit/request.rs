// src/audit/request.rs
// =============================================================================
// One audit request and its lifecycle:
//
//   pending -> running -> completed
//                      \-> failed
//
// completed and failed are terminal. Any other move is refused.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AuditStatus {
    fn can_become(self, next: AuditStatus) -> bool {
        matches!(
            (self, next),
            (AuditStatus::Pending, AuditStatus::Running)
                | (AuditStatus::Running, AuditStatus::Completed)
                | (AuditStatus::Running, AuditStatus::Failed)
        )
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Running => "running",
            AuditStatus::Completed => "completed",
            AuditStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audit request {id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub id: Uuid,
    pub from: AuditStatus,
    pub to: AuditStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRequest {
    pub id: Uuid,
    pub caller_id: String,
    pub target_url: String,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditRequest {
    pub fn new(caller_id: impl Into<String>, target_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            caller_id: caller_id.into(),
            target_url: target_url.into(),
            status: AuditStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: AuditStatus) -> Result<(), TransitionError> {
        if !self.status.can_become(next) {
            return Err(TransitionError {
                id: self.id,
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut request = AuditRequest::new("caller", "https://example.com/");
        assert_eq!(request.status, AuditStatus::Pending);

        request.transition(AuditStatus::Running).unwrap();
        request.transition(AuditStatus::Completed).unwrap();
        assert_eq!(request.status, AuditStatus::Completed);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut request = AuditRequest::new("caller", "https://example.com/");
        request.transition(AuditStatus::Running).unwrap();
        request.transition(AuditStatus::Failed).unwrap();

        let err = request.transition(AuditStatus::Running).unwrap_err();
        assert_eq!(err.from, AuditStatus::Failed);
        assert_eq!(err.to, AuditStatus::Running);
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut request = AuditRequest::new("caller", "https://example.com/");
        assert!(request.transition(AuditStatus::Completed).is_err());
        assert_eq!(request.status, AuditStatus::Pending);
    }
}
