// src/audit/mod.rs
// =============================================================================
// The orchestration entrypoint.
//
// One call to Auditor::run_audit does the following:
// 1. Ask the rate limiter. A rejection stops here: no request record, no
//    pipeline, nothing sent to the ledger
// 2. Create the request record (pending), then mark it running
// 3. Run the two-phase pipeline in its own task, so even a panic in the
//    coordinator comes back as an error instead of tearing down the caller
// 4. Score the outcomes, build the response, mark the request completed
// 5. Hand the status change and the report to the ledger (non-blocking)
//
// Submodules:
// - runner: concurrent execution of a set of checks with per-check timeouts
// - pipeline: the two phases and the page sampling between them
// - request: the audit request record and its status transitions
// =============================================================================

mod pipeline;
mod request;
mod runner;

pub use pipeline::{sample_pages, AggregatedAudit, Pipeline, PipelineError, PipelineOutput, PipelineStage};
pub use request::{AuditRequest, AuditStatus, TransitionError};
pub use runner::{CheckOutcome, CheckRunner, FailureKind, InfrastructureFailure};

use crate::config::Settings;
use crate::ledger::{LedgerEvent, LedgerHandle};
use crate::limiter::RateLimiter;
use crate::report::{AuditResponse, ErrorBody};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, info_span, Instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("audit pipeline failed: {0}")]
    PipelineFailed(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl AuditError {
    /// Wire form handed back to the caller
    pub fn to_error_body(&self) -> ErrorBody {
        match self {
            AuditError::RateLimited { retry_after_secs } => ErrorBody::rate_limited(*retry_after_secs),
            other => ErrorBody::internal(other.to_string()),
        }
    }
}

pub struct Auditor {
    settings: Arc<Settings>,
    limiter: RateLimiter,
    ledger: LedgerHandle,
}

impl Auditor {
    pub fn new(settings: Arc<Settings>, ledger: LedgerHandle) -> Self {
        let limiter = RateLimiter::new(&settings.rate_limit);
        Self {
            settings,
            limiter,
            ledger,
        }
    }

    pub async fn run_audit(&self, target: &Url, caller_id: &str) -> Result<AuditResponse, AuditError> {
        let admission = self.limiter.admit(caller_id);
        if !admission.allowed {
            return Err(AuditError::RateLimited {
                retry_after_secs: admission.retry_after_secs,
            });
        }

        let request = AuditRequest::new(caller_id, target.as_str());
        let span = info_span!("audit", request_id = %request.id, caller_id, target = %target);

        self.audit_admitted(request, target).instrument(span).await
    }

    async fn audit_admitted(&self, mut request: AuditRequest, target: &Url) -> Result<AuditResponse, AuditError> {
        self.ledger.emit(LedgerEvent::Request(request.clone()));
        request.transition(AuditStatus::Running)?;
        self.ledger.emit(LedgerEvent::Request(request.clone()));

        let started = Instant::now();
        let checked_at = Utc::now();
        info!("audit started");

        let settings = Arc::clone(&self.settings);
        let pipeline_target = target.clone();
        let pipeline = tokio::spawn(
            async move {
                let mut pipeline = Pipeline::new(settings);
                let output = pipeline.execute(&pipeline_target).await?;
                let aggregated = pipeline.aggregate(output);
                debug!(stage = %pipeline.stage(), "pipeline finished");
                Ok::<_, PipelineError>(aggregated)
            }
            .in_current_span(),
        );

        let aggregated = match pipeline.await {
            Ok(Ok(aggregated)) => aggregated,
            Ok(Err(e)) => return Err(self.fail(request, e.to_string())),
            Err(e) => return Err(self.fail(request, format!("pipeline task ended abnormally: {}", e))),
        };

        let checks_failed = aggregated.checks_failed;
        let response = AuditResponse::assemble(
            aggregated.report,
            aggregated.results,
            aggregated.checks_total,
            checks_failed,
            checked_at,
            started.elapsed().as_secs(),
        );

        request.transition(AuditStatus::Completed)?;
        info!(
            score = response.score,
            checks_total = response.metadata.checks_total,
            checks_failed,
            "audit completed"
        );

        self.ledger.emit(LedgerEvent::Request(request.clone()));
        self.ledger.emit(LedgerEvent::Report {
            request_id: request.id,
            report: Box::new(response.clone()),
        });

        Ok(response)
    }

    fn fail(&self, mut request: AuditRequest, reason: String) -> AuditError {
        error!(%reason, "audit failed");
        if let Err(e) = request.transition(AuditStatus::Failed) {
            return AuditError::Transition(e);
        }
        self.ledger.emit(LedgerEvent::Request(request));
        AuditError::PipelineFailed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{spawn_ledger, LedgerError, RequestLedger};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::task::JoinHandle;

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<LedgerEvent>>>);

    #[async_trait]
    impl RequestLedger for Recording {
        async fn record(&mut self, event: &LedgerEvent) -> Result<(), LedgerError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn auditor_with(settings: Settings) -> (Auditor, Recording, JoinHandle<()>) {
        let recording = Recording::default();
        let (handle, writer) = spawn_ledger(Box::new(recording.clone()));
        let auditor = Auditor::new(Arc::new(settings), handle);
        (auditor, recording, writer)
    }

    fn auditor() -> (Auditor, Recording, JoinHandle<()>) {
        auditor_with(Settings::default())
    }

    fn statuses(events: &[LedgerEvent]) -> Vec<AuditStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::Request(r) => Some(r.status),
                LedgerEvent::Report { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_audit_of_a_bare_site_still_reports() {
        // Every path answers 501, so every check reports a problem or an error
        let server = mockito::Server::new_async().await;
        let target = Url::parse(&server.url()).unwrap();
        let (auditor, recording, writer) = auditor();

        let response = auditor.run_audit(&target, "caller").await.unwrap();

        assert_eq!(response.metadata.checks_total, 10);
        assert_eq!(
            response.metadata.checks_completed + response.metadata.checks_failed,
            10
        );
        assert!(response.score < 5.0);
        assert!(response.top_priorities.len() <= 3);
        assert!(response.metadata.checked_at.ends_with('Z'));

        drop(auditor);
        writer.await.unwrap();

        let events = recording.0.lock().unwrap();
        assert_eq!(
            statuses(&events),
            vec![AuditStatus::Pending, AuditStatus::Running, AuditStatus::Completed]
        );
        assert!(matches!(events.last(), Some(LedgerEvent::Report { .. })));
    }

    #[tokio::test]
    async fn test_rejected_audit_leaves_no_trace() {
        let target = Url::parse("https://example.com/").unwrap();
        let (auditor, recording, writer) = auditor();

        for _ in 0..5 {
            assert!(auditor.limiter.admit("caller").allowed);
        }

        let err = auditor.run_audit(&target, "caller").await.unwrap_err();
        assert!(matches!(err, AuditError::RateLimited { retry_after_secs: 3600 }));

        let body = serde_json::to_value(err.to_error_body()).unwrap();
        assert_eq!(body["error"]["code"], "rate_limit_exceeded");
        assert_eq!(body["error"]["retry_after_sec"], 3600);

        drop(auditor);
        writer.await.unwrap();
        assert!(recording.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unusable_http_client_marks_the_request_failed() {
        // A header value with a newline makes every client build fail
        let mut settings = Settings::default();
        settings.http.user_agent = "bad\nagent".to_string();
        let (auditor, recording, writer) = auditor_with(settings);
        let target = Url::parse("https://example.com/").unwrap();

        let err = auditor.run_audit(&target, "caller").await.unwrap_err();
        assert!(matches!(err, AuditError::PipelineFailed(_)));
        assert_eq!(err.to_error_body().error.code, "internal_error");

        drop(auditor);
        writer.await.unwrap();

        let events = recording.0.lock().unwrap();
        assert_eq!(
            statuses(&events),
            vec![AuditStatus::Pending, AuditStatus::Running, AuditStatus::Failed]
        );
        assert!(!events.iter().any(|e| matches!(e, LedgerEvent::Report { .. })));
    }

    #[test]
    fn test_pipeline_failure_maps_to_internal_error() {
        let body = AuditError::PipelineFailed("tls backend unavailable".to_string()).to_error_body();
        assert_eq!(body.error.code, "internal_error");
        assert!(body.error.message.contains("tls backend unavailable"));
        assert!(body.error.retry_after_sec.is_none());
    }
}
