// src/audit/runner.rs
// =============================================================================
// The check runner: launch a set of checks at once, wait for all of them.
//
// How it works:
// 1. Every check is spawned as its own tokio task, sharing one FetchContext
// 2. Each task is wrapped in a timeout taken from the check itself
// 3. We wait for every task to settle, then turn each into a CheckOutcome
//
// What can happen to a check, and what we report:
// - returns Ok(result)           -> Completed(result), even if status = error
// - returns Err(..)              -> Failed { kind: Errored }
// - runs past its deadline       -> Failed { kind: Timeout }  (task dropped)
// - panics                       -> Failed { kind: Crashed }
//
// A failure only ever affects its own check. Siblings keep running, and the
// runner never returns early: it is a barrier.
// =============================================================================

use crate::checks::{CheckResult, CheckSet, FetchContext};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tracing::{debug, warn};
use url::Url;

// Checks apply their own request timeouts, so normally they report a slow
// site themselves. The runner's deadline sits a little later and only fires
// for checks that hang outside their own handling.
const DEFAULT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Ran past its deadline and was abandoned
    Timeout,
    /// Panicked
    Crashed,
    /// Returned an error instead of a result
    Errored,
}

/// A check that failed outside its own error handling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureFailure {
    pub check_id: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// What the runner knows about one check once it has settled
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Completed(CheckResult),
    Failed(InfrastructureFailure),
}

impl CheckOutcome {
    #[cfg(test)]
    pub fn check_id(&self) -> &str {
        match self {
            CheckOutcome::Completed(result) => &result.id,
            CheckOutcome::Failed(failure) => &failure.check_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CheckOutcome::Failed(_))
    }
}

type Settled = Result<Result<anyhow::Result<CheckResult>, Elapsed>, JoinError>;

#[derive(Debug, Clone)]
pub struct CheckRunner {
    grace: Duration,
}

impl Default for CheckRunner {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

impl CheckRunner {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    /// Run every check concurrently and wait until all have settled.
    ///
    /// Consumes the check set: once this returns, no check is alive anymore,
    /// which is what lets channels owned by checks close.
    pub async fn run(&self, checks: CheckSet, target: &Url, ctx: Arc<FetchContext>) -> Vec<CheckOutcome> {
        let launched: Vec<_> = checks
            .into_iter()
            .map(|check| {
                let check_id = check.info().id;
                let deadline = check.timeout() + self.grace;
                let target = target.clone();
                let ctx = Arc::clone(&ctx);

                debug!(check_id, ?deadline, "launching check");
                let handle = tokio::spawn(async move {
                    tokio::time::timeout(deadline, check.evaluate(&target, &ctx)).await
                });

                (check_id, deadline, handle)
            })
            .collect();

        join_all(launched.into_iter().map(|(check_id, deadline, handle)| async move {
            settle(check_id, deadline, handle.await)
        }))
        .await
    }
}

fn settle(check_id: &str, deadline: Duration, settled: Settled) -> CheckOutcome {
    let failure = |kind: FailureKind, detail: String| {
        warn!(check_id, ?kind, %detail, "check failed outside its own handling");
        CheckOutcome::Failed(InfrastructureFailure {
            check_id: check_id.to_string(),
            kind,
            detail,
        })
    };

    match settled {
        Ok(Ok(Ok(result))) => {
            debug!(check_id, status = %result.status, "check completed");
            CheckOutcome::Completed(result)
        }
        Ok(Ok(Err(e))) => failure(FailureKind::Errored, format!("{:#}", e)),
        Ok(Err(_)) => failure(
            FailureKind::Timeout,
            format!("did not finish within {}s", deadline.as_secs_f64()),
        ),
        Err(e) if e.is_panic() => failure(FailureKind::Crashed, panic_message(e)),
        Err(e) => failure(FailureKind::Crashed, e.to_string()),
    }
}

fn panic_message(error: JoinError) -> String {
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Category, CheckInfo, CheckUnit};
    use crate::config::Settings;
    use crate::report::{build_report, split_outcomes, AuditResponse};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Utc;

    // Scripted stand-in for a real check
    enum Behaviour {
        Ok,
        ReportsError,
        Fails,
        Hangs,
        Panics,
        Slow(Duration),
    }

    struct Scripted {
        id: &'static str,
        behaviour: Behaviour,
    }

    fn scripted(id: &'static str, behaviour: Behaviour) -> Arc<dyn CheckUnit> {
        Arc::new(Scripted { id, behaviour })
    }

    #[async_trait]
    impl CheckUnit for Scripted {
        fn info(&self) -> CheckInfo {
            CheckInfo::new(self.id, self.id, Category::Technical)
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(2)
        }

        async fn evaluate(&self, _target: &Url, _ctx: &FetchContext) -> anyhow::Result<CheckResult> {
            match self.behaviour {
                Behaviour::Ok => Ok(self.info().ok("fine")),
                Behaviour::ReportsError => Ok(self.info().error("site unreachable")),
                Behaviour::Fails => Err(anyhow!("connection refused")),
                Behaviour::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(self.info().ok("too late"))
                }
                Behaviour::Panics => panic!("parser exploded"),
                Behaviour::Slow(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(self.info().ok("slow but fine"))
                }
            }
        }
    }

    fn target() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn ctx() -> Arc<FetchContext> {
        Arc::new(FetchContext::new(&Settings::default().http).unwrap())
    }

    fn find<'a>(outcomes: &'a [CheckOutcome], id: &str) -> &'a CheckOutcome {
        outcomes.iter().find(|o| o.check_id() == id).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_kind_of_settlement_is_captured() {
        let checks = vec![
            scripted("ok", Behaviour::Ok),
            scripted("reports-error", Behaviour::ReportsError),
            scripted("fails", Behaviour::Fails),
            scripted("hangs", Behaviour::Hangs),
            scripted("panics", Behaviour::Panics),
        ];

        let outcomes = CheckRunner::default().run(checks, &target(), ctx()).await;
        assert_eq!(outcomes.len(), 5);

        assert!(matches!(find(&outcomes, "ok"), CheckOutcome::Completed(_)));
        // A check-reported error is still a completed result
        match find(&outcomes, "reports-error") {
            CheckOutcome::Completed(result) => assert_eq!(result.message, "site unreachable"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let kind_of = |id: &str| match find(&outcomes, id) {
            CheckOutcome::Failed(failure) => Some(failure.kind),
            CheckOutcome::Completed(_) => None,
        };
        assert_eq!(kind_of("fails"), Some(FailureKind::Errored));
        assert_eq!(kind_of("hangs"), Some(FailureKind::Timeout));
        assert_eq!(kind_of("panics"), Some(FailureKind::Crashed));

        match find(&outcomes, "panics") {
            CheckOutcome::Failed(failure) => assert_eq!(failure.detail, "panicked: parser exploded"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_cancel_siblings() {
        // The sibling outlives the hanging check's deadline and still completes
        let checks = vec![
            scripted("hangs", Behaviour::Hangs),
            scripted("slow", Behaviour::Slow(Duration::from_millis(2500))),
        ];

        let outcomes = CheckRunner::default().run(checks, &target(), ctx()).await;

        assert!(find(&outcomes, "hangs").is_failed());
        assert!(matches!(find(&outcomes, "slow"), CheckOutcome::Completed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nine_checks_two_failures() {
        let mut checks: CheckSet = (0..7).map(|_| scripted("ok", Behaviour::Ok)).collect();
        checks.push(scripted("fails", Behaviour::Fails));
        checks.push(scripted("panics", Behaviour::Panics));

        let outcomes = CheckRunner::default().run(checks, &target(), ctx()).await;

        assert_eq!(outcomes.len(), 9);
        assert_eq!(outcomes.iter().filter(|o| o.is_failed()).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_checks_only_show_up_in_metadata() {
        // 9 launched: 6 ok, 1 reports an error, 2 fail outside their handling
        let mut checks: CheckSet = (0..6).map(|_| scripted("ok", Behaviour::Ok)).collect();
        checks.push(scripted("reports-error", Behaviour::ReportsError));
        checks.push(scripted("fails", Behaviour::Fails));
        checks.push(scripted("hangs", Behaviour::Hangs));
        let launched = checks.len();

        let outcomes = CheckRunner::default().run(checks, &target(), ctx()).await;
        let (results, failed) = split_outcomes(outcomes);
        let report = build_report(&results);
        let response = AuditResponse::assemble(report, results, launched, failed, Utc::now(), 0);

        assert_eq!(response.metadata.checks_total, 9);
        assert_eq!(response.metadata.checks_completed, 7);
        assert_eq!(response.metadata.checks_failed, 2);
        // 6 points over the 7 completed results
        assert_eq!(response.score, 8.6);
        assert_eq!(response.detailed_checks.len(), 7);
        assert!(response.detailed_checks.iter().all(|c| c.id != "fails" && c.id != "hangs"));
    }

    #[tokio::test]
    async fn test_empty_set_returns_nothing() {
        let outcomes = CheckRunner::default().run(Vec::new(), &target(), ctx()).await;
        assert!(outcomes.is_empty());
    }
}
