// src/audit/pipeline.rs
// =============================================================================
// The two-phase pipeline.
//
//   Idle -> Phase1Running -> Phase1Settled -> Phase2Running -> Phase2Settled
//        -> Aggregated
//
// Phase 1 runs every independent check. One of them, the sitemap check,
// publishes the page URLs it found. Phase 2 waits for phase 1 to settle,
// samples pages from that list and runs the checks that need them.
//
// A missing dependency never blocks the pipeline: if the sitemap check
// failed or found nothing, phase 2 just gets the main page alone.
//
// Each phase gets its own FetchContext. It is created right before the phase
// starts and dropped as soon as the runner returns, whatever the outcomes.
// If a context cannot be built, that phase's checks are recorded as failed
// and the other phase still runs. Only when neither phase could run does the
// pipeline itself fail.
// =============================================================================

use super::runner::{CheckOutcome, CheckRunner, FailureKind, InfrastructureFailure};
use crate::checks::{self, CheckResult, CheckSet, FetchContext};
use crate::config::{HttpSettings, Settings};
use crate::report::{build_report, split_outcomes, Report};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Phase1Running,
    Phase1Settled,
    Phase2Running,
    Phase2Settled,
    Aggregated,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Phase1Running => "phase1_running",
            PipelineStage::Phase1Settled => "phase1_settled",
            PipelineStage::Phase2Running => "phase2_running",
            PipelineStage::Phase2Settled => "phase2_settled",
            PipelineStage::Aggregated => "aggregated",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no phase could run, the fetch context failed: {reason}")]
    Context { reason: String },
}

/// Everything both phases produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Phase-1 outcomes followed by phase-2 outcomes
    pub outcomes: Vec<CheckOutcome>,
    /// Number of checks launched across both phases
    pub launched: usize,
    /// How many sitemap URLs phase 1 discovered
    pub discovered: usize,
}

/// Scored outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct AggregatedAudit {
    pub report: Report,
    /// Completed results, in outcome order
    pub results: Vec<CheckResult>,
    pub checks_total: usize,
    pub checks_failed: usize,
}

type ContextFactory = Box<dyn Fn(&HttpSettings) -> anyhow::Result<FetchContext> + Send + Sync>;

pub struct Pipeline {
    settings: Arc<Settings>,
    runner: CheckRunner,
    stage: PipelineStage,
    contexts: ContextFactory,
}

impl Pipeline {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            runner: CheckRunner::default(),
            stage: PipelineStage::Idle,
            contexts: Box::new(FetchContext::new),
        }
    }

    #[cfg(test)]
    fn with_contexts(mut self, contexts: ContextFactory) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    // Runs one phase, or records every check in it as failed when the
    // phase has no fetch context. The second value is that context failure.
    async fn run_phase(&self, checks: CheckSet, target: &Url) -> (Vec<CheckOutcome>, Option<String>) {
        match (self.contexts)(&self.settings.http) {
            Ok(ctx) => (self.runner.run(checks, target, Arc::new(ctx)).await, None),
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(stage = %self.stage, %reason, "phase skipped, no fetch context");
                (unavailable(checks, &reason), Some(reason))
            }
        }
    }

    pub async fn execute(&mut self, target: &Url) -> Result<PipelineOutput, PipelineError> {
        // Phase 1
        let (phase_one, discovery) = checks::phase_one();
        let mut launched = phase_one.len();

        self.enter(PipelineStage::Phase1Running);
        let (mut outcomes, phase_one_failure) = self.run_phase(phase_one, target).await;
        self.enter(PipelineStage::Phase1Settled);

        // Every phase-1 check has been dropped by now, so this resolves
        // immediately: either with URLs or with a closed channel.
        let discovered = discovery.await.unwrap_or_default();
        let pages = sample_pages(
            target,
            &discovered,
            self.settings.sampling.extra_pages,
            &mut rand::thread_rng(),
        );
        info!(
            discovered = discovered.len(),
            sampled = pages.len(),
            phase1_failed = outcomes.iter().filter(|o| o.is_failed()).count(),
            "phase 1 settled"
        );

        // Phase 2
        let phase_two = checks::phase_two(pages);
        launched += phase_two.len();

        self.enter(PipelineStage::Phase2Running);
        let (phase_two_outcomes, phase_two_failure) = self.run_phase(phase_two, target).await;
        outcomes.extend(phase_two_outcomes);
        self.enter(PipelineStage::Phase2Settled);

        if let (Some(_), Some(reason)) = (phase_one_failure, phase_two_failure) {
            return Err(PipelineError::Context { reason });
        }

        Ok(PipelineOutput {
            outcomes,
            launched,
            discovered: discovered.len(),
        })
    }

    /// Score the settled outcomes. Infrastructure failures only count
    /// toward `checks_failed`.
    pub fn aggregate(&mut self, output: PipelineOutput) -> AggregatedAudit {
        let (results, checks_failed) = split_outcomes(output.outcomes);
        let report = build_report(&results);
        self.enter(PipelineStage::Aggregated);

        AggregatedAudit {
            report,
            results,
            checks_total: output.launched,
            checks_failed,
        }
    }
}

fn unavailable(checks: CheckSet, reason: &str) -> Vec<CheckOutcome> {
    checks
        .into_iter()
        .map(|check| {
            CheckOutcome::Failed(InfrastructureFailure {
                check_id: check.info().id.to_string(),
                kind: FailureKind::Errored,
                detail: format!("no fetch context: {}", reason),
            })
        })
        .collect()
}

// The main page, then a uniform sample without replacement of up to
// `extra` discovered URLs. Never more than 1 + extra pages.
pub fn sample_pages<R: Rng + ?Sized>(main: &Url, discovered: &[String], extra: usize, rng: &mut R) -> Vec<String> {
    let mut pages = Vec::with_capacity(1 + extra.min(discovered.len()));
    pages.push(main.to_string());
    pages.extend(
        discovered
            .choose_multiple(rng, extra.min(discovered.len()))
            .cloned(),
    );
    pages
}
