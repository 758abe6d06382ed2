//! Convergence controller: the score, revise, re-score loop.
//!
//! One run is strictly sequential. State is checkpointed after
//! initialisation and after every iteration, so a run can be resumed from
//! its last completed iteration after a crash or a cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, RunError};
use crate::domain::models::{
    BestDraft, Config, ConvergenceConfig, Draft, IterationRecord, RegressionPolicy, RunPhase,
    RunReport, RunState, Termination, UsageSnapshot, Verdict,
};
use crate::domain::ports::{CheckpointStore, PaperRetriever};
use crate::services::gateway::{RequestGateway, RunUsage};
use crate::services::reviser::TargetedReviser;
use crate::services::scorer::QualityScorer;
use crate::services::seed_writer::SeedWriter;

/// Cooperative cancellation flag for one run.
///
/// Checked when the controller enters scoring and revising; a gateway call
/// already in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct RunHandle {
    cancelled: Arc<AtomicBool>,
}

impl RunHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Whether `verdict` satisfies the convergence predicate on its own.
pub fn meets_threshold(verdict: &Verdict, threshold: f64) -> bool {
    !verdict.is_degraded() && !verdict.has_critical_issue && verdict.overall_score() >= threshold
}

pub struct ConvergenceController {
    scorer: QualityScorer,
    reviser: TargetedReviser,
    seed_writer: SeedWriter,
    store: Arc<dyn CheckpointStore>,
    config: ConvergenceConfig,
    seed_sections: usize,
}

impl ConvergenceController {
    pub fn new(
        config: &Config,
        gateway: Arc<RequestGateway>,
        retriever: Arc<dyn PaperRetriever>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            scorer: QualityScorer::new(gateway.clone(), config.scoring.clone()),
            reviser: TargetedReviser::new(
                gateway.clone(),
                retriever.clone(),
                config.revision.clone(),
            ),
            seed_writer: SeedWriter::new(gateway, retriever),
            store,
            config: config.convergence.clone(),
            seed_sections: config.revision.seed_sections,
        }
    }

    /// Start a new run on `topic`.
    ///
    /// Without a supplied draft a seed draft is generated first. A run id is
    /// generated when none is given.
    pub async fn run(
        &self,
        topic: &str,
        draft: Option<Draft>,
        run_id: Option<String>,
        handle: &RunHandle,
    ) -> Result<RunReport, RunError> {
        let usage = RunUsage::new(UsageSnapshot::default());
        usage
            .scope(self.start(topic, draft, run_id, handle, &usage))
            .await
    }

    async fn start(
        &self,
        topic: &str,
        draft: Option<Draft>,
        run_id: Option<String>,
        handle: &RunHandle,
        usage: &RunUsage,
    ) -> Result<RunReport, RunError> {
        let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let draft = match draft {
            Some(draft) => draft,
            None => {
                info!(%run_id, topic, sections = self.seed_sections, "generating seed draft");
                self.seed_writer.write(topic, self.seed_sections).await
            }
        };

        let mut state = RunState::new(run_id, draft);
        self.checkpoint(&mut state, None, usage).await?;
        info!(run_id = %state.run_id, "run initialised");

        self.drive(state, None, handle, usage).await
    }

    /// Continue a checkpointed run. Terminal runs return their report as is.
    pub async fn resume(&self, run_id: &str, handle: &RunHandle) -> Result<RunReport, RunError> {
        let state = self
            .store
            .load(run_id)
            .await
            .map_err(|source| RunError::Storage {
                run_id: run_id.to_string(),
                last_checkpointed_iteration: None,
                source,
            })?
            .ok_or_else(|| RunError::NotFound(run_id.to_string()))?;

        if state.phase.is_terminal() {
            info!(run_id, phase = %state.phase, "run already finished");
            return Ok(state.report());
        }

        info!(run_id, next_iteration = state.next_iteration(), "resuming run");
        let last = state.last_iteration();
        let usage = RunUsage::new(state.usage.clone());
        usage.scope(self.drive(state, last, handle, &usage)).await
    }

    /// Load the checkpointed report for a run without continuing it.
    pub async fn report(&self, run_id: &str) -> Result<RunReport, RunError> {
        self.store
            .load(run_id)
            .await
            .map_err(|source| RunError::Storage {
                run_id: run_id.to_string(),
                last_checkpointed_iteration: None,
                source,
            })?
            .map(|state| state.report())
            .ok_or_else(|| RunError::NotFound(run_id.to_string()))
    }

    #[instrument(skip_all, fields(run_id = %state.run_id))]
    async fn drive(
        &self,
        mut state: RunState,
        mut last_checkpointed: Option<u32>,
        handle: &RunHandle,
        usage: &RunUsage,
    ) -> Result<RunReport, RunError> {
        state.termination = None;
        loop {
            if handle.is_cancelled() {
                return self.cancel(state, last_checkpointed, usage).await;
            }

            state.phase = RunPhase::Scoring;
            let iteration = state.next_iteration();
            let started = Instant::now();
            let verdict = self.scorer.score(&state.draft).await;
            let overall = verdict.overall_score();
            // degraded scores are placeholders and take no part in regression
            let regressed = !verdict.is_degraded()
                && state
                    .trace
                    .iter()
                    .rev()
                    .find(|previous| !previous.verdict.is_degraded())
                    .is_some_and(|previous| overall < previous.overall_score);

            let passes = if meets_threshold(&verdict, self.config.threshold) {
                state.consecutive_passes + 1
            } else {
                0
            };

            let improves_best = state
                .best
                .as_ref()
                .is_none_or(|best| overall > best.overall_score);
            let new_best = (!verdict.is_degraded() && improves_best).then(|| BestDraft {
                iteration,
                overall_score: overall,
                verdict: verdict.clone(),
                draft: state.draft.clone(),
            });

            info!(
                iteration,
                overall,
                degraded = verdict.is_degraded(),
                critical = verdict.has_critical_issue,
                regressed,
                "draft scored"
            );
            if regressed {
                warn!(iteration, overall, "overall score regressed");
            }

            let mut record = IterationRecord {
                iteration,
                overall_score: overall,
                duration_ms: 0,
                targeted: Vec::new(),
                revision_notes: Vec::new(),
                regressed,
                draft_digest: state.draft.digest(),
                verdict,
            };

            let terminal =
                passes >= self.config.stable_iterations || iteration >= self.config.iteration_cap;
            if handle.is_cancelled() && !terminal {
                // the record is dropped; resume re-scores this draft from cache
                return self.cancel(state, last_checkpointed, usage).await;
            }

            state.consecutive_passes = passes;
            if let Some(best) = new_best {
                state.best = Some(best);
            }

            if state.consecutive_passes >= self.config.stable_iterations {
                record.duration_ms = started.elapsed().as_millis() as u64;
                state.trace.push(record);
                return self
                    .finish(state, Termination::Converged, last_checkpointed, usage)
                    .await;
            }

            if iteration >= self.config.iteration_cap {
                record.duration_ms = started.elapsed().as_millis() as u64;
                state.trace.push(record);
                return self
                    .finish(state, Termination::Exhausted, last_checkpointed, usage)
                    .await;
            }

            state.phase = RunPhase::Revising;
            let rollback = regressed && self.config.regression_policy == RegressionPolicy::Rollback;
            let (base_draft, base_verdict) = match (&state.best, rollback) {
                (Some(best), true) => {
                    info!(iteration, best_iteration = best.iteration, "rolling back to best draft");
                    (&best.draft, &best.verdict)
                }
                _ => (&state.draft, &record.verdict),
            };

            let targets = self.reviser.select_targets(base_verdict);
            let next_draft = if targets.is_empty() {
                info!(iteration, "no dimension needs repair, skipping revision");
                base_draft.clone()
            } else {
                info!(iteration, targets = ?targets, "revising draft");
                self.reviser
                    .revise_dimensions(base_draft, base_verdict, &targets)
                    .await
            };

            record.targeted = targets;
            record.revision_notes = next_draft.notes.clone();
            record.duration_ms = started.elapsed().as_millis() as u64;
            state.trace.push(record);
            state.draft = next_draft;

            self.checkpoint(&mut state, last_checkpointed, usage).await?;
            last_checkpointed = Some(iteration);
        }
    }

    async fn finish(
        &self,
        mut state: RunState,
        termination: Termination,
        last_checkpointed: Option<u32>,
        usage: &RunUsage,
    ) -> Result<RunReport, RunError> {
        state.termination = Some(termination);
        state.phase = match termination {
            Termination::Converged => RunPhase::Converged,
            Termination::Exhausted => RunPhase::Exhausted,
            Termination::Cancelled => RunPhase::Cancelled,
        };
        self.checkpoint(&mut state, last_checkpointed, usage).await?;

        let report = state.report();
        info!(
            termination = %termination,
            iterations = report.trace.len(),
            final_score = ?report.final_score(),
            best_iteration = ?report.best_iteration,
            degraded_iterations = report.degraded_iterations,
            "run finished"
        );
        Ok(report)
    }

    async fn cancel(
        &self,
        state: RunState,
        last_checkpointed: Option<u32>,
        usage: &RunUsage,
    ) -> Result<RunReport, RunError> {
        info!(next_iteration = state.next_iteration(), "run cancelled");
        self.finish(state, Termination::Cancelled, last_checkpointed, usage)
            .await
    }

    async fn checkpoint(
        &self,
        state: &mut RunState,
        last_checkpointed: Option<u32>,
        usage: &RunUsage,
    ) -> Result<(), RunError> {
        state.usage = usage.total();
        state.touch();
        let saved: Result<(), DomainError> = self.store.save(state).await;
        if let Err(source) = saved {
            state.phase = RunPhase::Failed;
            error!(
                run_id = %state.run_id,
                last_checkpointed_iteration = ?last_checkpointed,
                error = %source,
                "checkpoint failed"
            );
            return Err(RunError::Storage {
                run_id: state.run_id.clone(),
                last_checkpointed_iteration: last_checkpointed,
                source,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DimensionScores;

    #[test]
    fn test_meets_threshold_requires_genuine_clean_verdict() {
        let good = Verdict::genuine(DimensionScores::uniform(4.2), vec![], false);
        assert!(meets_threshold(&good, 4.0));

        let critical = Verdict::genuine(DimensionScores::uniform(4.2), vec!["x".into()], true);
        assert!(!meets_threshold(&critical, 4.0));

        let low = Verdict::genuine(DimensionScores::uniform(3.9), vec![], false);
        assert!(!meets_threshold(&low, 4.0));

        assert!(!meets_threshold(&Verdict::degraded(), 1.0));
    }

    #[test]
    fn test_run_handle_is_shared_between_clones() {
        let handle = RunHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_cancelled());
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
