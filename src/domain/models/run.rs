//! Run state, the iteration trace, and the final run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::draft::{Draft, RevisionNote};
use super::usage::UsageSnapshot;
use super::verdict::{Dimension, Verdict};

/// One scored iteration of a run. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub verdict: Verdict,
    pub overall_score: f64,
    pub duration_ms: u64,
    /// Dimensions handed to the reviser after scoring; empty when none were.
    #[serde(default)]
    pub targeted: Vec<Dimension>,
    #[serde(default)]
    pub revision_notes: Vec<RevisionNote>,
    /// True when a genuine overall score fell below the last genuine one.
    #[serde(default)]
    pub regressed: bool,
    /// Digest of the draft that was scored.
    pub draft_digest: String,
}

/// Controller state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    Scoring,
    Revising,
    Converged,
    Exhausted,
    Failed,
    /// Stopped on request; resumable.
    Cancelled,
}

impl RunPhase {
    /// Terminal phases never continue on resume.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Converged | RunPhase::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Init => "init",
            RunPhase::Scoring => "scoring",
            RunPhase::Revising => "revising",
            RunPhase::Converged => "converged",
            RunPhase::Exhausted => "exhausted",
            RunPhase::Failed => "failed",
            RunPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Converged,
    /// Iteration cap reached without convergence.
    Exhausted,
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Converged => "converged",
            Termination::Exhausted => "exhausted",
            Termination::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The highest-scoring draft observed so far in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestDraft {
    pub iteration: u32,
    pub overall_score: f64,
    pub verdict: Verdict,
    pub draft: Draft,
}

/// Checkpointed state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    /// The draft to be scored next (or the last scored draft once terminal).
    pub draft: Draft,
    pub trace: Vec<IterationRecord>,
    pub phase: RunPhase,
    #[serde(default)]
    pub termination: Option<Termination>,
    #[serde(default)]
    pub best: Option<BestDraft>,
    /// Consecutive iterations satisfying the convergence predicate.
    #[serde(default)]
    pub consecutive_passes: u32,
    /// Gateway usage attributed to this run, across resumes.
    #[serde(default)]
    pub usage: UsageSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, draft: Draft) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            draft,
            trace: Vec::new(),
            phase: RunPhase::Init,
            termination: None,
            best: None,
            consecutive_passes: 0,
            usage: UsageSnapshot::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Index of the next scoring iteration.
    pub fn next_iteration(&self) -> u32 {
        self.trace.len() as u32
    }

    pub fn last_iteration(&self) -> Option<u32> {
        self.trace.last().map(|r| r.iteration)
    }

    pub fn degraded_iterations(&self) -> usize {
        self.trace.iter().filter(|r| r.verdict.is_degraded()).count()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The draft a report should present for this state.
    pub fn final_draft(&self) -> &Draft {
        match (self.termination, &self.best) {
            (Some(Termination::Exhausted), Some(best)) => &best.draft,
            _ => &self.draft,
        }
    }

    /// Score of [`final_draft`](Self::final_draft), if it has been scored.
    pub fn final_score(&self) -> Option<f64> {
        match (self.termination, &self.best) {
            (Some(Termination::Exhausted), Some(best)) => Some(best.overall_score),
            _ => self.trace.last().map(|r| r.overall_score),
        }
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id.clone(),
            final_draft: self.final_draft().clone(),
            trace: self.trace.clone(),
            converged: self.termination == Some(Termination::Converged),
            termination: self.termination,
            phase: self.phase,
            best_iteration: self.best.as_ref().map(|b| b.iteration),
            degraded_iterations: self.degraded_iterations(),
            gateway: self.usage.clone(),
        }
    }
}

/// Outcome of a run handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub final_draft: Draft,
    pub trace: Vec<IterationRecord>,
    pub converged: bool,
    pub termination: Option<Termination>,
    pub phase: RunPhase,
    pub best_iteration: Option<u32>,
    pub degraded_iterations: usize,
    pub gateway: UsageSnapshot,
}

impl RunReport {
    pub fn scoring_calls(&self) -> usize {
        self.trace.len()
    }

    /// Score of the draft the report presents: the best one when exhausted.
    pub fn final_score(&self) -> Option<f64> {
        let presented = match (self.termination, self.best_iteration) {
            (Some(Termination::Exhausted), Some(best)) => {
                self.trace.iter().find(|r| r.iteration == best)
            }
            _ => self.trace.last(),
        };
        presented.map(|r| r.overall_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Section;

    fn record(iteration: u32, score: f64, degraded: bool) -> IterationRecord {
        let verdict = if degraded {
            Verdict::degraded()
        } else {
            Verdict::genuine(
                crate::domain::models::DimensionScores::uniform(score),
                vec![],
                false,
            )
        };
        IterationRecord {
            iteration,
            overall_score: verdict.overall_score(),
            verdict,
            duration_ms: 1,
            targeted: vec![],
            revision_notes: vec![],
            regressed: false,
            draft_digest: String::new(),
        }
    }

    #[test]
    fn test_next_iteration_tracks_trace_length() {
        let mut state = RunState::new("r", Draft::new("t", vec![Section::new("A", "a")]));
        assert_eq!(state.next_iteration(), 0);
        assert_eq!(state.last_iteration(), None);
        state.trace.push(record(0, 3.0, false));
        state.trace.push(record(1, 3.5, true));
        assert_eq!(state.next_iteration(), 2);
        assert_eq!(state.last_iteration(), Some(1));
        assert_eq!(state.degraded_iterations(), 1);
    }

    #[test]
    fn test_exhausted_report_uses_best_draft() {
        let current = Draft::new("t", vec![Section::new("A", "worse")]);
        let best = Draft::new("t", vec![Section::new("A", "better")]);
        let mut state = RunState::new("r", current);
        state.termination = Some(Termination::Exhausted);
        state.phase = RunPhase::Exhausted;
        state.best = Some(BestDraft {
            iteration: 1,
            overall_score: 3.9,
            verdict: Verdict::degraded(),
            draft: best.clone(),
        });

        let report = state.report();
        assert_eq!(report.final_draft, best);
        assert!(!report.converged);
        assert_eq!(report.best_iteration, Some(1));
    }

    #[test]
    fn test_final_score_follows_presented_draft() {
        let mut state = RunState::new("r", Draft::new("t", vec![Section::new("A", "a")]));
        state.trace.push(record(0, 3.0, false));
        state.trace.push(record(1, 3.9, false));
        state.trace.push(record(2, 3.4, false));
        state.best = Some(BestDraft {
            iteration: 1,
            overall_score: 3.9,
            verdict: state.trace[1].verdict.clone(),
            draft: state.draft.clone(),
        });

        state.termination = Some(Termination::Cancelled);
        let cancelled = state.report().final_score().unwrap();
        assert!((cancelled - 3.4).abs() < 1e-9);

        state.termination = Some(Termination::Exhausted);
        let exhausted = state.report().final_score().unwrap();
        assert!((exhausted - 3.9).abs() < 1e-9);
        assert_eq!(state.final_score(), Some(3.9));
    }

    #[test]
    fn test_report_carries_persisted_usage() {
        let mut state = RunState::new("r", Draft::new("t", vec![Section::new("A", "a")]));
        state.usage.invocations = 7;
        let json = serde_json::to_string(&state).unwrap();
        let restored: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.report().gateway.invocations, 7);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(RunPhase::Converged.is_terminal());
        assert!(RunPhase::Exhausted.is_terminal());
        assert!(!RunPhase::Cancelled.is_terminal());
        assert!(!RunPhase::Scoring.is_terminal());
    }
}
