//! End-to-end convergence loop scenarios against the in-memory store.

mod common;

use std::sync::Arc;

use redraft::adapters::generators::ScriptedGenerator;
use redraft::adapters::memory::InMemoryCheckpointStore;
use redraft::domain::models::{Dimension, RegressionPolicy, RevisionOutcome, Termination};
use redraft::domain::ports::CheckpointStore;
use redraft::services::prompts::PromptKind;
use redraft::GenerationError;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{
    assert_score, config, controller, handle, one_section_draft, repair_json, scored_generator,
    verdict_json,
};

#[tokio::test]
async fn test_converges_when_threshold_is_crossed() {
    let generator = scored_generator(vec![3.26, 3.60, 3.90, 4.10]);
    let store = Arc::new(InMemoryCheckpointStore::new());
    let controller = controller(&config(4.0, 5), generator.clone(), store.clone());

    let report = controller
        .run("rag", Some(one_section_draft()), Some("conv".into()), &handle())
        .await
        .unwrap();

    assert!(report.converged);
    assert_eq!(report.termination, Some(Termination::Converged));
    assert_eq!(report.trace.len(), 4);
    assert_eq!(report.trace[3].iteration, 3);
    assert_score(report.final_score().unwrap(), 4.10);
    assert_eq!(report.best_iteration, Some(3));
    assert_eq!(report.degraded_iterations, 0);
    assert_eq!(generator.calls_of_kind(PromptKind::Score), 4);
    // no revision after the converging score
    assert!(report.trace[3].targeted.is_empty());
    // init plus one checkpoint per iteration
    assert_eq!(store.save_count(), 5);
}

#[tokio::test]
async fn test_uniform_scores_target_every_dimension_in_repair_order() {
    let generator = scored_generator(vec![3.0, 4.5]);
    let controller = controller(
        &config(4.0, 5),
        generator.clone(),
        Arc::new(InMemoryCheckpointStore::new()),
    );

    let report = controller
        .run("rag", Some(one_section_draft()), None, &handle())
        .await
        .unwrap();

    let first = &report.trace[0];
    assert_eq!(
        first.targeted,
        vec![
            Dimension::Insight,
            Dimension::Coherence,
            Dimension::Structure,
            Dimension::Coverage,
            Dimension::Citations,
        ]
    );
    assert_eq!(first.revision_notes.len(), 5);
    // structure repairs may not rewrite bodies
    let structure = first
        .revision_notes
        .iter()
        .find(|n| n.dimension == Some(Dimension::Structure))
        .unwrap();
    assert!(matches!(structure.outcome, RevisionOutcome::Malformed { .. }));
    let insight = &first.revision_notes[0];
    assert!(matches!(insight.outcome, RevisionOutcome::Applied { .. }));
    assert_eq!(generator.repair_calls(), 5);
}

#[tokio::test]
async fn test_exhaustion_returns_best_draft() {
    let generator = scored_generator(vec![3.0, 3.8, 3.4, 3.2]);
    let store = Arc::new(InMemoryCheckpointStore::new());
    let controller = controller(&config(4.0, 3), generator.clone(), store.clone());

    let report = controller
        .run("rag", Some(one_section_draft()), Some("ex".into()), &handle())
        .await
        .unwrap();

    assert!(!report.converged);
    assert_eq!(report.termination, Some(Termination::Exhausted));
    // iteration_cap + 1 scoring calls
    assert_eq!(report.scoring_calls(), 4);
    assert_eq!(report.best_iteration, Some(1));
    assert_eq!(report.final_draft.digest(), report.trace[1].draft_digest);
    // the reported score belongs to the presented draft, not the last one
    assert_score(report.final_score().unwrap(), 3.8);
    assert!(!report.trace[1].regressed);
    assert!(report.trace[2].regressed);
    assert!(report.trace[3].regressed);

    let state = store.load("ex").await.unwrap().unwrap();
    // the last scored draft is kept in state; the report presents the best
    assert_eq!(state.draft.digest(), report.trace[3].draft_digest);
    assert_eq!(state.draft.revision, 3);
}

#[tokio::test]
async fn test_rollback_policy_revises_from_best_draft() {
    let generator = scored_generator(vec![3.0, 3.8, 3.4, 3.2]);
    let store = Arc::new(InMemoryCheckpointStore::new());
    let mut config = config(4.0, 3);
    config.convergence.regression_policy = RegressionPolicy::Rollback;
    let controller = controller(&config, generator, store.clone());

    let report = controller
        .run("rag", Some(one_section_draft()), Some("rb".into()), &handle())
        .await
        .unwrap();

    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.best_iteration, Some(1));
    // iteration 2 regressed, so the draft scored at iteration 3 was revised
    // from the best draft (revision 1) rather than the regressed one
    let state = store.load("rb").await.unwrap().unwrap();
    assert_eq!(state.draft.revision, 2);
}

#[tokio::test]
async fn test_degraded_scoring_never_converges() {
    let generator = Arc::new(ScriptedGenerator::always_err(
        GenerationError::Authentication("invalid key".to_string()),
    ));
    let controller = controller(
        &config(1.0, 3),
        generator.clone(),
        Arc::new(InMemoryCheckpointStore::new()),
    );

    let report = controller
        .run("rag", Some(one_section_draft()), None, &handle())
        .await
        .unwrap();

    assert!(!report.converged);
    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.trace.len(), 4);
    assert_eq!(report.degraded_iterations, report.trace.len());
    assert_eq!(report.best_iteration, None);
    assert!(report.trace.iter().all(|r| r.targeted.is_empty()));
    assert_eq!(generator.repair_calls(), 0);
    assert_eq!(report.final_draft, one_section_draft());
}

#[tokio::test]
async fn test_passing_dimensions_skip_revision() {
    let generator = scored_generator(vec![4.0]);
    let mut config = config(4.5, 2);
    config.revision.repair_threshold = 3.5;
    let controller = controller(&config, generator.clone(), Arc::new(InMemoryCheckpointStore::new()));

    let report = controller
        .run("rag", Some(one_section_draft()), None, &handle())
        .await
        .unwrap();

    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert_eq!(report.trace.len(), 3);
    assert_eq!(generator.repair_calls(), 0);
    // the unchanged draft is re-scored from the cache
    assert_eq!(generator.calls_of_kind(PromptKind::Score), 1);
    assert_eq!(report.gateway.cache_hits, 2);
    assert_eq!(report.final_draft.revision, 0);
}

#[tokio::test]
async fn test_regression_ignores_degraded_iterations() {
    // the second score call fails outright, so it is neither cached nor genuine
    let scores = [Some(3.0), None, Some(3.4), Some(3.2)];
    let score_calls = AtomicUsize::new(0);
    let repairs = AtomicUsize::new(0);
    let generator = Arc::new(ScriptedGenerator::with_handler(move |request| {
        match PromptKind::detect(&request.prompt) {
            Some(PromptKind::Score) => {
                let call = score_calls.fetch_add(1, Ordering::SeqCst);
                match scores.get(call).copied().flatten() {
                    Some(score) => Ok(verdict_json(score)),
                    None => Err(GenerationError::Authentication("expired key".to_string())),
                }
            }
            _ => Ok(repair_json(repairs.fetch_add(1, Ordering::SeqCst))),
        }
    }));
    let mut config = config(4.0, 3);
    config.convergence.regression_policy = RegressionPolicy::Rollback;
    let controller = controller(&config, generator, Arc::new(InMemoryCheckpointStore::new()));

    let report = controller
        .run("rag", Some(one_section_draft()), None, &handle())
        .await
        .unwrap();

    let regressed: Vec<bool> = report.trace.iter().map(|r| r.regressed).collect();
    assert!(report.trace[1].verdict.is_degraded());
    // 3.4 is compared with 3.0, not with the degraded 3.5 placeholder
    assert_eq!(regressed, vec![false, false, false, true]);
    assert_eq!(report.degraded_iterations, 1);
    assert_eq!(report.best_iteration, Some(2));
}

#[tokio::test]
async fn test_stable_iterations_require_consecutive_passes() {
    let generator = scored_generator(vec![4.2, 3.9, 4.2, 4.3]);
    let mut config = config(4.0, 6);
    config.convergence.stable_iterations = 2;
    let controller = controller(&config, generator, Arc::new(InMemoryCheckpointStore::new()));

    let report = controller
        .run("rag", Some(one_section_draft()), None, &handle())
        .await
        .unwrap();

    assert!(report.converged);
    assert_eq!(report.trace.len(), 4);
    assert_score(report.final_score().unwrap(), 4.3);
}

#[tokio::test]
async fn test_critical_issue_blocks_convergence() {
    let generator = Arc::new(ScriptedGenerator::with_handler(|request| {
        match PromptKind::detect(&request.prompt) {
            Some(PromptKind::Score) => Ok(serde_json::json!({
                "coverage": 4.8, "coherence": 4.8, "structure": 4.8,
                "citations": 4.8, "insight": 4.6,
                "issues": [], "critical_issues": ["fabricated reference"],
            })
            .to_string()),
            _ => Ok("no json here".to_string()),
        }
    }));
    let controller = controller(
        &config(4.0, 1),
        generator.clone(),
        Arc::new(InMemoryCheckpointStore::new()),
    );

    let report = controller
        .run("rag", Some(one_section_draft()), None, &handle())
        .await
        .unwrap();

    assert!(!report.converged);
    assert_eq!(report.termination, Some(Termination::Exhausted));
    assert!(report.trace[0].verdict.has_critical_issue);
}

#[tokio::test]
async fn test_seed_draft_is_generated_without_a_supplied_draft() {
    let generator = Arc::new(ScriptedGenerator::dry_run());
    let mut config = config(4.0, 2);
    config.revision.seed_sections = 3;
    config.revision.repair_threshold = 3.5;
    let controller = controller(&config, generator.clone(), Arc::new(InMemoryCheckpointStore::new()));

    let report = controller
        .run("retrieval-augmented generation", None, None, &handle())
        .await
        .unwrap();

    assert_eq!(generator.calls_of_kind(PromptKind::Outline), 1);
    assert_eq!(generator.calls_of_kind(PromptKind::WriteSection), 3);
    assert!(report.trace.len() <= 3);
    assert!(report.termination.is_some());
    assert!(!report.final_draft.sections.is_empty());
}
