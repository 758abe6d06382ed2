//! Common test utilities for integration tests
//!
//! Scripted generators that answer score and repair prompts on demand, plus
//! configuration and draft fixtures shared by the controller tests.

#![allow(dead_code)]

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use redraft::adapters::generators::ScriptedGenerator;
use redraft::adapters::retrieval::KeywordCorpus;
use redraft::domain::models::{Config, Draft, Paper, RegressionPolicy, Section};
use redraft::domain::ports::CheckpointStore;
use redraft::services::prompts::PromptKind;
use redraft::{ConvergenceController, RequestGateway, RunHandle};

/// Verdict JSON scoring every dimension `score`.
pub fn verdict_json(score: f64) -> String {
    json!({
        "coverage": score,
        "coherence": score,
        "structure": score,
        "citations": score,
        "insight": score,
        "issues": ["needs more synthesis"],
        "critical_issues": [],
    })
    .to_string()
}

/// A generator that answers the n-th score prompt with `scores[n]`
/// (repeating the last) and every repair with a fresh body for section 0.
///
/// `on_score` is called with the 0-based score call index before answering.
pub fn scored_generator_with<F>(scores: Vec<f64>, on_score: F) -> Arc<ScriptedGenerator>
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let score_calls = AtomicUsize::new(0);
    let repairs = AtomicUsize::new(0);
    Arc::new(ScriptedGenerator::with_handler(move |request| {
        match PromptKind::detect(&request.prompt) {
            Some(PromptKind::Score) => {
                let call = score_calls.fetch_add(1, Ordering::SeqCst);
                on_score(call);
                let score = scores.get(call).or(scores.last()).copied().unwrap_or(3.0);
                Ok(verdict_json(score))
            }
            Some(PromptKind::Repair(_)) => {
                let n = repairs.fetch_add(1, Ordering::SeqCst);
                Ok(repair_json(n))
            }
            _ => Ok("Unused.".to_string()),
        }
    }))
}

pub fn scored_generator(scores: Vec<f64>) -> Arc<ScriptedGenerator> {
    scored_generator_with(scores, |_| {})
}

/// Config where uniform scores below 5.0 target every dimension.
pub fn config(threshold: f64, iteration_cap: u32) -> Config {
    let mut config = Config::default();
    config.convergence.threshold = threshold;
    config.convergence.iteration_cap = iteration_cap;
    config.convergence.stable_iterations = 1;
    config.convergence.regression_policy = RegressionPolicy::Continue;
    config.revision.repair_threshold = 5.0;
    config
}

pub fn one_section_draft() -> Draft {
    Draft::new(
        "retrieval-augmented generation",
        vec![Section::new("Introduction", "Original body.")],
    )
}

pub fn corpus() -> KeywordCorpus {
    KeywordCorpus::new(vec![
        Paper::new(
            "lewis2020",
            "Retrieval-augmented generation for knowledge-intensive NLP",
            "Combines a retriever with a generator.",
        ),
        Paper::new(
            "guu2020",
            "REALM: retrieval-augmented language model pre-training",
            "Pre-training with a latent retriever.",
        ),
    ])
}

pub fn controller(
    config: &Config,
    generator: Arc<ScriptedGenerator>,
    store: Arc<dyn CheckpointStore>,
) -> ConvergenceController {
    controller_on(config, Arc::new(RequestGateway::new(generator)), store)
}

/// A controller on an existing, possibly shared, gateway.
pub fn controller_on(
    config: &Config,
    gateway: Arc<RequestGateway>,
    store: Arc<dyn CheckpointStore>,
) -> ConvergenceController {
    ConvergenceController::new(config, gateway, Arc::new(corpus()), store)
}

/// Repair answer rewriting section 0.
pub fn repair_json(n: usize) -> String {
    json!({"edits": [{"section": 0, "body": format!("Revised body {n}.")}]}).to_string()
}

pub fn handle() -> RunHandle {
    RunHandle::new()
}

pub fn assert_score(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected score {expected}, got {actual}"
    );
}
