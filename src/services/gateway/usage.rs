//! Token estimation, model pricing and usage counters.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::models::{ModelTier, TierUsage, UsageSnapshot};

/// Characters per token for rough estimation.
pub const CHARS_PER_TOKEN: usize = 4;

/// Pricing per million tokens for a model family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Cost per million input tokens (USD).
    pub input: f64,
    /// Cost per million output tokens (USD).
    pub output: f64,
}

/// Known model pricing, matched by substring (USD per million tokens).
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("opus", ModelPricing { input: 15.0, output: 75.0 }),
    ("sonnet", ModelPricing { input: 3.0, output: 15.0 }),
    ("haiku", ModelPricing { input: 0.80, output: 4.0 }),
];

/// Get pricing for a model by name; "haiku" matches "claude-3-5-haiku-latest".
pub fn get_model_pricing(model: &str) -> Option<ModelPricing> {
    let model_lower = model.to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(name, _)| model_lower.contains(name))
        .map(|(_, pricing)| *pricing)
}

/// Rough token estimate for a piece of text.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_TOKEN) as u64
}

/// Estimated cost in USD; unknown models cost nothing.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    get_model_pricing(model).map_or(0.0, |pricing| {
        (input_tokens as f64 * pricing.input + output_tokens as f64 * pricing.output) / 1_000_000.0
    })
}

tokio::task_local! {
    static RUN_TRACKER: Arc<UsageTracker>;
}

/// Counters shared by every caller of one gateway.
#[derive(Debug, Default)]
pub struct UsageTracker {
    invocations: AtomicU64,
    cache_hits: AtomicU64,
    failures: AtomicU64,
    per_tier: Mutex<[TierUsage; 3]>,
}

fn tier_index(tier: ModelTier) -> usize {
    match tier {
        ModelTier::Fast => 0,
        ModelTier::Balanced => 1,
        ModelTier::Complex => 2,
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, tier: ModelTier) {
        if let Ok(mut per_tier) = self.per_tier.lock() {
            per_tier[tier_index(tier)].dispatches += 1;
        }
    }

    /// Account a fresh successful response.
    pub fn record_success(&self, tier: ModelTier, model: &str, prompt: &str, response: &str) {
        let input = estimate_tokens(prompt);
        let output = estimate_tokens(response);
        let cost = estimate_cost(model, input, output);
        if let Ok(mut per_tier) = self.per_tier.lock() {
            let usage = &mut per_tier[tier_index(tier)];
            usage.successes += 1;
            usage.estimated_input_tokens += input;
            usage.estimated_output_tokens += output;
            usage.estimated_cost_usd += cost;
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let invocations = self.invocations.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let per_tier = self
            .per_tier
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        let mut snapshot = UsageSnapshot {
            invocations,
            cache_hits,
            cache_hit_rate: if invocations == 0 {
                0.0
            } else {
                cache_hits as f64 / invocations as f64
            },
            failures: self.failures.load(Ordering::Relaxed),
            ..UsageSnapshot::default()
        };

        for tier in ModelTier::ALL {
            let usage = &per_tier[tier_index(tier)];
            snapshot.dispatches += usage.dispatches;
            snapshot.estimated_cost_usd += usage.estimated_cost_usd;
            if usage.dispatches > 0 {
                snapshot.per_tier.insert(tier, usage.clone());
            }
        }
        snapshot
    }
}

/// Apply `record` to the gateway's tracker and to the current run's tracker,
/// if the caller is inside [`RunUsage::scope`].
pub(crate) fn record_all(shared: &UsageTracker, record: impl Fn(&UsageTracker)) {
    record(shared);
    let _ = RUN_TRACKER.try_with(|run| record(run.as_ref()));
}

/// Usage attributed to one run.
///
/// Gateway calls made inside [`RunUsage::scope`] are counted here as well as
/// on the gateway, so runs sharing a gateway report only their own calls.
/// `prior` carries what earlier sessions of the run already used.
#[derive(Debug)]
pub struct RunUsage {
    prior: UsageSnapshot,
    tracker: Arc<UsageTracker>,
}

impl RunUsage {
    pub fn new(prior: UsageSnapshot) -> Self {
        Self {
            prior,
            tracker: Arc::new(UsageTracker::new()),
        }
    }

    /// Run `future` with its gateway calls attributed to this run.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        RUN_TRACKER.scope(self.tracker.clone(), future).await
    }

    /// Prior usage plus everything recorded in this session.
    pub fn total(&self) -> UsageSnapshot {
        self.prior.merged(&self.tracker.snapshot())
    }
}
