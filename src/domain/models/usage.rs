//! Read-only gateway usage accounting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tier::ModelTier;

/// Usage accumulated for one tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierUsage {
    /// External service attempts on this tier.
    pub dispatches: u64,
    /// Successful responses served by this tier (fresh, not cached).
    pub successes: u64,
    pub estimated_input_tokens: u64,
    pub estimated_output_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Snapshot of gateway counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Calls to `invoke`, cached or not.
    pub invocations: u64,
    /// External service attempts, including retries.
    pub dispatches: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    /// Invocations that ended in an error.
    pub failures: u64,
    pub estimated_cost_usd: f64,
    #[serde(default)]
    pub per_tier: BTreeMap<ModelTier, TierUsage>,
}

impl TierUsage {
    fn add(&mut self, other: &TierUsage) {
        self.dispatches += other.dispatches;
        self.successes += other.successes;
        self.estimated_input_tokens += other.estimated_input_tokens;
        self.estimated_output_tokens += other.estimated_output_tokens;
        self.estimated_cost_usd += other.estimated_cost_usd;
    }
}

impl UsageSnapshot {
    /// Sum of two snapshots; the hit rate is recomputed from the totals.
    pub fn merged(&self, other: &UsageSnapshot) -> UsageSnapshot {
        let invocations = self.invocations + other.invocations;
        let cache_hits = self.cache_hits + other.cache_hits;
        let mut per_tier = self.per_tier.clone();
        for (tier, usage) in &other.per_tier {
            per_tier.entry(*tier).or_default().add(usage);
        }
        UsageSnapshot {
            invocations,
            dispatches: self.dispatches + other.dispatches,
            cache_hits,
            cache_hit_rate: if invocations == 0 {
                0.0
            } else {
                cache_hits as f64 / invocations as f64
            },
            failures: self.failures + other.failures,
            estimated_cost_usd: self.estimated_cost_usd + other.estimated_cost_usd,
            per_tier,
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "{} invocations, {} dispatches, {} cache hits ({:.0}%), {} failures, est. ${:.4}",
            self.invocations,
            self.dispatches,
            self.cache_hits,
            self.cache_hit_rate * 100.0,
            self.failures,
            self.estimated_cost_usd
        )
    }
}
