//! Tier-to-model routing.
//!
//! Callers ask for a capability tier; the router resolves the concrete
//! model name sent to the service. Haiku-class models serve `fast`,
//! Sonnet-class `balanced`, Opus-class `complex`.

use crate::domain::models::{ModelTier, ModelsConfig};

/// Result of a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub tier: ModelTier,
    pub model: String,
}

/// Maps each tier to a configured model name.
#[derive(Debug, Clone)]
pub struct TierRouter {
    config: ModelsConfig,
}

impl Default for TierRouter {
    fn default() -> Self {
        Self::new(ModelsConfig::default())
    }
}

impl TierRouter {
    pub fn new(config: ModelsConfig) -> Self {
        Self { config }
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.config.fast,
            ModelTier::Balanced => &self.config.balanced,
            ModelTier::Complex => &self.config.complex,
        }
    }

    pub fn select(&self, tier: ModelTier) -> ModelSelection {
        ModelSelection {
            tier,
            model: self.model_for(tier).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing() {
        let router = TierRouter::default();
        assert!(router.model_for(ModelTier::Fast).contains("haiku"));
        assert!(router.model_for(ModelTier::Balanced).contains("sonnet"));
        assert!(router.model_for(ModelTier::Complex).contains("opus"));
    }

    #[test]
    fn test_configured_models_are_used() {
        let router = TierRouter::new(ModelsConfig {
            fast: "small".to_string(),
            balanced: "medium".to_string(),
            complex: "large".to_string(),
        });
        assert_eq!(
            router.select(ModelTier::Complex),
            ModelSelection {
                tier: ModelTier::Complex,
                model: "large".to_string()
            }
        );
    }
}
