//! Capability/cost classes of the generative service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named capability/cost class of the external generative service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Quick, cheap calls (repairs, local refinements).
    Fast,
    /// Default for generation and scoring.
    Balanced,
    /// Expensive reasoning-heavy calls.
    Complex,
}

impl ModelTier {
    pub const ALL: [ModelTier; 3] = [ModelTier::Fast, ModelTier::Balanced, ModelTier::Complex];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Balanced => "balanced",
            ModelTier::Complex => "complex",
        }
    }

    /// The next cheaper tier to fall back to when this one is unavailable.
    pub fn fallback(&self) -> Option<ModelTier> {
        match self {
            ModelTier::Complex => Some(ModelTier::Balanced),
            ModelTier::Balanced => Some(ModelTier::Fast),
            ModelTier::Fast => None,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(ModelTier::Fast),
            "balanced" => Ok(ModelTier::Balanced),
            "complex" => Ok(ModelTier::Complex),
            other => Err(format!("unknown model tier: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_chain_ends_at_fast() {
        assert_eq!(ModelTier::Complex.fallback(), Some(ModelTier::Balanced));
        assert_eq!(ModelTier::Balanced.fallback(), Some(ModelTier::Fast));
        assert_eq!(ModelTier::Fast.fallback(), None);
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!("Balanced".parse::<ModelTier>(), Ok(ModelTier::Balanced));
        assert!("turbo".parse::<ModelTier>().is_err());
    }
}
