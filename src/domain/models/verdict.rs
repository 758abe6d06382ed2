//! Quality verdicts over the five assessment dimensions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest score a dimension may carry.
pub const MIN_SCORE: f64 = 1.0;
/// Highest score a dimension may carry.
pub const MAX_SCORE: f64 = 5.0;
/// Score assigned to every dimension of a degraded verdict.
pub const DEGRADED_SCORE: f64 = 3.5;
/// Issue text attached to a degraded verdict.
pub const DEGRADED_ISSUE: &str = "scoring unavailable — degraded verdict";

/// An assessment dimension of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Coverage,
    Coherence,
    Structure,
    Citations,
    Insight,
}

impl Dimension {
    /// All dimensions in schema order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Coverage,
        Dimension::Coherence,
        Dimension::Structure,
        Dimension::Citations,
        Dimension::Insight,
    ];

    /// Order used to break score ties when selecting repair targets.
    pub const REPAIR_ORDER: [Dimension; 5] = [
        Dimension::Insight,
        Dimension::Coherence,
        Dimension::Structure,
        Dimension::Coverage,
        Dimension::Citations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Coverage => "coverage",
            Dimension::Coherence => "coherence",
            Dimension::Structure => "structure",
            Dimension::Citations => "citations",
            Dimension::Insight => "insight",
        }
    }

    /// Weight of this dimension in the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            Dimension::Coverage => 0.25,
            Dimension::Coherence => 0.20,
            Dimension::Structure => 0.20,
            Dimension::Citations => 0.20,
            Dimension::Insight => 0.15,
        }
    }

    /// Position in [`Dimension::REPAIR_ORDER`].
    pub fn repair_rank(&self) -> usize {
        Self::REPAIR_ORDER
            .iter()
            .position(|d| d == self)
            .unwrap_or(Self::REPAIR_ORDER.len())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown dimension: {s}"))
    }
}

/// Clamp a score into `[MIN_SCORE, MAX_SCORE]`.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Per-dimension scores, each within `[1.0, 5.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub coverage: f64,
    pub coherence: f64,
    pub structure: f64,
    pub citations: f64,
    pub insight: f64,
}

impl DimensionScores {
    /// Build from raw values, clamping each into range.
    pub fn clamped(coverage: f64, coherence: f64, structure: f64, citations: f64, insight: f64) -> Self {
        Self {
            coverage: clamp_score(coverage),
            coherence: clamp_score(coherence),
            structure: clamp_score(structure),
            citations: clamp_score(citations),
            insight: clamp_score(insight),
        }
    }

    pub fn uniform(score: f64) -> Self {
        Self::clamped(score, score, score, score, score)
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Coverage => self.coverage,
            Dimension::Coherence => self.coherence,
            Dimension::Structure => self.structure,
            Dimension::Citations => self.citations,
            Dimension::Insight => self.insight,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// Weighted sum over all dimensions.
    pub fn overall(&self) -> f64 {
        self.iter().map(|(d, score)| d.weight() * score).sum()
    }
}

/// Whether a verdict reflects a genuine assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictProvenance {
    Genuine,
    /// Fallback produced because the service was unavailable or unparsable.
    Degraded,
}

/// Structured multi-dimension assessment of a draft at one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub scores: DimensionScores,
    pub issues: Vec<String>,
    pub has_critical_issue: bool,
    pub provenance: VerdictProvenance,
}

impl Verdict {
    pub fn genuine(scores: DimensionScores, issues: Vec<String>, has_critical_issue: bool) -> Self {
        Self {
            scores,
            issues,
            has_critical_issue,
            provenance: VerdictProvenance::Genuine,
        }
    }

    /// The fallback verdict used when scoring is unavailable.
    pub fn degraded() -> Self {
        Self {
            scores: DimensionScores::uniform(DEGRADED_SCORE),
            issues: vec![DEGRADED_ISSUE.to_string()],
            has_critical_issue: false,
            provenance: VerdictProvenance::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.provenance == VerdictProvenance::Degraded
    }

    pub fn overall_score(&self) -> f64 {
        self.scores.overall()
    }

    pub fn score(&self, dimension: Dimension) -> f64 {
        self.scores.get(dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(Dimension::weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score_is_weighted_sum() {
        let scores = DimensionScores::clamped(4.0, 3.0, 3.0, 3.0, 2.0);
        let expected = 0.25 * 4.0 + 0.20 * 3.0 * 3.0 + 0.15 * 2.0;
        assert!((scores.overall() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_clamping() {
        let scores = DimensionScores::clamped(0.0, 7.5, 3.0, -2.0, 5.0);
        assert_eq!(scores.coverage, 1.0);
        assert_eq!(scores.coherence, 5.0);
        assert_eq!(scores.citations, 1.0);
    }

    #[test]
    fn test_degraded_differs_from_genuine_uniform_verdict() {
        let degraded = Verdict::degraded();
        let genuine = Verdict::genuine(
            DimensionScores::uniform(3.5),
            vec![DEGRADED_ISSUE.to_string()],
            false,
        );
        assert_ne!(degraded, genuine);
        assert!(degraded.is_degraded());
        assert!((degraded.overall_score() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_repair_rank_follows_fixed_order() {
        assert_eq!(Dimension::Insight.repair_rank(), 0);
        assert_eq!(Dimension::Citations.repair_rank(), 4);
        assert!(Dimension::Coherence.repair_rank() < Dimension::Coverage.repair_rank());
    }

    #[test]
    fn test_dimension_parse_and_display() {
        assert_eq!("Insight".parse::<Dimension>(), Ok(Dimension::Insight));
        assert_eq!(Dimension::Citations.to_string(), "citations");
        assert!("novelty".parse::<Dimension>().is_err());
    }
}
