//! Strict decoding of scorer responses into verdicts.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::errors::VerdictParseError;
use crate::domain::models::{clamp_score, Dimension, DimensionScores, Verdict};

#[derive(Debug, Deserialize)]
struct RawVerdict {
    coverage: Option<Value>,
    coherence: Option<Value>,
    structure: Option<Value>,
    citations: Option<Value>,
    insight: Option<Value>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    critical_issues: Vec<String>,
}

impl RawVerdict {
    fn field(&self, dimension: Dimension) -> Option<&Value> {
        match dimension {
            Dimension::Coverage => self.coverage.as_ref(),
            Dimension::Coherence => self.coherence.as_ref(),
            Dimension::Structure => self.structure.as_ref(),
            Dimension::Citations => self.citations.as_ref(),
            Dimension::Insight => self.insight.as_ref(),
        }
    }

    fn score(&self, dimension: Dimension) -> Result<f64, VerdictParseError> {
        let value = self
            .field(dimension)
            .filter(|v| !v.is_null())
            .ok_or(VerdictParseError::MissingScore(dimension))?;
        let score = value
            .as_f64()
            .ok_or(VerdictParseError::NonFiniteScore(dimension))?;
        if !score.is_finite() {
            return Err(VerdictParseError::NonFiniteScore(dimension));
        }
        Ok(clamp_score(score))
    }
}

/// Slice of the first balanced `{...}` object in `text`, skipping braces
/// inside JSON strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode a genuine verdict from service output.
///
/// All five dimension scores must be present and numeric; values outside
/// `[1, 5]` are clamped. Critical issues are listed first in `issues`.
pub fn parse_verdict(response: &str) -> Result<Verdict, VerdictParseError> {
    let json = extract_json_object(response).ok_or(VerdictParseError::NoJsonObject)?;
    let raw: RawVerdict =
        serde_json::from_str(json).map_err(|e| VerdictParseError::InvalidJson(e.to_string()))?;

    let scores = DimensionScores {
        coverage: raw.score(Dimension::Coverage)?,
        coherence: raw.score(Dimension::Coherence)?,
        structure: raw.score(Dimension::Structure)?,
        citations: raw.score(Dimension::Citations)?,
        insight: raw.score(Dimension::Insight)?,
    };

    let critical: Vec<String> = raw
        .critical_issues
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    let has_critical_issue = !critical.is_empty();

    let mut issues = critical;
    issues.extend(
        raw.issues
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty()),
    );

    Ok(Verdict::genuine(scores, issues, has_critical_issue))
}
