//! Baseline revision strategy: two-pass local coherence enhancement.
//!
//! The control arm for the convergence loop. Each section is rewritten once
//! while seeing only the tail of its predecessor and the head of its
//! successor; nothing is scored.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::GatewayError;
use crate::domain::models::{Draft, ModelTier, RevisionNote, RevisionOutcome, Section};
use crate::services::gateway::RequestGateway;
use crate::services::prompts::refine_prompt;

/// Characters of each neighbour shown to a refinement.
pub const NEIGHBOUR_WINDOW_CHARS: usize = 200;

fn tail(text: &str, chars: usize) -> &str {
    let count = text.chars().count();
    if count <= chars {
        return text;
    }
    let start = text
        .char_indices()
        .nth(count - chars)
        .map_or(0, |(i, _)| i);
    &text[start..]
}

fn head(text: &str, chars: usize) -> &str {
    let end = text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i);
    &text[..end]
}

pub struct BaselineReviser {
    gateway: Arc<RequestGateway>,
    tier: ModelTier,
}

impl BaselineReviser {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self {
            gateway,
            tier: ModelTier::Fast,
        }
    }

    /// Refine odd-indexed sections, then even-indexed ones.
    ///
    /// The second pass sees the first pass's output. Sections without
    /// neighbours are left as they are.
    #[instrument(skip_all, fields(sections = draft.sections.len()))]
    pub async fn refine(&self, draft: &Draft) -> Draft {
        let mut sections = draft.sections.clone();
        let mut notes = Vec::new();
        let mut refined = 0usize;

        if sections.len() > 1 {
            for parity in [1, 0] {
                for index in (parity..sections.len()).step_by(2) {
                    match self.refine_section(&draft.topic, &sections, index).await {
                        Ok(section) => {
                            sections[index] = section;
                            refined += 1;
                        }
                        Err(outcome) => {
                            warn!(section = index, outcome = ?outcome, "section left unchanged");
                            notes.push(RevisionNote::for_section(index, outcome));
                        }
                    }
                }
            }
        }

        info!(refined, failed = notes.len(), "baseline pass complete");
        draft.next_revision(sections, notes)
    }

    async fn refine_section(
        &self,
        topic: &str,
        sections: &[Section],
        index: usize,
    ) -> Result<Section, RevisionOutcome> {
        let section = &sections[index];
        let previous_tail = index
            .checked_sub(1)
            .map_or("", |i| tail(&sections[i].body, NEIGHBOUR_WINDOW_CHARS));
        let next_head = sections
            .get(index + 1)
            .map_or("", |s| head(&s.body, NEIGHBOUR_WINDOW_CHARS));

        let prompt = refine_prompt(topic, &section.name, &section.body, previous_tail, next_head);
        match self.gateway.invoke(&prompt, self.tier).await {
            Ok(body) => Ok(section.with_body(body.trim())),
            Err(e @ GatewayError::Unavailable { .. }) => Err(RevisionOutcome::Unavailable {
                detail: e.to_string(),
            }),
            Err(GatewayError::Malformed(detail)) => Err(RevisionOutcome::Malformed { detail }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generators::ScriptedGenerator;
    use crate::domain::errors::GenerationError;
    use crate::services::gateway::RetryPolicy;
    use crate::services::prompts::PromptKind;

    fn baseline(generator: Arc<ScriptedGenerator>) -> BaselineReviser {
        BaselineReviser::new(Arc::new(
            RequestGateway::new(generator).with_retry_policy(RetryPolicy::new(1, 1, 1)),
        ))
    }

    fn draft(n: usize) -> Draft {
        Draft::new(
            "t",
            (0..n)
                .map(|i| Section::new(format!("S{i}"), format!("Body {i}.")))
                .collect(),
        )
    }

    #[test]
    fn test_windows_are_char_safe() {
        assert_eq!(tail("héllo", 3), "llo");
        assert_eq!(tail("ab", 5), "ab");
        assert_eq!(head("héllo", 2), "hé");
        assert_eq!(head("ab", 5), "ab");
    }

    #[tokio::test]
    async fn test_odd_sections_refined_before_even() {
        let generator = Arc::new(ScriptedGenerator::with_handler(|request| {
            Ok(format!("refined {}", request.prompt.len()))
        }));
        let baseline = baseline(generator.clone());
        let revised = baseline.refine(&draft(4)).await;

        let order: Vec<String> = generator
            .requests()
            .iter()
            .filter_map(|r| {
                r.prompt
                    .split("Section \"")
                    .nth(1)
                    .and_then(|s| s.split('"').next())
                    .map(ToString::to_string)
            })
            .collect();
        assert_eq!(order, vec!["S1", "S3", "S0", "S2"]);
        assert!(revised.sections.iter().all(|s| s.body.starts_with("refined")));
        assert_eq!(revised.revision, 1);
        assert!(revised.notes.is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_sees_first_pass_output() {
        let generator = Arc::new(ScriptedGenerator::dry_run());
        let baseline = baseline(generator.clone());
        baseline.refine(&draft(2)).await;

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        // S0 is refined second and sees S1's refined head
        assert!(requests[1].prompt.contains("This revision strengthens"));
        assert_eq!(generator.calls_of_kind(PromptKind::Refine), 2);
    }

    #[tokio::test]
    async fn test_single_section_is_untouched() {
        let generator = Arc::new(ScriptedGenerator::dry_run());
        let original = draft(1);
        let revised = baseline(generator.clone()).refine(&original).await;
        assert_eq!(revised.sections, original.sections);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_leave_sections_and_add_notes() {
        let generator = Arc::new(
            ScriptedGenerator::always_ok("Better body.")
                .then(Err(GenerationError::InvalidRequest("too long".to_string()))),
        );
        let original = draft(3);
        let revised = baseline(generator).refine(&original).await;

        // S1 failed, S0 and S2 were refined
        assert_eq!(revised.sections[1], original.sections[1]);
        assert_eq!(revised.sections[0].body, "Better body.");
        assert_eq!(revised.notes.len(), 1);
        assert_eq!(revised.notes[0].section, Some(1));
        assert!(matches!(
            revised.notes[0].outcome,
            RevisionOutcome::Unavailable { .. }
        ));
    }
}
