//! Quality scorer: draft in, multi-dimension verdict out.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::models::{Draft, ScoringConfig, Verdict};
use crate::services::gateway::RequestGateway;
use crate::services::prompts::score_prompt;
use crate::services::truncation::fit_sections;
use crate::services::verdict_parser::parse_verdict;

/// Scores drafts through the request gateway.
///
/// Scoring never fails: when the service is unavailable or its answer cannot
/// be decoded the scorer returns [`Verdict::degraded`].
pub struct QualityScorer {
    gateway: Arc<RequestGateway>,
    config: ScoringConfig,
}

impl QualityScorer {
    pub fn new(gateway: Arc<RequestGateway>, config: ScoringConfig) -> Self {
        Self { gateway, config }
    }

    /// The exact prompt `score` would send for `draft`.
    pub fn build_prompt(&self, draft: &Draft) -> String {
        let fitted = fit_sections(&draft.sections, self.config.max_prompt_chars);
        if !fitted.is_complete() {
            debug!(
                omitted = fitted.omitted.len(),
                cut = ?fitted.cut,
                budget = self.config.max_prompt_chars,
                "draft truncated for scoring"
            );
        }
        score_prompt(&draft.topic, &fitted)
    }

    #[instrument(skip_all, fields(revision = draft.revision, sections = draft.sections.len()))]
    pub async fn score(&self, draft: &Draft) -> Verdict {
        let prompt = self.build_prompt(draft);

        let response = match self.gateway.invoke(&prompt, self.config.tier).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "scoring unavailable, using degraded verdict");
                return Verdict::degraded();
            }
        };

        match parse_verdict(&response) {
            Ok(verdict) => {
                debug!(overall = verdict.overall_score(), "draft scored");
                verdict
            }
            Err(e) => {
                warn!(error = %e, "unparsable verdict, using degraded verdict");
                Verdict::degraded()
            }
        }
    }
}
