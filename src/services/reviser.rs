//! Targeted reviser: repairs the weakest dimensions of a draft.
//!
//! For each target dimension one repair prompt is sent and the returned
//! structured edit is applied to the sections that dimension implicates.
//! Sections outside that set are carried over untouched. A failed repair
//! leaves the draft as it was and records why in the draft's notes.

use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::GatewayError;
use crate::domain::models::{
    Dimension, Draft, Paper, RevisionConfig, RevisionNote, RevisionOutcome, Section, Verdict,
};
use crate::domain::ports::PaperRetriever;
use crate::services::gateway::RequestGateway;
use crate::services::prompts::repair_prompt;
use crate::services::verdict_parser::extract_json_object;

/// Dimensions to repair for `verdict`, most urgent first.
///
/// Every dimension scoring below `threshold` qualifies. When none does but
/// the verdict flags a critical issue, the single lowest dimension is chosen.
/// Ties are broken by [`Dimension::REPAIR_ORDER`]. Degraded verdicts carry
/// no usable signal and select nothing.
pub fn select_targets(verdict: &Verdict, threshold: f64) -> Vec<Dimension> {
    if verdict.is_degraded() {
        return Vec::new();
    }

    let by_urgency = |a: &Dimension, b: &Dimension| -> Ordering {
        verdict
            .score(*a)
            .total_cmp(&verdict.score(*b))
            .then(a.repair_rank().cmp(&b.repair_rank()))
    };

    let mut targets: Vec<Dimension> = Dimension::ALL
        .into_iter()
        .filter(|d| verdict.score(*d) < threshold)
        .collect();

    if targets.is_empty() && verdict.has_critical_issue {
        if let Some(lowest) = Dimension::ALL.into_iter().min_by(by_urgency) {
            targets.push(lowest);
        }
    }

    targets.sort_by(by_urgency);
    targets
}

/// Indices of the sections a repair of `dimension` may change.
pub fn implicated_sections(dimension: Dimension, sections: &[Section]) -> Vec<usize> {
    let all: Vec<usize> = (0..sections.len()).collect();
    match dimension {
        Dimension::Coverage | Dimension::Coherence | Dimension::Structure => all,
        Dimension::Citations => {
            let uncited: Vec<usize> = sections
                .iter()
                .enumerate()
                .filter(|(_, s)| s.citations.is_empty())
                .map(|(i, _)| i)
                .collect();
            if uncited.is_empty() {
                all
            } else {
                uncited
            }
        }
        Dimension::Insight => sections.len().checked_sub(1).into_iter().collect(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct EditResponse {
    #[serde(default)]
    edits: Vec<SectionEdit>,
    #[serde(default)]
    insert: Vec<NewSection>,
    #[serde(default)]
    order: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
struct SectionEdit {
    section: usize,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewSection {
    title: String,
    body: String,
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    order.len() == len && order.iter().copied().collect::<BTreeSet<_>>() == (0..len).collect()
}

/// Apply a repair response to `sections`.
///
/// Returns the new sections and the output positions that differ from the
/// input (edited, moved or inserted), or a reason when no valid change was
/// found.
pub fn apply_repair(
    dimension: Dimension,
    sections: &[Section],
    implicated: &[usize],
    response: &str,
) -> Result<(Vec<Section>, Vec<usize>), String> {
    let json = extract_json_object(response).ok_or("response contains no JSON object")?;
    let edit: EditResponse =
        serde_json::from_str(json).map_err(|e| format!("invalid edit JSON: {e}"))?;

    let allowed: BTreeSet<usize> = implicated.iter().copied().collect();
    let mut rejected: Vec<String> = Vec::new();
    let mut working: Vec<Section> = sections.to_vec();

    for change in &edit.edits {
        if !allowed.contains(&change.section) {
            rejected.push(format!("section {} is not a {dimension} target", change.section));
            continue;
        }
        let index = change.section;

        if let Some(body) = &change.body {
            if dimension == Dimension::Structure {
                rejected.push(format!("structure repair may not rewrite section {index}"));
            } else if body.trim().is_empty() {
                rejected.push(format!("empty body for section {index}"));
            } else if body.trim() != working[index].body.trim() {
                working[index] = working[index].with_body(body.trim());
            }
        }

        if let Some(title) = &change.title {
            let title = title.trim();
            if dimension != Dimension::Structure {
                debug!(%dimension, section = index, "ignoring title change outside structure repair");
            } else if title.is_empty() {
                rejected.push(format!("empty title for section {index}"));
            } else if title != working[index].name {
                working[index] = working[index].renamed(title);
            }
        }
    }

    // (origin index, section); inserted sections have no origin
    let mut arranged: Vec<(Option<usize>, Section)> = working
        .into_iter()
        .enumerate()
        .map(|(i, s)| (Some(i), s))
        .collect();

    if let Some(order) = &edit.order {
        if dimension != Dimension::Structure {
            rejected.push(format!("{dimension} repair may not reorder sections"));
        } else if !is_permutation(order, arranged.len()) {
            rejected.push(format!("order {order:?} is not a permutation of the sections"));
        } else {
            let mut slots: Vec<Option<(Option<usize>, Section)>> =
                arranged.into_iter().map(Some).collect();
            arranged = order.iter().filter_map(|&i| slots[i].take()).collect();
        }
    }

    if !edit.insert.is_empty() {
        if dimension == Dimension::Coverage {
            let position = arranged.len().saturating_sub(1);
            let mut new_sections = Vec::new();
            for insert in &edit.insert {
                if insert.title.trim().is_empty() || insert.body.trim().is_empty() {
                    rejected.push("inserted section needs a title and a body".to_string());
                    continue;
                }
                new_sections.push((None, Section::generated(insert.title.trim(), insert.body.trim())));
            }
            arranged.splice(position..position, new_sections);
        } else {
            rejected.push(format!("{dimension} repair may not insert sections"));
        }
    }

    let changed: Vec<usize> = arranged
        .iter()
        .enumerate()
        .filter(|(position, (origin, section))| match origin {
            None => true,
            Some(i) => i != position || sections[*i] != *section,
        })
        .map(|(position, _)| position)
        .collect();

    if !rejected.is_empty() {
        debug!(%dimension, rejected = ?rejected, "rejected parts of repair response");
    }

    if changed.is_empty() {
        return Err(if rejected.is_empty() {
            "response contained no changes".to_string()
        } else {
            format!("no valid changes: {}", rejected.join("; "))
        });
    }

    Ok((arranged.into_iter().map(|(_, s)| s).collect(), changed))
}

/// Dispatches one repair per target dimension through the gateway.
pub struct TargetedReviser {
    gateway: Arc<RequestGateway>,
    retriever: Arc<dyn PaperRetriever>,
    config: RevisionConfig,
}

impl TargetedReviser {
    pub fn new(
        gateway: Arc<RequestGateway>,
        retriever: Arc<dyn PaperRetriever>,
        config: RevisionConfig,
    ) -> Self {
        Self {
            gateway,
            retriever,
            config,
        }
    }

    pub fn select_targets(&self, verdict: &Verdict) -> Vec<Dimension> {
        select_targets(verdict, self.config.repair_threshold)
    }

    /// Revise `draft` for every dimension selected from `verdict`.
    ///
    /// Never fails; the returned draft always has an incremented revision and
    /// one note per attempted dimension.
    #[instrument(skip_all, fields(revision = draft.revision))]
    pub async fn revise(&self, draft: &Draft, verdict: &Verdict) -> Draft {
        let targets = self.select_targets(verdict);
        self.revise_dimensions(draft, verdict, &targets).await
    }

    /// Revise `draft` for the given dimensions, in order.
    pub async fn revise_dimensions(
        &self,
        draft: &Draft,
        verdict: &Verdict,
        dimensions: &[Dimension],
    ) -> Draft {
        let mut sections = draft.sections.clone();
        let mut notes = Vec::with_capacity(dimensions.len());

        for &dimension in dimensions {
            let outcome = self
                .repair(dimension, &draft.topic, &sections, &verdict.issues)
                .await;
            match outcome {
                Ok((revised, changed)) => {
                    info!(%dimension, sections_changed = ?changed, "repair applied");
                    sections = revised;
                    notes.push(RevisionNote::for_dimension(
                        dimension,
                        RevisionOutcome::Applied {
                            sections_changed: changed,
                        },
                    ));
                }
                Err(outcome) => {
                    warn!(%dimension, outcome = ?outcome, "repair not applied");
                    notes.push(RevisionNote::for_dimension(dimension, outcome));
                }
            }
        }

        draft.next_revision(sections, notes)
    }

    async fn repair(
        &self,
        dimension: Dimension,
        topic: &str,
        sections: &[Section],
        issues: &[String],
    ) -> Result<(Vec<Section>, Vec<usize>), RevisionOutcome> {
        let implicated = implicated_sections(dimension, sections);
        if implicated.is_empty() && dimension != Dimension::Coverage {
            return Err(RevisionOutcome::Malformed {
                detail: "draft has no sections to revise".to_string(),
            });
        }

        let papers = match dimension {
            Dimension::Coverage | Dimension::Citations => self.retrieve(topic, issues).await,
            _ => Vec::new(),
        };

        let snapshot = Draft::new(topic, sections.to_vec());
        let prompt = repair_prompt(dimension, &snapshot, &implicated, issues, &papers);

        let response = self
            .gateway
            .invoke(&prompt, self.config.tier)
            .await
            .map_err(|e| match e {
                GatewayError::Unavailable { .. } => RevisionOutcome::Unavailable {
                    detail: e.to_string(),
                },
                GatewayError::Malformed(detail) => RevisionOutcome::Malformed { detail },
            })?;

        apply_repair(dimension, sections, &implicated, &response)
            .map_err(|detail| RevisionOutcome::Malformed { detail })
    }

    async fn retrieve(&self, topic: &str, issues: &[String]) -> Vec<Paper> {
        let query = std::iter::once(topic)
            .chain(issues.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        match self.retriever.search(&query, self.config.retrieval_k).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!(error = %e, "retrieval failed, repairing without candidates");
                Vec::new()
            }
        }
    }
}
