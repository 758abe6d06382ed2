//! Draft documents and their sections.
//!
//! A [`Draft`] is an ordered sequence of named [`Section`]s. Drafts are
//! treated as values: a revision step builds a new draft rather than editing
//! the previous one, so every iteration's input stays inspectable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use super::verdict::Dimension;

static CITATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[@([A-Za-z0-9_.:/\-]+)\]").expect("citation marker pattern is valid")
});

/// Where a section's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Provided by the caller (loaded from a file, not generated here).
    #[default]
    Supplied,
    /// Genuine output of the generative service.
    Generated,
    /// Placeholder written because the service failed.
    Degraded,
}

/// An inline citation marker, written as `[@key]` in section bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationMarker(pub String);

impl CitationMarker {
    pub fn key(&self) -> &str {
        &self.0
    }
}

/// Extract citation markers from text in order of first appearance.
pub fn extract_citations(text: &str) -> Vec<CitationMarker> {
    let mut markers: Vec<CitationMarker> = Vec::new();
    for caps in CITATION_MARKER.captures_iter(text) {
        let marker = CitationMarker(caps[1].to_string());
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }
    markers
}

const fn default_priority() -> u8 {
    1
}

/// A named section of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub body: String,
    /// Ordered, de-duplicated markers found in `body`.
    #[serde(default)]
    pub citations: Vec<CitationMarker>,
    /// Truncation priority: lower values are dropped first from prompts.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Section {
    /// Create a supplied section, deriving its citation markers from the body.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            name: name.into(),
            citations: extract_citations(&body),
            body,
            priority: default_priority(),
            provenance: Provenance::Supplied,
        }
    }

    /// Create a section from service output.
    pub fn generated(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Generated,
            ..Self::new(name, body)
        }
    }

    /// Create a placeholder section after the service failed.
    pub fn degraded(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Degraded,
            ..Self::new(name, body)
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// A copy of this section with a generated body; citations are re-derived.
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            name: self.name.clone(),
            citations: extract_citations(&body),
            body,
            priority: self.priority,
            provenance: Provenance::Generated,
        }
    }

    /// A copy of this section under a new name; body and provenance are kept.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Rebuild the citation list from the body.
    pub fn refresh_citations(&mut self) {
        self.citations = extract_citations(&self.body);
    }
}

/// Outcome of one dimension repair inside a revise call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RevisionOutcome {
    /// The repair was applied to the listed section indices.
    Applied { sections_changed: Vec<usize> },
    /// The gateway could not produce a response; sections left unmodified.
    Unavailable { detail: String },
    /// The response could not be applied; sections left unmodified.
    Malformed { detail: String },
}

impl RevisionOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, RevisionOutcome::Applied { .. })
    }
}

/// Machine-readable annotation attached to a revised draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionNote {
    /// `None` for notes produced by the baseline strategy, which is not dimension-driven.
    pub dimension: Option<Dimension>,
    /// Section index the note refers to, when the repair was section-local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<usize>,
    pub outcome: RevisionOutcome,
}

impl RevisionNote {
    pub fn for_dimension(dimension: Dimension, outcome: RevisionOutcome) -> Self {
        Self {
            dimension: Some(dimension),
            section: None,
            outcome,
        }
    }

    pub fn for_section(section: usize, outcome: RevisionOutcome) -> Self {
        Self {
            dimension: None,
            section: Some(section),
            outcome,
        }
    }
}

/// The evolving generated document under revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub topic: String,
    pub sections: Vec<Section>,
    /// Number of revise calls that led to this draft.
    #[serde(default)]
    pub revision: u32,
    /// Outcomes of the revise call that produced this draft.
    #[serde(default)]
    pub notes: Vec<RevisionNote>,
}

impl Draft {
    pub fn new(topic: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            topic: topic.into(),
            sections,
            revision: 0,
            notes: Vec::new(),
        }
    }

    /// Build the successor draft of a revise call.
    pub fn next_revision(&self, sections: Vec<Section>, notes: Vec<RevisionNote>) -> Self {
        Self {
            topic: self.topic.clone(),
            sections,
            revision: self.revision + 1,
            notes,
        }
    }

    pub fn has_failed_revisions(&self) -> bool {
        self.notes.iter().any(|note| note.outcome.is_failure())
    }

    pub fn degraded_sections(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.provenance == Provenance::Degraded)
            .count()
    }

    /// Hex SHA-256 over topic and section content; notes and revision count are excluded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.topic.as_bytes());
        for section in &self.sections {
            hasher.update([0u8]);
            hasher.update(section.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(section.body.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Render as markdown with one `##` heading per section.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.topic);
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n{}\n", section.name, section.body.trim_end()));
        }
        out
    }
}
