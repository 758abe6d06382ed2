//! Papers returned by the retrieval collaborator.

use serde::{Deserialize, Serialize};

/// A ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Stable identifier, used inside `[@id]` citation markers.
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

impl Paper {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
        }
    }

    /// One-line prompt rendering: `[@id] Title: abstract excerpt`.
    pub fn prompt_line(&self, abstract_chars: usize) -> String {
        let excerpt: String = self.abstract_text.chars().take(abstract_chars).collect();
        if excerpt.is_empty() {
            format!("[@{}] {}", self.id, self.title)
        } else {
            format!("[@{}] {}: {}", self.id, self.title, excerpt)
        }
    }
}
