//! Keyword-overlap retrieval over an in-memory paper corpus.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Paper;
use crate::domain::ports::PaperRetriever;

const TITLE_WEIGHT: usize = 2;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "its", "into", "over", "under",
    "via", "using", "based", "towards", "toward", "need", "needs", "more", "section",
    "sections",
];

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

struct IndexedPaper {
    paper: Paper,
    title_terms: HashSet<String>,
    abstract_terms: HashSet<String>,
}

/// Ranks papers by how many query terms appear in their title (weighted
/// double) and abstract. Papers sharing no term with the query are never
/// returned.
pub struct KeywordCorpus {
    papers: Vec<IndexedPaper>,
}

impl KeywordCorpus {
    pub fn new(papers: Vec<Paper>) -> Self {
        let papers = papers
            .into_iter()
            .map(|paper| IndexedPaper {
                title_terms: terms(&paper.title),
                abstract_terms: terms(&paper.abstract_text),
                paper,
            })
            .collect();
        Self { papers }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load a JSON array of `{"id", "title", "abstract"}` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Retrieval(format!("cannot read corpus {}: {e}", path.display()))
        })?;
        let papers: Vec<Paper> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), papers = papers.len(), "corpus loaded");
        Ok(Self::new(papers))
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<Paper> {
        let query = terms(query);
        let mut scored: Vec<(usize, usize)> = self
            .papers
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let title = p.title_terms.intersection(&query).count();
                let body = p.abstract_terms.intersection(&query).count();
                (i, title * TITLE_WEIGHT + body)
            })
            .filter(|(_, score)| *score > 0)
            .collect();
        // stable: equal scores keep corpus order
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.papers[i].paper.clone())
            .collect()
    }
}

#[async_trait]
impl PaperRetriever for KeywordCorpus {
    async fn search(&self, query: &str, k: usize) -> DomainResult<Vec<Paper>> {
        Ok(self.rank(query, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corpus() -> KeywordCorpus {
        KeywordCorpus::new(vec![
            Paper::new("a", "Graph neural networks", "Message passing on graphs"),
            Paper::new("b", "Transformers for language", "Attention over graphs of tokens"),
            Paper::new("c", "Protein folding", "Structure prediction"),
        ])
    }

    #[tokio::test]
    async fn test_title_matches_rank_first() {
        let results = corpus().search("graph networks", 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);

        let results = corpus().search("graphs attention", 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_k_limits_results_and_misses_are_excluded() {
        assert_eq!(corpus().search("graphs", 1).await.unwrap().len(), 1);
        assert!(corpus().search("quantum chemistry", 5).await.unwrap().is_empty());
        assert!(KeywordCorpus::empty().search("graphs", 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "p1", "title": "Dense retrieval", "abstract": "Dual encoders"}},
                {{"id": "p2", "title": "Sparse retrieval"}}]"#
        )
        .unwrap();

        let corpus = KeywordCorpus::from_json_file(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_missing_file_is_a_retrieval_error() {
        let err = KeywordCorpus::from_json_file("/nonexistent/corpus.json").err().unwrap();
        assert!(matches!(err, DomainError::Retrieval(_)));
    }
}
