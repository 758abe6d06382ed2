//! Scripted in-process generator for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::errors::GenerationError;
use crate::domain::ports::{GenerationRequest, TextGenerator};
use crate::services::prompts::PromptKind;

type Handler = Arc<dyn Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync>;

/// Generator answering from a queue of scripted results.
///
/// Each call consumes the next queued result; once the queue is empty the
/// handler (if any) is consulted, then the default result.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Result<String, GenerationError>>>,
    handler: Option<Handler>,
    default: Result<String, GenerationError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            handler: None,
            default: Ok("Scripted response.".to_string()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok(text: impl Into<String>) -> Self {
        Self {
            default: Ok(text.into()),
            ..Self::new()
        }
    }

    pub fn always_err(error: GenerationError) -> Self {
        Self {
            default: Err(error),
            ..Self::new()
        }
    }

    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::new()
        }
    }

    /// Offline generator producing well-formed answers for every prompt kind.
    pub fn dry_run() -> Self {
        Self::with_handler(|request| Ok(offline::respond(&request.prompt)))
    }

    /// Queue a result ahead of the handler/default.
    pub fn then(self, result: Result<String, GenerationError>) -> Self {
        self.push(result);
        self
    }

    pub fn push(&self, result: Result<String, GenerationError>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(result);
        }
    }

    /// Delay every call (on the tokio clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of calls whose prompt was of `kind`.
    pub fn calls_of_kind(&self, kind: PromptKind) -> usize {
        self.requests()
            .iter()
            .filter(|r| PromptKind::detect(&r.prompt) == Some(kind))
            .count()
    }

    /// Number of repair calls, across all dimensions.
    pub fn repair_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(PromptKind::detect(&r.prompt), Some(PromptKind::Repair(_))))
            .count()
    }

    fn next_result(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Some(result) = self.queue.lock().ok().and_then(|mut q| q.pop_front()) {
            return result;
        }
        match &self.handler {
            Some(handler) => handler(request),
            None => self.default.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_result(request)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Deterministic answers for `--dry-run`.
///
/// Scores rise with each applied revision so runs exercise the whole loop
/// and converge without a network connection.
mod offline {
    use serde_json::json;

    use crate::domain::models::Dimension;
    use crate::services::prompts::PromptKind;

    const REVISION_SENTENCE: &str = "This revision strengthens the discussion.";

    pub(super) fn respond(prompt: &str) -> String {
        match PromptKind::detect(prompt) {
            Some(PromptKind::Score) => score(prompt),
            Some(PromptKind::Repair(dimension)) => repair(prompt, dimension),
            Some(PromptKind::Outline) => outline(prompt),
            Some(PromptKind::WriteSection) => write_section(prompt),
            Some(PromptKind::Refine) => refine(prompt),
            None => "Offline response.".to_string(),
        }
    }

    fn score(prompt: &str) -> String {
        let revisions = prompt.matches(REVISION_SENTENCE).count() as f64;
        let base = (3.0 + 0.15 * revisions).min(5.0);
        let issues: Vec<&str> = if base < 4.0 {
            vec!["sections need deeper synthesis"]
        } else {
            Vec::new()
        };
        json!({
            "coverage": base,
            "coherence": base + 0.1,
            "structure": base + 0.2,
            "citations": base - 0.1,
            "insight": base - 0.2,
            "issues": issues,
            "critical_issues": Vec::<String>::new(),
        })
        .to_string()
    }

    fn targets(prompt: &str) -> Vec<usize> {
        prompt
            .lines()
            .find_map(|l| l.strip_prefix("Sections you may change: ["))
            .and_then(|rest| rest.strip_suffix(']'))
            .map(|list| {
                list.split(',')
                    .filter_map(|i| i.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn section_body(prompt: &str, index: usize) -> Option<String> {
        let header = format!("### [{index}] ");
        let start = prompt.find(&header)?;
        let after_header = start + prompt[start..].find('\n')? + 1;
        let rest = &prompt[after_header..];
        let end = ["\n\n### [", "\n\nReference papers:"]
            .iter()
            .filter_map(|marker| rest.find(marker))
            .min()
            .unwrap_or(rest.len());
        Some(rest[..end].trim().to_string())
    }

    fn section_name(prompt: &str, index: usize) -> Option<String> {
        let prefix = format!("[{index}] ");
        prompt
            .lines()
            .find_map(|l| l.strip_prefix(&prefix).map(ToString::to_string))
    }

    fn repair(prompt: &str, dimension: Dimension) -> String {
        let targets = targets(prompt);
        if dimension == Dimension::Structure {
            let edits: Vec<_> = targets
                .iter()
                .take(1)
                .filter_map(|&i| {
                    let name = section_name(prompt, i)?;
                    Some(json!({ "section": i, "title": format!("{name}: Overview") }))
                })
                .collect();
            return json!({ "edits": edits }).to_string();
        }

        let edits: Vec<_> = targets
            .iter()
            .map(|&i| {
                let body = section_body(prompt, i).unwrap_or_default();
                json!({ "section": i, "body": format!("{body} {REVISION_SENTENCE}").trim().to_string() })
            })
            .collect();
        json!({ "edits": edits }).to_string()
    }

    fn outline(prompt: &str) -> String {
        let count = prompt
            .split("Propose exactly ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(4);
        let titles = [
            "Introduction",
            "Background",
            "Core Methods",
            "Applications",
            "Evaluation",
            "Challenges",
            "Future Directions",
        ];
        (0..count)
            .map(|i| {
                titles
                    .get(i)
                    .map_or_else(|| format!("Section {}", i + 1), |t| (*t).to_string())
            })
            .map(|t| format!("{t}\n"))
            .collect()
    }

    fn write_section(prompt: &str) -> String {
        let title = prompt
            .split("Write the section \"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap_or("this section");
        let citation = prompt
            .lines()
            .find_map(|l| l.strip_prefix("[@").and_then(|r| r.split(']').next()))
            .map(|id| format!(" [@{id}]"))
            .unwrap_or_default();
        format!(
            "This section surveys {title}. Prior work establishes the main ideas{citation}. \
             Later sections build on these foundations."
        )
    }

    fn refine(prompt: &str) -> String {
        prompt
            .split(":\n")
            .nth(2)
            .and_then(|rest| rest.split("\n\nStart of the next section").next())
            .map(|body| format!("{} {REVISION_SENTENCE}", body.trim()))
            .unwrap_or_else(|| REVISION_SENTENCE.to_string())
    }
}
