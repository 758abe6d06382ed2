//! Prompt templates for every generative call the engine makes.
//!
//! Each prompt opens with a `Task:` line naming its kind so responses can be
//! routed by offline generators and so logs stay readable.

use crate::domain::models::{Dimension, Draft, Paper};

use super::truncation::{render_section, FittedDraft};

/// Characters of each abstract shown to the service.
pub const ABSTRACT_EXCERPT_CHARS: usize = 300;

/// Kind of prompt, recovered from its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Score,
    Repair(Dimension),
    Outline,
    WriteSection,
    Refine,
}

impl PromptKind {
    fn header(&self) -> String {
        match self {
            PromptKind::Score => "Task: score".to_string(),
            PromptKind::Repair(dimension) => format!("Task: repair {dimension}"),
            PromptKind::Outline => "Task: outline".to_string(),
            PromptKind::WriteSection => "Task: write-section".to_string(),
            PromptKind::Refine => "Task: refine".to_string(),
        }
    }

    /// Recover the kind from a prompt produced by this module.
    pub fn detect(prompt: &str) -> Option<PromptKind> {
        let first = prompt.lines().next()?.trim();
        let task = first.strip_prefix("Task: ")?;
        match task {
            "score" => Some(PromptKind::Score),
            "outline" => Some(PromptKind::Outline),
            "write-section" => Some(PromptKind::WriteSection),
            "refine" => Some(PromptKind::Refine),
            other => other
                .strip_prefix("repair ")
                .and_then(|d| d.parse().ok())
                .map(PromptKind::Repair),
        }
    }
}

fn paper_list(papers: &[Paper]) -> String {
    if papers.is_empty() {
        return "(no reference papers available)".to_string();
    }
    papers
        .iter()
        .map(|p| p.prompt_line(ABSTRACT_EXCERPT_CHARS))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none reported)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Quality assessment prompt for a (possibly truncated) draft.
pub fn score_prompt(topic: &str, fitted: &FittedDraft) -> String {
    let mut prompt = format!(
        "{header}\n\
         You are an expert reviewer assessing an academic literature survey.\n\n\
         Survey topic: {topic}\n\n\
         Survey content:\n{body}",
        header = PromptKind::Score.header(),
        body = fitted.text,
    );

    if !fitted.omitted.is_empty() {
        prompt.push_str(&format!(
            "Sections omitted for length (judge them as present but unseen): {}\n\n",
            fitted.omitted.join(", ")
        ));
    }
    if let Some(index) = fitted.cut {
        prompt.push_str(&format!("Section [{index}] was shortened for length.\n\n"));
    }

    prompt.push_str(
        "Rate the survey from 1 to 5 on each dimension:\n\
         - coverage: does it cover the topic comprehensively?\n\
         - coherence: do sections connect with smooth transitions?\n\
         - structure: is it organised in a logical order?\n\
         - citations: are claims supported by [@id] citations?\n\
         - insight: does it synthesise trends and open problems?\n\n\
         Respond with a single JSON object and nothing else:\n\
         {\"coverage\": 0.0, \"coherence\": 0.0, \"structure\": 0.0, \"citations\": 0.0, \
         \"insight\": 0.0, \"issues\": [\"...\"], \"critical_issues\": [\"...\"]}\n\
         List in critical_issues only problems that make the survey unacceptable.",
    );
    prompt
}

fn dimension_instructions(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Coverage => {
            "Improve topic coverage. Extend the bodies of the listed sections and, if a \
             major subtopic is missing, add new sections via \"insert\". Use the reference \
             papers and cite them with [@id] markers."
        }
        Dimension::Coherence => {
            "Improve coherence. Rewrite the bodies of the listed sections so each opens \
             by connecting to the previous section and closes by leading into the next. \
             Keep the content and citations."
        }
        Dimension::Structure => {
            "Improve structure. Reorder sections with \"order\" (a permutation of all \
             section indices) and/or rename them with \"title\". Do not supply bodies."
        }
        Dimension::Citations => {
            "Improve citation support. Rewrite the bodies of the listed sections so that \
             key claims cite the reference papers with [@id] markers."
        }
        Dimension::Insight => {
            "Improve synthesis. Rewrite the body of the listed section to add cross-cutting \
             insights, emerging trends and open research questions."
        }
    }
}

/// Repair prompt for one dimension.
///
/// `targets` are the section indices the response may edit.
pub fn repair_prompt(
    dimension: Dimension,
    draft: &Draft,
    targets: &[usize],
    issues: &[String],
    papers: &[Paper],
) -> String {
    let outline = draft
        .sections
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{i}] {}", s.name))
        .collect::<Vec<_>>()
        .join("\n");

    let target_text: String = targets
        .iter()
        .filter_map(|&i| draft.sections.get(i).map(|s| render_section(i, &s.name, &s.body)))
        .collect();

    let target_list = targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{header}\n\
         You are revising an academic literature survey on: {topic}\n\n\
         {instructions}\n\n\
         Reviewer issues:\n{issues}\n\n\
         Current outline:\n{outline}\n\n\
         Sections you may change: [{target_list}]\n\n\
         {target_text}\
         Reference papers:\n{papers}\n\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"edits\": [{{\"section\": 0, \"title\": \"optional new title\", \"body\": \"optional new body\"}}], \
         \"insert\": [{{\"title\": \"...\", \"body\": \"...\"}}], \"order\": [0, 1, 2]}}\n\
         Omit keys you do not use.",
        header = PromptKind::Repair(dimension).header(),
        topic = draft.topic,
        instructions = dimension_instructions(dimension),
        issues = bullet_list(issues),
        papers = paper_list(papers),
    )
}

/// Outline prompt for a seed draft.
pub fn outline_prompt(topic: &str, section_count: usize, papers: &[Paper]) -> String {
    format!(
        "{header}\n\
         Plan a literature survey on: {topic}\n\n\
         Relevant papers:\n{papers}\n\n\
         Propose exactly {section_count} section titles covering the field from \
         background to future directions. Respond with one section title per line and \
         nothing else.",
        header = PromptKind::Outline.header(),
        papers = paper_list(papers),
    )
}

/// Section-writing prompt for a seed draft.
pub fn section_prompt(topic: &str, title: &str, outline: &[String], papers: &[Paper]) -> String {
    format!(
        "{header}\n\
         Write the section \"{title}\" of a literature survey on: {topic}\n\n\
         Full outline:\n{outline}\n\n\
         Reference papers:\n{papers}\n\n\
         Write 3-5 paragraphs of academic prose. Cite papers inline with their [@id] \
         markers. Do not repeat the section title.",
        header = PromptKind::WriteSection.header(),
        outline = bullet_list(outline),
        papers = paper_list(papers),
    )
}

/// Local refinement prompt used by the baseline strategy.
pub fn refine_prompt(
    topic: &str,
    title: &str,
    body: &str,
    previous_tail: &str,
    next_head: &str,
) -> String {
    format!(
        "{header}\n\
         Refine one section of a literature survey on: {topic}\n\n\
         End of the previous section:\n...{previous_tail}\n\n\
         Section \"{title}\":\n{body}\n\n\
         Start of the next section:\n{next_head}...\n\n\
         Rewrite the section so it flows from the previous section and into the next. \
         Keep its content and [@id] citations. Respond with the rewritten section body only.",
        header = PromptKind::Refine.header(),
    )
}
