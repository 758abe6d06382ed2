//! Bounded serialisation of drafts for prompts.
//!
//! Section boundaries are kept intact: whole sections are dropped lowest
//! priority first (later sections first on ties) until the rendering fits.
//! A single remaining section that still does not fit is cut at its last
//! sentence boundary.

use crate::domain::models::Section;

/// A draft rendered within a character budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedDraft {
    pub text: String,
    /// Indices of sections present in `text`, in draft order.
    pub kept: Vec<usize>,
    /// Names of dropped sections, in draft order.
    pub omitted: Vec<String>,
    /// Index of the section whose body was cut, if any.
    pub cut: Option<usize>,
}

impl FittedDraft {
    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty() && self.cut.is_none()
    }
}

/// Render one section with its draft index.
pub fn render_section(index: usize, name: &str, body: &str) -> String {
    format!("### [{index}] {name}\n{body}\n\n")
}

/// Longest prefix of `text` within `max_chars` characters that ends on a
/// sentence boundary (`.`, `!` or `?` followed by whitespace, or a newline).
/// Returns `text` unchanged when it already fits, and an empty string when
/// no boundary exists inside the budget.
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> &str {
    if text.chars().count() <= max_chars {
        return text;
    }

    let limit = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| i);

    let mut boundary = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if i >= limit {
            break;
        }
        let end = i + c.len_utf8();
        match c {
            '\n' => boundary = end,
            '.' | '!' | '?' => {
                if chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                    boundary = end;
                }
            }
            _ => {}
        }
    }

    text[..boundary].trim_end()
}

/// Render `sections` within `max_chars` characters.
pub fn fit_sections(sections: &[Section], max_chars: usize) -> FittedDraft {
    let rendered: Vec<String> = sections
        .iter()
        .enumerate()
        .map(|(i, s)| render_section(i, &s.name, &s.body))
        .collect();
    let lengths: Vec<usize> = rendered.iter().map(|r| r.chars().count()).collect();

    let mut kept = vec![true; sections.len()];
    let mut total: usize = lengths.iter().sum();
    let mut remaining = sections.len();

    let mut drop_order: Vec<usize> = (0..sections.len()).collect();
    drop_order.sort_by(|&a, &b| {
        sections[a]
            .priority
            .cmp(&sections[b].priority)
            .then(b.cmp(&a))
    });

    for index in drop_order {
        if total <= max_chars || remaining <= 1 {
            break;
        }
        kept[index] = false;
        total -= lengths[index];
        remaining -= 1;
    }

    let mut fitted = FittedDraft {
        text: String::new(),
        kept: Vec::with_capacity(remaining),
        omitted: Vec::new(),
        cut: None,
    };

    for (index, section) in sections.iter().enumerate() {
        if !kept[index] {
            fitted.omitted.push(section.name.clone());
            continue;
        }
        fitted.kept.push(index);
        if total > max_chars {
            // only reachable with a single kept section
            let header = render_section(index, &section.name, "").chars().count();
            let body = truncate_at_sentence(&section.body, max_chars.saturating_sub(header));
            fitted.text.push_str(&render_section(index, &section.name, body));
            fitted.cut = Some(index);
        } else {
            fitted.text.push_str(&rendered[index]);
        }
    }

    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, body: &str, priority: u8) -> Section {
        Section::new(name, body).with_priority(priority)
    }

    #[test]
    fn test_everything_fits() {
        let sections = vec![section("A", "alpha", 1), section("B", "beta", 1)];
        let fitted = fit_sections(&sections, 10_000);
        assert!(fitted.is_complete());
        assert_eq!(fitted.kept, vec![0, 1]);
        assert!(fitted.text.contains("### [1] B\nbeta"));
    }

    #[test]
    fn test_drops_lowest_priority_first() {
        let body = "x".repeat(100);
        let sections = vec![
            section("Intro", &body, 3),
            section("Methods", &body, 1),
            section("Results", &body, 2),
        ];
        let one = render_section(0, "Intro", &body).chars().count();
        let fitted = fit_sections(&sections, one * 2 + 5);
        assert_eq!(fitted.kept, vec![0, 2]);
        assert_eq!(fitted.omitted, vec!["Methods".to_string()]);
        assert!(fitted.cut.is_none());
    }

    #[test]
    fn test_ties_drop_later_sections_first() {
        let body = "y".repeat(100);
        let sections = vec![
            section("First", &body, 1),
            section("Second", &body, 1),
            section("Third", &body, 1),
        ];
        let one = render_section(0, "Second", &body).chars().count();
        let fitted = fit_sections(&sections, one * 2 + 5);
        assert_eq!(fitted.kept, vec![0, 1]);
        assert_eq!(fitted.omitted, vec!["Third".to_string()]);
    }

    #[test]
    fn test_single_section_cut_at_sentence() {
        let body = "First sentence here. Second sentence is longer than the rest! Third one?";
        let sections = vec![section("Only", body, 1)];
        let header = render_section(0, "Only", "").chars().count();
        let fitted = fit_sections(&sections, header + 45);
        assert_eq!(fitted.cut, Some(0));
        assert!(fitted.text.contains("First sentence here."));
        assert!(!fitted.text.contains("Second"));
    }

    #[test]
    fn test_truncate_at_sentence_boundaries() {
        assert_eq!(truncate_at_sentence("short", 10), "short");
        assert_eq!(
            truncate_at_sentence("One. Two. Three four five", 12),
            "One. Two."
        );
        assert_eq!(truncate_at_sentence("line one\nline two", 12), "line one");
        // no boundary within the budget
        assert_eq!(truncate_at_sentence("averyveryverylongword. next", 10), "");
        // a period not followed by whitespace is not a boundary
        assert_eq!(truncate_at_sentence("v1.2 is out. more text", 9), "");
    }

    #[test]
    fn test_truncate_handles_multibyte_text() {
        let text = "Résumé naïve. Ünïcödé continues here";
        let cut = truncate_at_sentence(text, 20);
        assert_eq!(cut, "Résumé naïve.");
    }
}
