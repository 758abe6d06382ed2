//! Table builders around comfy-table for trace and run listings.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

use crate::cli::output::{format_score, truncate};
use crate::domain::models::{Dimension, IterationRecord, RunState};

/// Create a borderless list table with the given headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

fn right(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

/// One row per scored iteration: per-dimension scores, overall and repairs.
pub fn trace_table(trace: &[IterationRecord]) -> Table {
    let mut headers = vec!["iter"];
    headers.extend(Dimension::ALL.iter().map(Dimension::as_str));
    headers.extend(["overall", "flags", "targeted", "ms"]);

    let mut table = list_table(&headers);
    for record in trace {
        let mut row = vec![right(record.iteration)];
        row.extend(
            Dimension::ALL
                .iter()
                .map(|d| right(format!("{:.2}", record.verdict.score(*d)))),
        );
        row.push(right(format!("{:.2}", record.overall_score)));
        row.push(Cell::new(flags(record)));
        row.push(Cell::new(
            record
                .targeted
                .iter()
                .map(Dimension::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ));
        row.push(right(record.duration_ms));
        table.add_row(row);
    }
    table
}

fn flags(record: &IterationRecord) -> String {
    let mut flags = Vec::new();
    if record.verdict.is_degraded() {
        flags.push("degraded");
    }
    if record.verdict.has_critical_issue {
        flags.push("critical");
    }
    if record.regressed {
        flags.push("regressed");
    }
    if record.revision_notes.iter().any(|n| n.outcome.is_failure()) {
        flags.push("repair-failed");
    }
    flags.join(",")
}

/// One row per checkpointed run.
pub fn runs_table(runs: &[RunState]) -> Table {
    let mut table = list_table(&["run id", "topic", "phase", "iters", "score", "updated"]);
    for state in runs {
        table.add_row(vec![
            Cell::new(&state.run_id),
            Cell::new(truncate(&state.draft.topic, 40)),
            Cell::new(state.phase),
            right(state.trace.len()),
            right(format_score(state.final_score())),
            Cell::new(state.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DimensionScores, Verdict};

    fn record(iteration: u32, verdict: Verdict) -> IterationRecord {
        IterationRecord {
            iteration,
            overall_score: verdict.overall_score(),
            verdict,
            duration_ms: 12,
            targeted: vec![Dimension::Insight, Dimension::Coverage],
            revision_notes: vec![],
            regressed: iteration == 1,
            draft_digest: String::new(),
        }
    }

    #[test]
    fn test_trace_table_renders_scores_and_flags() {
        let rendered = trace_table(&[
            record(0, Verdict::genuine(DimensionScores::uniform(3.25), vec![], false)),
            record(1, Verdict::degraded()),
        ])
        .to_string();

        assert!(rendered.contains("OVERALL"));
        assert!(rendered.contains("3.25"));
        assert!(rendered.contains("insight,coverage"));
        assert!(rendered.contains("degraded,regressed"));
    }
}
