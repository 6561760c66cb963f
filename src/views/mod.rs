//! Pluggable result views.
//!
//! A static registry maps view keys to pure text renderers. Use cases enable
//! an ordered list of keys; unknown keys are skipped silently so older
//! configurations keep working against newer builds.

use crate::correlate::CorrelatedTicket;
use crate::model::Run;
use serde_json::Value;

/// Read-only inputs for a renderer. Renderers perform no I/O.
pub struct ResultViewContext<'a> {
    pub run: &'a Run,
    /// Narrative markdown, already sanitized.
    pub markdown: &'a str,
    pub tickets: &'a [CorrelatedTicket],
    pub loading_tickets: bool,
}

/// A named renderer interpreting a completed run for one display purpose.
pub struct ResultView {
    pub key: &'static str,
    pub title: &'static str,
    pub description: Option<&'static str>,
    pub render: fn(&ResultViewContext<'_>) -> Vec<String>,
}

pub static REGISTRY: &[ResultView] = &[
    ResultView {
        key: "summary",
        title: "Analysis summary",
        description: Some("Narrative output with raw data blocks removed"),
        render: render_summary,
    },
    ResultView {
        key: "result-table",
        title: "Result rows",
        description: None,
        render: render_table,
    },
    ResultView {
        key: "tickets",
        title: "Correlated tickets",
        description: Some("Tickets referenced by the run results"),
        render: render_tickets,
    },
];

/// Resolve an ordered key list against the registry, skipping unknown keys.
pub fn resolve_views(keys: &[String]) -> Vec<&'static ResultView> {
    keys.iter()
        .filter_map(|key| REGISTRY.iter().find(|v| v.key == key))
        .collect()
}

fn render_summary(ctx: &ResultViewContext<'_>) -> Vec<String> {
    if ctx.markdown.is_empty() {
        return vec!["(no narrative output)".to_string()];
    }
    ctx.markdown.lines().map(str::to_string).collect()
}

fn render_table(ctx: &ResultViewContext<'_>) -> Vec<String> {
    let rows = match ctx.run.result_rows.as_deref() {
        Some(rows) if !rows.is_empty() => rows,
        _ => return vec!["(no result rows)".to_string()],
    };
    let columns: Vec<String> = match ctx.run.result_columns.as_ref() {
        Some(cols) if !cols.is_empty() => cols.clone(),
        _ => rows[0].keys().cloned().collect(),
    };

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, col) in columns.iter().enumerate() {
            let text = row.get(col).map(cell_text).unwrap_or_default();
            widths[i] = widths[i].max(text.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(
        &columns.iter().map(String::as_str).collect::<Vec<_>>(),
        &widths,
    ));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| row.get(col).map(cell_text).unwrap_or_default())
            .collect();
        lines.push(format_row(
            &cells.iter().map(String::as_str).collect::<Vec<_>>(),
            &widths,
        ));
    }
    lines
}

fn render_tickets(ctx: &ResultViewContext<'_>) -> Vec<String> {
    if ctx.loading_tickets {
        return vec!["(loading tickets...)".to_string()];
    }
    if ctx.tickets.is_empty() {
        return vec!["(no correlated tickets)".to_string()];
    }
    ctx.tickets
        .iter()
        .map(|ticket| {
            let mut line = ticket.id.clone();
            if let Value::Object(fields) = &ticket.fields {
                let parts: Vec<String> = fields
                    .iter()
                    .filter(|(k, _)| k.as_str() != "id")
                    .map(|(k, v)| format!("{k}={}", cell_text(v)))
                    .collect();
                if !parts.is_empty() {
                    line.push_str(&format!("  ({})", parts.join(", ")));
                }
            }
            line
        })
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn format_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<width$}", width = *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;
    use serde_json::json;
    use time::OffsetDateTime;

    fn completed_run() -> Run {
        let mut row1 = serde_json::Map::new();
        row1.insert("ticket_id".into(), json!("TCK-1"));
        row1.insert("hours_open".into(), json!(49));
        let mut row2 = serde_json::Map::new();
        row2.insert("ticket_id".into(), json!("TCK-2"));
        row2.insert("hours_open".into(), json!(3));
        Run {
            id: "r1".into(),
            status: RunStatus::Completed,
            created_at: OffsetDateTime::UNIX_EPOCH,
            started_at: None,
            completed_at: None,
            result_rows: Some(vec![row1, row2]),
            result_columns: Some(vec!["ticket_id".into(), "hours_open".into()]),
            result_markdown: Some("All good.".into()),
            error: None,
        }
    }

    fn ctx<'a>(run: &'a Run, tickets: &'a [CorrelatedTicket]) -> ResultViewContext<'a> {
        ResultViewContext {
            run,
            markdown: "All good.",
            tickets,
            loading_tickets: false,
        }
    }

    #[test]
    fn unknown_keys_are_skipped_silently() {
        let keys = vec![
            "summary".to_string(),
            "sla-heatmap".to_string(),
            "tickets".to_string(),
        ];
        let views = resolve_views(&keys);
        let resolved: Vec<&str> = views.iter().map(|v| v.key).collect();
        assert_eq!(resolved, vec!["summary", "tickets"]);
    }

    #[test]
    fn table_view_aligns_columns_in_order() {
        let run = completed_run();
        let lines = render_table(&ctx(&run, &[]));
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ticket_id"));
        assert!(lines[2].starts_with("TCK-1"));
        assert!(lines[2].contains("49"));
    }

    #[test]
    fn table_view_tolerates_absent_rows() {
        let mut run = completed_run();
        run.result_rows = None;
        let lines = render_table(&ctx(&run, &[]));
        assert_eq!(lines, vec!["(no result rows)"]);
    }

    #[test]
    fn tickets_view_lists_resolved_fields() {
        let run = completed_run();
        let tickets = vec![CorrelatedTicket {
            id: "TCK-1".into(),
            fields: json!({ "id": "TCK-1", "subject": "vpn down", "priority": "high" }),
            error: None,
        }];
        let lines = render_tickets(&ctx(&run, &tickets));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("TCK-1"));
        assert!(lines[0].contains("subject=vpn down"));
    }

    #[test]
    fn tickets_view_shows_loading_placeholder() {
        let run = completed_run();
        let context = ResultViewContext {
            run: &run,
            markdown: "",
            tickets: &[],
            loading_tickets: true,
        };
        assert_eq!(render_tickets(&context), vec!["(loading tickets...)"]);
    }
}
