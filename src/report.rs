//! Plain-text rendering of parse results and merge plans for operators.

use std::borrow::Cow;
use std::fmt::Write as _;

use itertools::Itertools;

use crate::{
    merge::MergeOutcome,
    pipeline::ParseResult,
    validate::{InvalidRow, ValidRow},
};

/// Renders `rows` under `headers` as space-aligned columns with a dashed rule
/// below the header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(&sanitize_cell(cell)));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn render_valid_rows(rows: &[ValidRow]) -> String {
    let headers = strings(&["name", "company", "email", "phone", "status", "tags"]);
    let body = rows
        .iter()
        .map(|row| {
            vec![
                row.name().to_string(),
                row.company().unwrap_or_default().to_string(),
                row.email().unwrap_or_default().to_string(),
                row.phone().unwrap_or_default().to_string(),
                row.status().map(|s| s.to_string()).unwrap_or_default(),
                row.tags().iter().join("|"),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &body)
}

pub fn render_invalid_rows(rows: &[InvalidRow]) -> String {
    let headers = strings(&["row", "errors", "raw"]);
    let body = rows
        .iter()
        .map(|row| {
            vec![
                row.row_number.to_string(),
                row.errors.join("; "),
                row.raw_data
                    .iter()
                    .map(|(field, value)| format!("{field}={value}"))
                    .join(", "),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &body)
}

pub fn render_parse_summary(result: &ParseResult) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} row(s) read: {} valid, {} invalid",
        result.total_rows(),
        result.valid_rows.len(),
        result.invalid_rows.len()
    );
    if !result.invalid_rows.is_empty() {
        output.push('\n');
        output.push_str(&render_invalid_rows(&result.invalid_rows));
    }
    output
}

pub fn render_outcome(outcome: &MergeOutcome) -> String {
    let headers = strings(&["metric", "count"]);
    let body = [
        ("total input", outcome.total_input),
        ("created", outcome.created),
        ("updated", outcome.updated),
        ("duplicates skipped", outcome.duplicates_skipped),
        ("ignored", outcome.ignored()),
    ]
    .into_iter()
    .map(|(label, count)| vec![label.to_string(), count.to_string()])
    .collect::<Vec<_>>();
    render_table(&headers, &body)
}
