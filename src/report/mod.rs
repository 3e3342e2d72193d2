//! Report rendering
//!
//! One-shot mode prints each consumer as tables, JSON, or CSV/TSV rows. A
//! journal whose lag could not be determined shows as `unknown`; a member
//! whose owned journals include one shows its total as a lower bound.

mod format;

pub use format::{csv_escape, format_bytes, format_delimited_row, tsv_escape, OutputFormat};

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use crate::consumer::{ConsumerLag, JournalState, LagStats, MemberLag};
use crate::error::Result;

/// Rendered in place of a lag that could not be determined
pub const UNKNOWN_LAG: &str = "unknown";

/// JSON shape of one consumer
#[derive(Debug, Serialize)]
struct ConsumerReport<'a> {
    consumer: &'a str,
    total_lag: u64,
    stats: LagStats,
    journals: &'a [crate::consumer::JournalLag],
    members: &'a [MemberLag],
}

impl<'a> From<&'a ConsumerLag> for ConsumerReport<'a> {
    fn from(lag: &'a ConsumerLag) -> Self {
        Self {
            consumer: &lag.consumer,
            total_lag: lag.total_lag(),
            stats: lag.stats(),
            journals: &lag.journals,
            members: &lag.members,
        }
    }
}

/// Lag cell text: humanized bytes or `unknown`
pub fn lag_cell(lag: Option<u64>) -> String {
    match lag {
        Some(bytes) => format_bytes(bytes),
        None => UNKNOWN_LAG.to_string(),
    }
}

/// Member total text, marked as a lower bound when incomplete
pub fn member_total(member: &MemberLag) -> String {
    if member.incomplete {
        format!(">= {} (incomplete data)", format_bytes(member.total_lag))
    } else {
        format_bytes(member.total_lag)
    }
}

fn state_color(state: JournalState) -> Color {
    match state {
        JournalState::Ok => Color::Green,
        JournalState::Recovering | JournalState::NotReading => Color::Yellow,
        JournalState::EtcdAhead => Color::Magenta,
        JournalState::Unavailable => Color::Red,
    }
}

/// Journal and member tables of one consumer
pub fn render_text(lag: &ConsumerLag) -> String {
    let mut out = format!("{} {}\n", "Consumer:".bold(), lag.consumer);

    let mut journals = Table::new();
    journals.load_preset(UTF8_FULL_CONDENSED);
    journals.set_content_arrangement(ContentArrangement::Dynamic);
    journals.set_header(vec![
        Cell::new("Journal").fg(Color::Cyan),
        Cell::new("Lag").fg(Color::Cyan),
        Cell::new("State").fg(Color::Cyan),
        Cell::new("Owner").fg(Color::Cyan),
    ]);
    for journal in &lag.journals {
        journals.add_row(vec![
            Cell::new(&journal.journal),
            Cell::new(lag_cell(journal.lag)),
            Cell::new(journal.state.as_str()).fg(state_color(journal.state)),
            Cell::new(journal.owner.as_deref().unwrap_or("-")),
        ]);
    }
    out.push_str(&journals.to_string());
    out.push('\n');

    if lag.members.is_empty() {
        out.push_str("No members resolved.\n");
    } else {
        let mut members = Table::new();
        members.load_preset(UTF8_FULL_CONDENSED);
        members.set_content_arrangement(ContentArrangement::Dynamic);
        members.set_header(vec![
            Cell::new("Member").fg(Color::Cyan),
            Cell::new("Masters").fg(Color::Cyan),
            Cell::new("Replicas").fg(Color::Cyan),
            Cell::new("Total Lag").fg(Color::Cyan),
        ]);
        for member in &lag.members {
            let total = Cell::new(member_total(member));
            members.add_row(vec![
                Cell::new(&member.member),
                Cell::new(member.masters),
                Cell::new(member.replicas),
                if member.incomplete {
                    total.fg(Color::Yellow)
                } else {
                    total
                },
            ]);
        }
        out.push_str(&members.to_string());
        out.push('\n');
    }

    let total = lag.total_lag();
    let total = if total == 0 {
        format_bytes(total).green()
    } else {
        format_bytes(total).yellow()
    };
    out.push_str(&format!("{} {}\n", "Total lag:".bold(), total));
    out
}

/// JSON array of every consumer
pub fn render_json(lags: &[ConsumerLag]) -> Result<String> {
    let reports: Vec<ConsumerReport<'_>> = lags.iter().map(ConsumerReport::from).collect();
    Ok(serde_json::to_string_pretty(&reports)?)
}

/// Journal rows followed by member rows, each block with its own header
pub fn render_delimited(format: OutputFormat, lag: &ConsumerLag) -> String {
    let mut lines = vec![format_delimited_row(
        format,
        &["consumer", "journal", "lag", "state", "owner"],
    )];
    for journal in &lag.journals {
        let value = journal
            .lag
            .map(|l| l.to_string())
            .unwrap_or_else(|| UNKNOWN_LAG.to_string());
        lines.push(format_delimited_row(
            format,
            &[
                &lag.consumer,
                &journal.journal,
                &value,
                journal.state.as_str(),
                journal.owner.as_deref().unwrap_or(""),
            ],
        ));
    }

    lines.push(String::new());
    lines.push(format_delimited_row(
        format,
        &["consumer", "member", "masters", "replicas", "total_lag", "incomplete"],
    ));
    for member in &lag.members {
        lines.push(format_delimited_row(
            format,
            &[
                &lag.consumer,
                &member.member,
                &member.masters.to_string(),
                &member.replicas.to_string(),
                &member.total_lag.to_string(),
                if member.incomplete { "true" } else { "false" },
            ],
        ));
    }
    lines.join("\n")
}

/// Render `lags` in `format`
pub fn render(format: OutputFormat, lags: &[ConsumerLag]) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(lags),
        OutputFormat::Text => Ok(lags.iter().map(render_text).collect::<Vec<_>>().join("\n")),
        OutputFormat::Csv | OutputFormat::Tsv => Ok(lags
            .iter()
            .map(|lag| render_delimited(format, lag))
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}
