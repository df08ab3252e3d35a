//! Terminal rendering. Everything returns lines so the same output can be
//! printed in command mode or painted into the browse screen.

use crate::state::{BrowseState, Focus, View};
use chrono::{DateTime, Local, Utc};
use colored::*;
use common::query::{Sort, SortField, SortOrder};
use common::{Incident, Page, ServerStatus, Severity, Status};

const COLUMNS: [(Option<SortField>, &str, usize); 6] = [
    (Some(SortField::Title), "Title", 32),
    (Some(SortField::Service), "Service", 20),
    (Some(SortField::Severity), "Severity", 8),
    (Some(SortField::Status), "Status", 9),
    (None, "Owner", 22),
    (Some(SortField::CreatedAt), "Created", 16),
];

const BOX_WIDTH: usize = 63;

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Sev1 => Color::Red,
        Severity::Sev2 => Color::BrightRed,
        Severity::Sev3 => Color::Yellow,
        Severity::Sev4 => Color::Blue,
    }
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Open => Color::Red,
        Status::Mitigated => Color::Yellow,
        Status::Resolved => Color::Green,
    }
}

/// Pads or cuts `s` to exactly `width` characters.
pub fn cell(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        format!("{:width$}", s, width = width)
    } else {
        let cut: String = s.chars().take(width.saturating_sub(2)).collect();
        format!("{}..", cut)
    }
}

pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn rule(left: &str, mid: &str, right: &str) -> String {
    let parts: Vec<String> = COLUMNS.iter().map(|(_, _, w)| "─".repeat(w + 2)).collect();
    format!("{}{}{}", left, parts.join(mid), right)
}

fn header(sort: Option<Sort>) -> String {
    let cells: Vec<String> = COLUMNS
        .iter()
        .map(|(field, name, width)| {
            let label = match (sort, field) {
                (Some(sort), Some(field)) if sort.field == *field => {
                    let arrow = match sort.order {
                        SortOrder::Asc => "▲",
                        SortOrder::Desc => "▼",
                    };
                    format!("{} {}", name, arrow)
                }
                _ => name.to_string(),
            };
            format!(" {} ", cell(&label, *width))
        })
        .collect();
    format!("│{}│", cells.join("│"))
}

fn row(incident: &Incident, selected: bool) -> String {
    let title = cell(&incident.title, COLUMNS[0].2);
    let title = if selected {
        title.black().on_bright_cyan().bold()
    } else {
        title.bright_white()
    };
    format!(
        "│ {} │ {} │ {} │ {} │ {} │ {} │",
        title,
        cell(&incident.service, COLUMNS[1].2).bright_white(),
        cell(incident.severity.as_str(), COLUMNS[2].2)
            .color(severity_color(incident.severity))
            .bold(),
        cell(incident.status.as_str(), COLUMNS[3].2).color(status_color(incident.status)),
        cell(incident.owner.as_deref().unwrap_or("-"), COLUMNS[4].2).dimmed(),
        cell(&format_time(incident.created_at), COLUMNS[5].2).dimmed(),
    )
}

pub fn table(page: &Page<Incident>, selected: Option<usize>, sort: Option<Sort>) -> Vec<String> {
    if page.data.is_empty() {
        return empty();
    }
    let mut lines = vec![
        rule("┌", "┬", "┐").bright_cyan().to_string(),
        header(sort).bright_cyan().bold().to_string(),
        rule("├", "┼", "┤").bright_cyan().to_string(),
    ];
    for (i, incident) in page.data.iter().enumerate() {
        lines.push(row(incident, selected == Some(i)));
    }
    lines.push(rule("└", "┴", "┘").bright_cyan().to_string());
    lines.push(pager(page));
    lines
}

pub fn pager(page: &Page<Incident>) -> String {
    let meta = page.meta;
    format!(
        "Page {} of {} ({} total)",
        meta.page,
        meta.total_pages.max(1),
        meta.total
    )
    .dimmed()
    .to_string()
}

pub fn loading() -> Vec<String> {
    vec![format!("{}", "⏳ Loading incidents...".bright_yellow())]
}

pub fn failed(message: &str) -> Vec<String> {
    vec![format!("{} {}", "❌ Error:".red().bold(), message)]
}

pub fn empty() -> Vec<String> {
    vec![format!("{}", "📭 No incidents found".dimmed())]
}

pub fn success(message: &str) -> String {
    format!("{} {}", "✔".bright_green().bold(), message.bright_green())
}

pub fn failure(message: &str) -> String {
    format!("{} {}", "✘".red().bold(), message.red())
}

fn boxed(title: &str, rows: Vec<(String, ColoredString)>) -> Vec<String> {
    let border = "═".repeat(BOX_WIDTH);
    let mut lines = vec![
        format!("╔{}╗", border).bright_cyan().to_string(),
        format!("║ {} ║", cell(title, BOX_WIDTH - 2)).bright_cyan().bold().to_string(),
        format!("╠{}╣", border).bright_cyan().to_string(),
    ];
    for (label, value) in rows {
        lines.push(format!("{} {}", format!("║ {:<10}", label).bright_cyan(), value));
    }
    lines.push(format!("╚{}╝", border).bright_cyan().to_string());
    lines
}

pub fn detail(incident: &Incident) -> Vec<String> {
    let mut rows = vec![
        ("ID:".to_string(), incident.id.bright_white().bold()),
        ("Title:".to_string(), incident.title.bright_white()),
        ("Service:".to_string(), incident.service.bright_white()),
        (
            "Severity:".to_string(),
            incident.severity.as_str().color(severity_color(incident.severity)).bold(),
        ),
        (
            "Status:".to_string(),
            incident.status.label().color(status_color(incident.status)).bold(),
        ),
        (
            "Owner:".to_string(),
            incident.owner.as_deref().unwrap_or("Unassigned").normal(),
        ),
        ("Created:".to_string(), format_time(incident.created_at).dimmed()),
        ("Updated:".to_string(), format_time(incident.updated_at).dimmed()),
    ];
    match incident.summary.as_deref() {
        Some(summary) => {
            let wrapped = wrap(summary, BOX_WIDTH - 12);
            for (i, line) in wrapped.into_iter().enumerate() {
                let label = if i == 0 { "Summary:" } else { "" };
                rows.push((label.to_string(), line.normal()));
            }
        }
        None => rows.push(("Summary:".to_string(), "-".dimmed())),
    }
    boxed("Incident Details", rows)
}

pub fn status(report: &ServerStatus) -> Vec<String> {
    let uptime = report.uptime_seconds;
    let uptime = format!("{}h {}m {}s", uptime / 3600, (uptime % 3600) / 60, uptime % 60);
    let open = report.incidents.open;
    let count = |severity: Severity, n: u64| n.to_string().color(severity_color(severity)).bold();
    boxed(
        "Incident Tracker Status",
        vec![
            ("Status:".to_string(), report.status.bright_green().bold()),
            ("Uptime:".to_string(), uptime.bright_white()),
            ("Open SEV1:".to_string(), count(Severity::Sev1, open.sev1)),
            ("Open SEV2:".to_string(), count(Severity::Sev2, open.sev2)),
            ("Open SEV3:".to_string(), count(Severity::Sev3, open.sev3)),
            ("Open SEV4:".to_string(), count(Severity::Sev4, open.sev4)),
            ("Total:".to_string(), open.total().to_string().bright_white().bold()),
        ],
    )
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn input(label: &str, value: &str, focused: bool, pending: bool) -> String {
    let marker = if pending { "…" } else { " " };
    let field = format!("[{:<20}]{}", value, marker);
    if focused {
        format!("{} {}", label.bright_cyan().bold(), field.bright_white().bold())
    } else {
        format!("{} {}", label.dimmed(), field.normal())
    }
}

/// Full browse screen for the current state.
pub fn browse(state: &BrowseState) -> Vec<String> {
    let severity = state.severity.map(|s| s.as_str()).unwrap_or("All");
    let status = state.status.map(|s| s.label()).unwrap_or("All");
    let mut lines = vec![
        format!("{}", "Incident Tracker".bright_cyan().bold()),
        format!(
            "{}   {}   {} {}   {} {}",
            input(
                "Search:",
                state.search.value(),
                state.focus == Focus::Search,
                state.search.is_pending()
            ),
            input(
                "Service:",
                state.service.value(),
                state.focus == Focus::Service,
                state.service.is_pending()
            ),
            "Severity:".dimmed(),
            severity.bright_white(),
            "Status:".dimmed(),
            status.bright_white(),
        ),
        String::new(),
    ];

    match state.view {
        View::Loading => lines.extend(loading()),
        View::Failed(ref message) => lines.extend(failed(message)),
        View::Loaded(ref page) => lines.extend(table(page, Some(state.selected), Some(state.sort))),
    }

    lines.push(String::new());
    lines.push(match state.flash {
        Some(ref flash) if flash.success => success(&flash.message),
        Some(ref flash) => failure(&flash.message),
        None => String::new(),
    });
    lines.push(
        "Tab field  ↑/↓ select  ←/→ page  Enter open  ^N new  ^S severity  ^T status  ^O sort  ^R order  Esc quit"
            .dimmed()
            .to_string(),
    );
    lines
}
