use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::api::models::{RankingRow, TrialRow};
use crate::page::Page;
use crate::summary::SummaryCard;
use crate::table::{RemoteTable, TableRequest, ViewKind};
use crate::view::status_class;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Status cell: the status text prefixed with its label class.
pub fn status_label(status: &str) -> String {
    format!("[{}] {status}", status_class(status).as_str())
}

/// Title cell, with the pACT marker when the trial is flagged.
pub fn trial_title(row: &TrialRow) -> String {
    if row.is_pact {
        format!("{} [pACT]", row.title)
    } else {
        row.title.clone()
    }
}

pub fn percentage_cell(pct: Option<f64>) -> String {
    pct.map(|p| format!("{p}%")).unwrap_or_default()
}

fn rows_as<T: serde::de::DeserializeOwned>(table: &RemoteTable) -> Vec<T> {
    table
        .rows()
        .iter()
        .filter_map(|v| match serde_json::from_value(v.clone()) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("skipping malformed row: {e}");
                None
            }
        })
        .collect()
}

/// Print the page's table, then its paging footer.
pub fn print_page(page: &Page) {
    let table = page.table();
    match table.view() {
        ViewKind::Rankings => print_rankings(&rows_as::<RankingRow>(table)),
        ViewKind::Trials => {
            let hide_sponsor = page.context().sponsor_slug.is_some();
            print_trials(&rows_as::<TrialRow>(table), hide_sponsor);
        }
    }
    print_footer(page);
}

pub fn print_rankings(rows: &[RankingRow]) {
    if rows.is_empty() {
        println!("No sponsors match these filters.");
        return;
    }

    println!(
        "  {:<42} {:>6} {:>9} {:>8}",
        "SPONSOR", "DUE", "REPORTED", "PERCENT"
    );
    println!("  {}", "-".repeat(68));

    for r in rows {
        println!(
            "  {:<42} {:>6} {:>9} {:>8}",
            truncate(&r.sponsor_name, 40),
            r.due,
            r.reported,
            percentage_cell(r.percentage),
        );
    }
    println!();
}

pub fn print_trials(rows: &[TrialRow], hide_sponsor: bool) {
    if rows.is_empty() {
        println!("No trials match these filters.");
        return;
    }

    if hide_sponsor {
        println!(
            "  {:<28} {:<12} {:<40} {:<11} {:>5}",
            "STATUS", "REGISTRY ID", "TITLE", "COMPLETED", "LATE"
        );
    } else {
        println!(
            "  {:<28} {:<24} {:<12} {:<40} {:<11} {:>5}",
            "STATUS", "SPONSOR", "REGISTRY ID", "TITLE", "COMPLETED", "LATE"
        );
    }
    println!("  {}", "-".repeat(if hide_sponsor { 101 } else { 126 }));

    for r in rows {
        let completed = r.completion_date.as_deref().unwrap_or("");
        let late = r.days_late.map(|d| d.to_string()).unwrap_or_default();
        if hide_sponsor {
            println!(
                "  {:<28} {:<12} {:<40} {:<11} {:>5}",
                status_label(&r.status),
                r.registry_id,
                truncate(&trial_title(r), 40),
                completed,
                late,
            );
        } else {
            println!(
                "  {:<28} {:<24} {:<12} {:<40} {:<11} {:>5}",
                status_label(&r.status),
                truncate(&r.sponsor_name, 24),
                r.registry_id,
                truncate(&trial_title(r), 40),
                completed,
                late,
            );
        }
    }
    println!();
}

/// Paging info is only shown when the results span several pages.
pub fn print_footer(page: &Page) {
    let table = page.table();
    let chrome = table.chrome();
    if chrome.info {
        println!(
            "Page {} of {} ({} record{})",
            table.current_page().saturating_add(1),
            table.page_count(),
            table.records(),
            if table.records() == 1 { "" } else { "s" }
        );
    }
    if chrome.search_box {
        if let Some(ref q) = page.state().search {
            println!("Search: {q}");
        }
    }
    println!("URL:      {}", page.location());
    println!("Download: {}", table.export_link());
}

pub fn print_request(base_url: &str, request: &TableRequest, export_link: &str) {
    println!("Request:  {base_url}{}?{}", request.path, request.query);
    println!("Download: {base_url}{export_link}");
}

/// Print the performance summary card.
pub fn print_summary(card: &SummaryCard) {
    println!("Performance:");
    println!("  Reported: {} of {} due", card.reported, card.due);
    if let Some(ref pct) = card.percent {
        println!("  Percent:  {pct}");
    }
    if let Some(ref fines) = card.fines {
        println!("  Fines:    {fines}");
    }
    if let Some(layout) = card.layout {
        println!(
            "  Layout:   {}px headlines, {}px headers at {}px viewport",
            layout.font_px, layout.header_px, layout.viewport_px
        );
    }
}
