//! Run summaries.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use pathisync_sync::{Outcome, ReconcileReport};

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "entity")]
    key: String,
    #[tabled(rename = "result")]
    result: String,
}

fn rows(reports: &[ReconcileReport]) -> Vec<ChangeRow> {
    reports
        .iter()
        .flat_map(|report| {
            report.changes().map(move |entity| ChangeRow {
                kind: report.kind.topic_dir().to_string(),
                key: entity.key.clone(),
                result: entity.outcome.to_string(),
            })
        })
        .collect()
}

/// Print applied and failed outcomes; returns how many writes failed.
pub fn print_reports(reports: &[ReconcileReport]) -> usize {
    let rows = rows(reports);
    let unchanged: usize = reports
        .iter()
        .map(|r| {
            r.entities
                .iter()
                .filter(|e| e.outcome == Outcome::Unchanged)
                .count()
        })
        .sum();
    let failures: usize = reports.iter().map(ReconcileReport::failures).sum();

    if rows.is_empty() {
        println!("✓ nothing to do ({unchanged} unchanged)");
        return 0;
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let summary = format!(
        "{} changed, {unchanged} unchanged, {failures} failed",
        reports.iter().map(|r| r.changes().count()).sum::<usize>()
    );
    if failures > 0 {
        println!("{}", summary.red());
    } else {
        println!("{}", summary.green());
    }
    failures
}
