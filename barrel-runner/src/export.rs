//! Report export: JSON, CSV and a plain-text table.
//!
//! Missing values are `null` in JSON and empty cells in CSV and the table.
//! They are never written as zero.

use std::path::Path;

use anyhow::{Context, Result};

use crate::row::ScreenRow;
use crate::screen::ScreenReport;

/// Output columns, in order.
pub const COLUMNS: [&str; 9] = [
    "ticker",
    "on_mkt",
    "minimo",
    "media",
    "massimo",
    "forecast_min",
    "forecast_value",
    "forecast_max",
    "delta_pct",
];

fn values(row: &ScreenRow) -> [Option<f64>; 8] {
    [
        row.on_mkt,
        row.minimo,
        row.media,
        row.massimo,
        row.forecast_min,
        row.forecast_value,
        row.forecast_max,
        row.delta_pct,
    ]
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(rows: &[ScreenRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("failed to serialize screen rows to JSON")
}

pub fn import_json(json: &str) -> Result<Vec<ScreenRow>> {
    serde_json::from_str(json).context("failed to deserialize screen rows from JSON")
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Full-precision CSV with a header row.
pub fn export_csv(rows: &[ScreenRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(COLUMNS)?;
    for row in rows {
        let mut record = Vec::with_capacity(COLUMNS.len());
        record.push(row.ticker.clone());
        record.extend(
            values(row)
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

pub fn write_csv(path: &Path, rows: &[ScreenRow]) -> Result<()> {
    let csv = export_csv(rows)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_json(path: &Path, rows: &[ScreenRow]) -> Result<()> {
    let json = export_json(rows)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Table ──────────────────────────────────────────────────────────

/// Right-aligned table, two decimals, blank cells for missing values.
pub fn format_table(rows: &[ScreenRow]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            std::iter::once(row.ticker.clone())
                .chain(
                    values(row)
                        .iter()
                        .map(|v| v.map(|x| format!("{x:.2}")).unwrap_or_default()),
                )
                .collect()
        })
        .collect();

    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |fields: &[String]| {
        fields
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (f, w))| {
                if i == 0 {
                    format!("{f:<w$}")
                } else {
                    format!("{f:>w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_uppercase()).collect();
    let mut out = String::new();
    out.push_str(&render(&header));
    out.push('\n');
    for row in &cells {
        out.push_str(&render(row));
        out.push('\n');
    }
    out
}

/// Summary line plus one line per degraded ticker.
pub fn format_summary(report: &ScreenReport) -> String {
    let mut out = format!(
        "{} ok, {} degraded ({} ms)\n",
        report.complete_count(),
        report.degraded_count(),
        report.elapsed.as_millis()
    );
    for outcome in &report.outcomes {
        if let Some((kind, reason)) = outcome.failure() {
            out.push_str(&format!("  {}: {kind}: {reason}\n", outcome.row().ticker));
        }
    }
    out
}
