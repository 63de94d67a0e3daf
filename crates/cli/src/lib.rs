//! Plain-text rendering for the `hs-index` binary.

use hsindex_core::models::{
    BatchRow, CodeLookup, DescriptionLookup, ReindexReport, SourceSummary,
};
use std::io::Read;

/// Reads a batch file, or stdin when `path` is `-`.
pub fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

pub fn render_summary(summary: &SourceSummary) -> String {
    let mut out = format!("table {}: {} rows\n", summary.table, summary.row_count);
    for c in &summary.columns {
        out.push_str(&format!("  {} {}\n", c.name, c.data_type));
    }
    for r in &summary.samples {
        out.push_str(&format!("  - {}: {}\n", r.code, r.fullname));
    }
    out
}

pub fn render_report(report: &ReindexReport) -> String {
    let mut out = format!(
        "indexed {} of {} records ({} failed)\n",
        report.indexed_count,
        report.total,
        report.failures.len()
    );
    for f in &report.failures {
        out.push_str(&format!("  ! {}: {}\n", f.code, f.reason));
    }
    out
}

pub fn render_description(result: &DescriptionLookup) -> String {
    let Some(best) = &result.best_match else {
        let mut out = format!(
            "{}: {}\n",
            result.query,
            result.message.as_deref().unwrap_or("no match")
        );
        for s in &result.suggestions {
            out.push_str(&format!("  * {s}\n"));
        }
        return out;
    };
    let mut out = format!("{}: best match {} {}\n", result.query, best.code, best.description);
    for (i, m) in result.results.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} {} ({:.3})\n",
            i + 1,
            m.code,
            m.description,
            m.relevance
        ));
    }
    out
}

pub fn render_code(result: &CodeLookup) -> String {
    match &result.description {
        Some(d) if result.found => format!("{}: {}\n", result.code, d),
        _ => format!(
            "{}: {}\n",
            result.code,
            result.message.as_deref().unwrap_or("not found")
        ),
    }
}

/// Tab-separated table; failed rows put the error in the description column.
pub fn render_rows(rows: &[BatchRow]) -> String {
    let mut out = String::from("query\tstatus\tcode\tdescription\n");
    for row in rows {
        let description = row.description.as_deref().or(row.error.as_deref());
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            row.query,
            row.status,
            row.code.as_deref().unwrap_or_default(),
            description.unwrap_or_default()
        ));
    }
    out
}
