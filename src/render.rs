//! Plain-text rendering of command results.

use serde::Serialize;

use crate::console::types::RecordSummary;
use crate::repository::CacheSource;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Render records as an aligned table.
pub fn table<T: RecordSummary>(records: &[T]) -> String {
  const HEADERS: [&str; 4] = ["ID", "NAME", "UPDATED", "DETAIL"];

  let rows: Vec<[String; 4]> = records
    .iter()
    .map(|r| {
      [
        truncate(&r.summary_id(), 36),
        truncate(r.summary_name(), 40),
        r.summary_updated().unwrap_or("-").to_string(),
        truncate(&r.summary_detail(), 40),
      ]
    })
    .collect();

  let mut widths = HEADERS.map(str::len);
  for row in &rows {
    for (width, cell) in widths.iter_mut().zip(row) {
      *width = (*width).max(cell.chars().count());
    }
  }

  let mut out = String::new();
  push_row(&mut out, &HEADERS.map(String::from), &widths);
  for row in &rows {
    push_row(&mut out, row, &widths);
  }
  out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
  let line: Vec<String> = cells
    .iter()
    .zip(widths)
    .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
    .collect();
  out.push_str(line.join("  ").trim_end());
  out.push('\n');
}

/// Pretty JSON for `--json` output.
pub fn json<T: Serialize + ?Sized>(value: &T) -> String {
  serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unrenderable: {}>", e))
}

/// Footer noting where list data came from.
pub fn source_note(source: CacheSource, count: usize, noun: &str) -> String {
  format!("{} {} ({})", count, noun, source.label())
}
