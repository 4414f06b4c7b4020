//! Export snapshots of selected tickets.

use chrono::{DateTime, Local};

use super::keys::TicketKey;

/// One exported ticket and whether it was locked at export time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLine {
    /// The exported key.
    pub key: TicketKey,
    /// Whether the ticket was locked when exported.
    pub locked: bool,
}

impl ExportLine {
    /// The line as written to the export file (`*` prefix when locked).
    pub fn render(&self) -> String {
        if self.locked {
            format!("*{}", self.key)
        } else {
            self.key.to_string()
        }
    }
}

/// Immutable snapshot of an export selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    lines: Vec<ExportLine>,
    filename: String,
}

impl ExportRecord {
    /// Build a record from lines already in display order.
    pub fn new(lines: Vec<ExportLine>, created_at: DateTime<Local>) -> Self {
        let filename = export_filename(created_at, lines.len());
        Self { lines, filename }
    }

    /// Exported lines in display order.
    pub fn lines(&self) -> &[ExportLine] {
        &self.lines
    }

    /// Number of exported tickets.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Generated file name, e.g. `export_03-01-2024_101500_2.txt`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// File contents: one key per line.
    pub fn contents(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }
}

fn export_filename(at: DateTime<Local>, count: usize) -> String {
    format!("export_{}_{}.txt", at.format("%m-%d-%Y_%H%M%S"), count)
}
