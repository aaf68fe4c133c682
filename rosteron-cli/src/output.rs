//! Output formatting for roster snapshots

use chrono::{DateTime, Local, Utc};
use rosteron::{Item, Snapshot};

/// Output formatter for roster snapshots
pub struct OutputFormatter {
    quiet: bool,
    limit: Option<usize>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(quiet: bool, limit: Option<usize>) -> Self {
        Self { quiet, limit }
    }

    /// Format and print a snapshot
    pub fn print_snapshot(&self, snapshot: &Snapshot) {
        print!("{}", self.render(snapshot));
    }

    /// Render a snapshot as it is printed
    fn render(&self, snapshot: &Snapshot) -> String {
        let shown = self.limit.map_or(snapshot.len(), |n| n.min(snapshot.len()));
        let mut out = String::new();

        if !self.quiet {
            out.push_str(&format!(
                "Roster retrieved {}",
                format_time(snapshot.time())
            ));
            if let Some(server_time) = snapshot.server_time() {
                out.push_str(&format!(" (server time {})", format_time(server_time)));
            }
            out.push('\n');
        }

        for item in &snapshot[..shown] {
            if self.quiet {
                out.push_str(&format!("{}\n", item));
            } else {
                out.push_str(&format_item(item));
            }
        }

        if !self.quiet {
            if snapshot.is_empty() {
                out.push_str("No roster items.\n");
            } else if shown < snapshot.len() {
                out.push_str(&format!("... {} more item(s)\n", snapshot.len() - shown));
            }
        }
        out
    }
}

/// Format a UTC timestamp in local time for display
fn format_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format one item as a heading line plus an indented detail line
fn format_item(item: &Item) -> String {
    let detail: Vec<&str> = item
        .detail()
        .iter()
        .map(|field| field.as_deref().unwrap_or("-"))
        .collect();
    format!(
        "{}  {}\n    {}\n",
        item.date().format("%a %d/%m/%Y"),
        item.title(),
        detail.join(" | ")
    )
}
