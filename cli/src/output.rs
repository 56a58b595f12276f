//! Table formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};
use regsweep_core::report::RepositoryCount;

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// One row per repository with delete candidates.
pub fn counts_table(counts: &[RepositoryCount]) -> Table {
    let mut table = new_table(&["REPOSITORY", "DELETE"]);
    for count in counts {
        table.add_row(vec![count.repository.clone(), count.delete_count.to_string()]);
    }
    table
}

/// Format a day count as a retention window, e.g. "7 days".
pub fn format_days(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}
