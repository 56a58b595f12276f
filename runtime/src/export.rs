//! Delete-candidate export.

use std::io::Write;
use std::path::Path;

use regsweep_core::error::Result;
use regsweep_core::summary::RunSummary;

/// Header row of the export file.
pub const EXPORT_HEADER: &str = "ImagesToDelete";

/// Write one `repository:digest` row per delete candidate, after a header row.
///
/// Returns the number of candidate rows written.
pub fn write_export(path: &Path, summary: &RunSummary) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(writer, "{}", EXPORT_HEADER)?;

    let mut rows = 0;
    for candidate in summary.candidates() {
        writeln!(writer, "{}", candidate)?;
        rows += 1;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows, "Wrote delete candidates");
    Ok(rows)
}
