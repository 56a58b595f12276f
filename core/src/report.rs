//! Human-readable run reports.

use serde::{Deserialize, Serialize};

use crate::summary::RunSummary;

/// Delete count of one repository, for machine export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCount {
    pub repository: String,
    pub delete_count: usize,
}

/// Renders a [`RunSummary`] for notification and export.
pub struct ReportFormatter {
    max_message_length: usize,
}

impl ReportFormatter {
    /// `max_message_length` is measured in characters and must be non-zero.
    pub fn new(max_message_length: usize) -> Self {
        Self {
            max_message_length: max_message_length.max(1),
        }
    }

    /// Account total followed by one line per repository.
    ///
    /// ```text
    /// *Total*: 5
    ///  - api: 2
    ///  - web: 3
    /// ```
    pub fn message(&self, summary: &RunSummary) -> String {
        let mut message = format!("*Total*: {}\n", summary.total_delete_count());
        for (repository, deletion) in summary.iter() {
            message.push_str(&format!(" - {}: {}\n", repository, deletion.total_delete));
        }
        message
    }

    /// The report message cut to the configured maximum length.
    pub fn message_parts(&self, summary: &RunSummary) -> Vec<String> {
        split_message(&self.message(summary), self.max_message_length)
    }

    /// Delete counts only, in repository name order.
    pub fn counts(&self, summary: &RunSummary) -> Vec<RepositoryCount> {
        summary
            .iter()
            .map(|(repository, deletion)| RepositoryCount {
                repository: repository.clone(),
                delete_count: deletion.total_delete,
            })
            .collect()
    }
}

/// Cut `message` into contiguous parts of at most `max_len` characters.
///
/// The cut ignores line boundaries. A message that already fits, including an
/// empty one, comes back as a single part.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if message.chars().count() <= max_len {
        return vec![message.to_string()];
    }

    let chars: Vec<char> = message.chars().collect();
    chars
        .chunks(max_len)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
