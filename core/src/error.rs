use thiserror::Error;

/// regsweep error types
#[derive(Error, Debug)]
pub enum SweepError {
    /// Inventory or orchestrator call failed
    #[error("Collection failed: {source_name} - {message}")]
    Collection {
        source_name: String,
        message: String,
    },

    /// Image record is missing its identity field
    #[error("Malformed image record: {0}")]
    MalformedRecord(String),

    /// A deletion batch was rejected by the registry
    #[error("Deletion failed: {repository} - {message}")]
    Deletion { repository: String, message: String },

    /// Notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SweepError {
    /// Shorthand for a collection failure against a named source.
    pub fn collection(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        SweepError::Collection {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SweepError {
    fn from(err: serde_yaml::Error) -> Self {
        SweepError::Serialization(err.to_string())
    }
}

/// Result type alias for regsweep operations
pub type Result<T> = std::result::Result<T, SweepError>;
