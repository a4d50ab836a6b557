//! Error types for the backup archive

use thiserror::Error;

/// Result type alias using the backup archive's error type
pub type Result<T> = std::result::Result<T, BackupError>;

/// Failures surfaced by archive operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Name fails the pattern or is a reserved word
    #[error("Invalid backup name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A backup with this name already exists
    #[error("Backup '{name}' already exists")]
    DuplicateName { name: String },

    /// No backup with this name
    #[error("Backup '{name}' not found")]
    NotFound { name: String },

    /// Snapshot file undecodable or its payload fails checksum verification
    #[error("Backup '{name}' is corrupted: {reason}")]
    Corrupted { name: String, reason: String },

    /// Archive index document could not be decoded
    #[error("Backup index {path} is corrupted: {reason}")]
    CorruptedIndex { path: String, reason: String },

    /// Source data is not a sequence of flow elements
    #[error("Invalid flow payload: {0}")]
    InvalidPayload(String),

    /// Directory or file access failure
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The flow source collaborator failed
    #[error("Flow source unavailable: {0}")]
    Source(String),

    /// Rejected archive configuration
    #[error("Invalid backup configuration: {0}")]
    InvalidConfig(String),

    /// JSON encoding failure
    #[error("Failed to serialize {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BackupError {
    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate name error
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a not found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a corrupted snapshot error
    pub fn corrupted(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<str>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_string(),
            source,
        }
    }

    /// Wrap a JSON encoding error
    pub fn serialization(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            what: what.into(),
            source,
        }
    }

    /// Stable error code reported to tool callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => "InvalidName",
            Self::DuplicateName { .. } => "DuplicateName",
            Self::NotFound { .. } => "NotFound",
            Self::Corrupted { .. } | Self::CorruptedIndex { .. } => "Corrupted",
            Self::InvalidPayload(_) => "InvalidPayload",
            Self::Io { .. } | Self::Source(_) => "IOFailure",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Serialization { .. } => "Serialization",
        }
    }
}
