use std::path::PathBuf;

use thiserror::Error;

use crate::lock::command::CommandError;
use crate::pattern::PatternError;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock file extraction config missing for {}", path.display())]
    MissingConfig { path: PathBuf },

    #[error("Lock file extraction pattern missing for {}", path.display())]
    MissingPattern { path: PathBuf },

    #[error("Raw format requires command_extraction.pattern")]
    MissingRawPattern,

    #[error("Unknown install status: {0}")]
    UnknownStatus(String),

    #[error("Unsupported lock command output format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse lock command JSON output: unrecognized format")]
    UnrecognizedOutput,

    #[error("Invalid extraction pattern {name}: {source}")]
    Pattern {
        name: String,
        #[source]
        source: PatternError,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid lock file glob {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to walk {}: {source}", dir.display())]
    Walk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Lock file search in {} did not complete: {source}", dir.display())]
    Task {
        dir: PathBuf,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Lock file command failed: {0}")]
    Command(#[from] CommandError),

    #[error("Failed to parse lock file {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: Box<LockError>,
    },

    #[error("Failed to find lock files in {}: {source}", dir.display())]
    Find {
        dir: PathBuf,
        #[source]
        source: Box<LockError>,
    },

    #[error("Failed to extract versions from {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: Box<LockError>,
    },

    #[error("Failed to resolve lock files for {rule}: {source}")]
    Resolve {
        rule: String,
        #[source]
        source: Box<LockError>,
    },
}
