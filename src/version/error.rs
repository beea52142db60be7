use thiserror::Error;

use crate::pattern::PatternError;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Unknown version format: {0}")]
    UnknownFormat(String),

    #[error("Unknown sort order: {0}")]
    UnknownSortOrder(String),

    #[error("Invalid version regex: {0}")]
    InvalidRegex(#[from] PatternError),
}
