//! Version parsing, ordering and newer-version filtering
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌────────────────────┐     ┌─────────────┐
//! │ VersioningCfg │────▶│ VersioningStrategy │────▶│   Filter    │
//! │ (format,sort) │     │ (parse, compare)   │     │ (newer,     │
//! └───────────────┘     └─────────┬──────────┘     │  summary)   │
//!                                 │                └─────────────┘
//!                                 ▼
//!                          ┌─────────────┐
//!                          │ Strategies  │
//!                          │(semver, ...)│
//!                          └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`strategy`]: Strategy trait, format selection and the shared compare/filter logic
//! - [`strategies`]: Semver, numeric, regex and ordered implementations
//! - [`parsed`]: `ParsedVersion` and number extraction
//! - [`filter`]: `filter_newer_versions` and `summarize_available_versions`
//! - [`semver`]: Canonical semantic-version parsing
//! - [`error`]: Error type for strategy construction

pub mod error;
pub mod filter;
pub mod parsed;
pub mod semver;
pub mod strategies;
pub mod strategy;

pub use error::VersionError;
pub use filter::{VersionSummary, filter_newer_versions, summarize_available_versions};
pub use parsed::{ParsedVersion, VersionParts};
pub use strategy::{SortOrder, VersionFormat, VersioningStrategy, new_versioning_strategy};
