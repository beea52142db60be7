//! Installed version resolution from lock files
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────────┐
//! │ Packages │──▶│  LockResolver  │──▶│  LockFileFinder  │ (glob search per scope)
//! │ + Config │   │ (rule, scope)  │   └──────────────────┘
//! └──────────┘   │                │   ┌──────────────────┐
//!                │                │──▶│ PatternExtractor │ (lock file text)
//!                │                │   └──────────────────┘
//!                │                │   ┌──────────────────┐
//!                │                │──▶│  CommandRunner   │──▶ decode (command output)
//!                └───────┬────────┘   └──────────────────┘
//!                        ▼
//!              status passes (version missing, floating, ignored)
//! ```
//!
//! # Modules
//!
//! - [`resolver`]: `LockResolver::apply_installed_versions`
//! - [`extract`]: Regex extraction of name/version pairs from lock files
//! - [`decode`]: JSON and raw decoding of lock command output
//! - [`command`]: Shell execution with placeholders and timeouts
//! - [`finder`]: Glob-based lock file search
//! - [`status`]: Final status passes and the latest/floating recognizers
//! - [`types`]: `Package` and `InstallStatus`

pub mod command;
pub mod decode;
pub mod error;
pub mod extract;
pub mod finder;
pub mod resolver;
pub mod status;
pub mod types;

pub use command::{CommandError, CommandRequest, CommandRunner, ShellCommandRunner};
pub use decode::decode_command_output;
pub use error::LockError;
pub use extract::{LockEntry, PatternExtractor};
pub use finder::{GlobFileFinder, LockFileFinder};
pub use resolver::LockResolver;
pub use status::{
    ConstraintRecognizer, FloatingConstraintRecognizer, LatestRecognizer, MappedLatestRecognizer,
};
pub use types::{InstallStatus, Package};
