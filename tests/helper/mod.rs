//! Shared fixtures for integration tests

mod workspace;

pub use workspace::{Workspace, npm_config, package};
