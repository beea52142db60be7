pub mod config;
pub mod lock;
pub mod pattern;
pub mod version;
