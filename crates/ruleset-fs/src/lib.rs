//! Filesystem primitives for the ruleset availability sync
//!
//! Provides normalized paths, atomic writes guarded by an advisory lock,
//! sorted directory listing and format-agnostic config loading.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
