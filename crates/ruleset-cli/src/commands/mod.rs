//! Command implementations for ruleset-cli

pub mod list;
pub mod sync;

pub use list::run_list;
pub use sync::{run_check, run_sync};
