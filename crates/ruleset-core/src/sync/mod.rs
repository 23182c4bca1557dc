//! Availability sync pass
//!
//! - **engine**: drives a pass over every ruleset
//! - **report**: what the pass removed, skipped and rewrote

mod engine;
mod report;

pub use engine::{SyncEngine, SyncOptions};
pub use report::{Removal, RulesetReport, RulesetStatus, Skip, SyncReport};
