//! Core of the ruleset availability sync
//!
//! Ruleset files list rule repositories, one per line, for grouped linking.
//! A rule repository stays listed only while it exists and carries the
//! required tag. This crate implements the pass that enforces that:
//!
//! - **Ruleset model**: position-preserving line classification
//! - **RulesetStore**: lazy loading and atomic rewrites of ruleset files
//! - **AvailabilityChecker**: the eligibility rule on top of a
//!   [`RepositoryLookup`], with a per-pass [`LookupCache`]
//! - **SyncEngine**: concurrent checks, conservative removal, reporting
//!
//! # Architecture
//!
//! ```text
//!              ruleset-cli
//!                   |
//!      +------------+------------+
//!      |                         |
//! ruleset-core             ruleset-github
//!      |             (implements RepositoryLookup)
//! ruleset-fs
//! ```

pub mod availability;
pub mod cache;
pub mod config;
pub mod error;
pub mod lookup;
pub mod ruleset;
pub mod store;
pub mod sync;

pub use availability::{AvailabilityChecker, DEFAULT_REQUIRED_TAG, IneligibleReason, Verdict};
pub use cache::{LookupCache, RepoState};
pub use config::{LookupSettings, SyncConfig};
pub use error::{Error, Result};
pub use lookup::{LookupUnavailable, RepositoryLookup};
pub use ruleset::{Line, RuleReference, Ruleset};
pub use store::{RulesetIter, RulesetStore};
pub use sync::{
    Removal, RulesetReport, RulesetStatus, Skip, SyncEngine, SyncOptions, SyncReport,
};
