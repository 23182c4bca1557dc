//! Shared test utilities for the rulesets workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`lookup`]: [`FakeLookup`], an in-memory hosting platform
//! - [`repo`]: [`RulesetRepo`], a temporary repository with a `rulesets/` directory

pub mod lookup;
pub mod repo;

pub use lookup::FakeLookup;
pub use repo::RulesetRepo;
