//! GitHub implementation of [`RepositoryLookup`](ruleset_core::RepositoryLookup)
//!
//! [`GitHubClient`] answers "does this repository exist" and "which tags
//! does it carry" for one organization over the REST API. Transient
//! failures (timeouts, 5xx, rate limits) are retried with exponential
//! backoff up to a bounded number of attempts; once exhausted they surface
//! as [`LookupUnavailable`](ruleset_core::LookupUnavailable) so the sync
//! engine keeps the reference.

pub mod client;
pub mod error;
pub mod link;
pub mod retry;

pub use client::{GitHubClient, MAX_TAG_PAGES, USER_AGENT};
pub use error::{Error, Result};
pub use link::next_link;
pub use retry::RetryPolicy;
