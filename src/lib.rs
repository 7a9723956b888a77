//! Proxy Sieve - Proxy Harvester and Verifier
//!
//! Collects free proxies from several sources, checks which ones are alive
//! and how much they reveal about the caller, and returns a filtered set.

pub mod logging;
pub mod pipeline;
pub mod providers;
pub mod proxy;

pub use pipeline::{run, sieve, RunOutcome};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
