//! Proxy module for verifying and selecting harvested proxies
//!
//! This module provides functionality for:
//! - Deduplicating candidates harvested from many sources
//! - Probing each unique candidate once through an address oracle
//! - Classifying liveness and anonymity
//! - Filtering and capping the verified set

pub mod aggregator;
pub mod checker;
pub mod error;
pub mod models;
pub mod oracle;
pub mod parser;
pub mod selector;

pub use aggregator::{aggregate, Aggregator};
pub use checker::{classify, CheckerConfig, ProxyChecker};
pub use error::{ProbeError, VerifyError};
pub use models::{Anonymity, Candidate, CandidateKey, ProxyType, Verdict, VerifiedProxy};
pub use oracle::{AddressOracle, IdentOracle};
pub use parser::ProxyParser;
pub use selector::{prefilter, select, FilterCriteria};
