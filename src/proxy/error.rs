//! Verification error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Failure of a single oracle query
///
/// For a probe through a candidate these are local and only ever turn the
/// candidate into [`Verdict::Dead`](crate::proxy::Verdict::Dead).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot build client for {proxy}: {reason}")]
    TransportConstruction { proxy: String, reason: String },

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("probe cancelled")]
    Cancelled,
}

impl ProbeError {
    pub fn unreachable(err: impl std::fmt::Display) -> Self {
        ProbeError::Unreachable(err.to_string())
    }
}

/// Run-level failure of a verification
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The direct baseline query failed, so no verdict can be judged
    #[error("address oracle unavailable: {0}")]
    OracleUnavailable(#[source] ProbeError),
}
