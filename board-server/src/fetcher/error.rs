//! Fetch cycle error types.

use crate::hafas::HafasError;

/// Error from a departure fetch cycle.
///
/// Individual direction failures are recovered within the cycle; this error
/// is only produced when every upstream query failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Every per-direction query failed; carries the last underlying cause.
    #[error("all {attempted} departure queries for stop {station} failed")]
    AllQueriesFailed {
        station: String,
        attempted: usize,
        #[source]
        source: HafasError,
    },
}
