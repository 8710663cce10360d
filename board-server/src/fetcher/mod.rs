//! Departure acquisition and refinement.
//!
//! This module implements the core of the service: given raw departure
//! records from the upstream endpoint, produce a bounded, deduplicated,
//! time-ordered, reachability-annotated list suitable for display.
//!
//! The processing chain (sort, dedup, filters, reachability, surplus trim)
//! is built from pure functions in [`pipeline`] so it can be exercised
//! without network access; [`DepartureFetcher`] composes the chain around
//! concurrent per-direction upstream queries and owns the one piece of
//! cross-cycle state, the adaptive lead time.

mod config;
mod error;
mod fetch;
pub mod pipeline;

pub use config::FetcherConfig;
pub use error::FetchError;
pub use fetch::{DepartureFetcher, DepartureProvider};
pub use pipeline::MarkedDeparture;
