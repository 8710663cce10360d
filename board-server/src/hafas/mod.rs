//! HAFAS REST client.
//!
//! This module provides an HTTP client for the `transport.rest` family of
//! HAFAS endpoints, which serve real-time public-transit departure data.
//!
//! Key characteristics of these endpoints:
//! - Timestamps are RFC 3339 strings with a zone offset; the realtime
//!   estimate (`when`) and the schedule (`plannedWhen`) may each be null
//! - Depending on endpoint version, `/stops/{id}/departures` returns either
//!   a bare JSON array of departures or an object with a `departures` field;
//!   [`DeparturesResponse`] normalizes both shapes at the boundary
//! - Records carry provider-specific fields beyond the documented ones;
//!   the DTOs keep them intact rather than discarding them

mod client;
mod error;
mod profile;
mod types;

pub use client::{DepartureQuery, HafasClient, HafasConfig};
pub use error::HafasError;
pub use profile::Profile;
pub use types::{Departure, DeparturesResponse, Line, Stop};
