//! HAFAS API response DTOs.
//!
//! These types map directly to the JSON served by `transport.rest`
//! endpoints. They use `Option` liberally because the provider sends null
//! (or omits fields entirely) for anything it has no data for.
//!
//! Each DTO carries a flattened map of the fields it does not model, so a
//! departure record round-trips through the pipeline without losing
//! provider-specific data.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response from `GET /stops/{id}/departures`.
///
/// Older endpoint versions return a bare array of departures; newer ones
/// wrap the array in an object. Decoding through this enum means the rest
/// of the crate only ever sees one shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DeparturesResponse {
    /// Bare list (v5-style endpoints).
    List(Vec<Departure>),

    /// Object with a `departures` field (v6-style endpoints).
    Wrapped(WrappedDepartures),
}

/// The object-shaped departures response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedDepartures {
    pub departures: Vec<Departure>,

    /// Millisecond timestamp of the last realtime data update.
    pub realtime_data_updated_at: Option<i64>,
}

impl DeparturesResponse {
    /// Extract the departure list regardless of response shape.
    pub fn into_departures(self) -> Vec<Departure> {
        match self {
            DeparturesResponse::List(departures) => departures,
            DeparturesResponse::Wrapped(wrapped) => wrapped.departures,
        }
    }
}

/// One scheduled or realtime departure as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    /// Trip identifier. Stable within a response, but may be absent.
    pub trip_id: Option<String>,

    /// Realtime departure estimate.
    pub when: Option<DateTime<FixedOffset>>,

    /// Scheduled departure time.
    pub planned_when: Option<DateTime<FixedOffset>>,

    /// Delay in seconds, if the provider reports one.
    pub delay: Option<i64>,

    /// Realtime platform.
    pub platform: Option<String>,

    /// Scheduled platform.
    pub planned_platform: Option<String>,

    /// Destination / terminus name of this departure.
    pub direction: Option<String>,

    /// The line serving this departure.
    pub line: Option<Line>,

    /// The stop this departure leaves from.
    pub stop: Option<Stop>,

    /// Provider fields this crate does not model (remarks, occupancy, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Departure {
    /// Effective departure time: the realtime estimate if present, else the
    /// scheduled time.
    pub fn effective_when(&self) -> Option<DateTime<FixedOffset>> {
        self.when.or(self.planned_when)
    }

    /// Effective departure time in milliseconds since the epoch.
    ///
    /// Records with no usable time map to epoch zero, which makes them sort
    /// ahead of everything else.
    pub fn effective_timestamp(&self) -> i64 {
        self.effective_when()
            .map(|when| when.timestamp_millis())
            .unwrap_or(0)
    }

    /// Effective platform: the realtime platform if present, else the
    /// scheduled one.
    pub fn effective_platform(&self) -> Option<&str> {
        self.platform.as_deref().or(self.planned_platform.as_deref())
    }
}

/// Line descriptor on a departure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: Option<String>,

    /// Display name, e.g. "STR 11".
    pub name: Option<String>,

    /// Transport-type tag, e.g. "tram", "suburban".
    pub product: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stop descriptor on a departure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: Option<String>,

    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
