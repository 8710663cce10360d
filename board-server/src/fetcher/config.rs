//! Per-station fetcher configuration.

use serde::Deserialize;

/// Configuration for one station's departure fetcher.
///
/// The included transport-type set is *not* part of this struct: it is
/// derived at init time from the endpoint profile's product catalog minus
/// `excluded_transportation_types`, and held by the fetcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetcherConfig {
    /// Station to query departures for.
    pub station_id: String,

    /// Target direction station ids. One upstream query is issued per
    /// entry; empty means a single unfiltered query.
    #[serde(default)]
    pub directions: Vec<String>,

    /// Line display names to drop. Matching is exact: case and whitespace
    /// must agree with the provider's spelling.
    #[serde(default)]
    pub ignored_lines: Vec<String>,

    /// Transport types to subtract from the profile's product catalog.
    #[serde(default)]
    pub excluded_transportation_types: Vec<String>,

    /// Keep only departures from the exact queried station. Some stations
    /// have related stations whose departures the provider merges in; not
    /// every endpoint honors the option to turn that off server-side, so
    /// it is filtered here.
    #[serde(default)]
    pub ignore_related_stations: bool,

    /// Destination names to drop from the board.
    #[serde(default)]
    pub exclude_directions: Vec<String>,

    /// If non-empty, keep only departures from these platforms.
    #[serde(default)]
    pub platforms_to_show: Vec<String>,

    /// Walking time to the station, in minutes.
    #[serde(default = "default_time_to_station")]
    pub time_to_station: i64,

    /// How far into the future departures are shown, in minutes.
    #[serde(default = "default_time_in_future")]
    pub time_in_future: i64,

    /// How many reachable departures to retain.
    #[serde(default = "default_max_reachable")]
    pub max_reachable_departures: usize,

    /// How many unreachable departures to retain.
    #[serde(default)]
    pub max_unreachable_departures: usize,
}

fn default_time_to_station() -> i64 {
    10
}

fn default_time_in_future() -> i64 {
    40
}

fn default_max_reachable() -> usize {
    7
}

impl FetcherConfig {
    /// Create a configuration for a station with default settings.
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            directions: Vec::new(),
            ignored_lines: Vec::new(),
            excluded_transportation_types: Vec::new(),
            ignore_related_stations: false,
            exclude_directions: Vec::new(),
            platforms_to_show: Vec::new(),
            time_to_station: default_time_to_station(),
            time_in_future: default_time_in_future(),
            max_reachable_departures: default_max_reachable(),
            max_unreachable_departures: 0,
        }
    }

    /// Clamp values into acceptable, internally consistent ranges.
    ///
    /// Runs before the fetcher is constructed; the pipeline itself does not
    /// re-validate configuration.
    pub fn sanitize(&mut self) {
        if self.time_to_station < 0 {
            self.time_to_station = 0;
        }

        // The far edge of the window must clear the walk to the station
        // plus half an hour, or the board can end up permanently empty.
        if self.time_in_future < self.time_to_station + 30 {
            self.time_in_future = self.time_to_station + 30;
        }
    }
}
