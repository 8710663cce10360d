//! Fetch cycle orchestration.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tracing::{error, warn};

use crate::hafas::{Departure, DepartureQuery, HafasError};

use super::config::FetcherConfig;
use super::error::FetchError;
use super::pipeline::{self, MarkedDeparture};

/// Lead time every fetcher starts with, in minutes.
const INITIAL_LEAD_TIME: i64 = 20;

/// Trait for the upstream departures source.
///
/// This abstraction allows the fetcher to be tested with mock data.
pub trait DepartureProvider {
    /// Query departures for a stop.
    fn departures(
        &self,
        stop_id: &str,
        query: &DepartureQuery,
    ) -> impl Future<Output = Result<Vec<Departure>, HafasError>> + Send;

    /// Product identifiers the backing profile supports.
    fn products(&self) -> Vec<String>;
}

impl DepartureProvider for crate::hafas::HafasClient {
    async fn departures(
        &self,
        stop_id: &str,
        query: &DepartureQuery,
    ) -> Result<Vec<Departure>, HafasError> {
        self.get_departures(stop_id, query).await
    }

    fn products(&self) -> Vec<String> {
        self.profile()
            .products()
            .iter()
            .map(|product| product.to_string())
            .collect()
    }
}

/// Fetches and refines departures for one station.
///
/// One fetch cycle per [`fetch_departures`](Self::fetch_departures) call;
/// cycles are triggered by the caller's timer and must not overlap on the
/// same instance (run them from a single task, awaiting each cycle before
/// starting the next).
pub struct DepartureFetcher<P> {
    config: FetcherConfig,
    provider: P,

    /// Product set actually shown: the profile catalog minus the configured
    /// exclusions. Derived by [`init`](Self::init).
    included_products: Vec<String>,

    /// How many minutes before the reachable-time boundary to query, so
    /// imminent-but-unreachable departures show up too. Adapted every
    /// cycle from how many unreachable records the last query produced.
    lead_time: i64,
}

impl<P: DepartureProvider> DepartureFetcher<P> {
    /// Create a fetcher. Call [`init`](Self::init) once before the first
    /// fetch cycle.
    pub fn new(provider: P, config: FetcherConfig) -> Self {
        Self {
            config,
            provider,
            included_products: Vec::new(),
            lead_time: INITIAL_LEAD_TIME,
        }
    }

    /// Derive the included transport-type set from the provider's product
    /// catalog minus the configured exclusions.
    pub fn init(&mut self) {
        let excluded = &self.config.excluded_transportation_types;
        self.included_products = self
            .provider
            .products()
            .into_iter()
            .filter(|product| !excluded.contains(product))
            .collect();
    }

    /// The station this fetcher queries.
    pub fn station_id(&self) -> &str {
        &self.config.station_id
    }

    /// Current adaptive lead time in minutes.
    pub fn lead_time(&self) -> i64 {
        self.lead_time
    }

    /// Execute one fetch cycle.
    ///
    /// Issues one upstream query per configured direction (or a single
    /// unfiltered query), tolerating individual failures, and runs the
    /// refinement chain over whatever succeeded. Fails only when every
    /// query failed.
    pub async fn fetch_departures(&mut self) -> Result<Vec<MarkedDeparture>, FetchError> {
        let now = Utc::now();
        let reachable_time = now + Duration::minutes(self.config.time_to_station);
        let departure_time = self.departure_time(reachable_time);
        let duration = self.query_duration();

        let directions: Vec<Option<String>> = if self.config.directions.is_empty() {
            vec![None]
        } else {
            self.config.directions.iter().cloned().map(Some).collect()
        };

        let station = self.config.station_id.clone();
        let provider = &self.provider;
        let queries = directions.iter().map(|direction| {
            let query = DepartureQuery {
                duration,
                when: departure_time,
                direction: direction.clone(),
            };
            let station = station.clone();
            async move { provider.departures(&station, &query).await }
        });
        let results = join_all(queries).await;

        let (departures, failures) = process_results(results, &directions, &station);

        let failed = failures.len();
        let total = directions.len();
        if failed == total {
            if let Some((_, source)) = failures.into_iter().next_back() {
                return Err(FetchError::AllQueriesFailed {
                    station,
                    attempted: total,
                    source,
                });
            }
        }
        if failed > 0 {
            warn!(
                "{failed} of {total} direction queries for stop {station} failed, \
                 continuing with partial results"
            );
        }

        Ok(self.process_departures(departures, reachable_time))
    }

    /// Run the full refinement chain over raw records.
    ///
    /// This is the network-free part of a fetch cycle: sort, dedup, the
    /// filter chain, reachability annotation, lead-time adaptation,
    /// surplus trimming, and the final display cap.
    pub fn process_departures(
        &mut self,
        departures: Vec<Departure>,
        reachable_time: DateTime<Utc>,
    ) -> Vec<MarkedDeparture> {
        let sorted = pipeline::sort_departures(&departures);
        let unique = pipeline::remove_duplicates(&sorted);

        let filtered =
            pipeline::filter_by_transportation_types(unique, &self.included_products);
        let filtered =
            pipeline::filter_by_ignored_lines(filtered, &self.config.ignored_lines);
        let filtered = if self.config.ignore_related_stations {
            pipeline::filter_by_stop_id(filtered, &self.config.station_id)
        } else {
            filtered
        };
        let filtered =
            pipeline::filter_by_excluded_directions(filtered, &self.config.exclude_directions);
        let filtered =
            pipeline::filter_by_platforms(filtered, &self.config.platforms_to_show);

        let marked = pipeline::mark_reachability(filtered, reachable_time);

        let unreachable = marked.iter().filter(|dep| !dep.is_reachable).count();
        self.lead_time = pipeline::adjust_lead_time(
            self.lead_time,
            unreachable,
            self.config.max_unreachable_departures,
        );

        let mut board = pipeline::trim_surplus_unreachable(
            marked,
            self.config.max_unreachable_departures,
        );
        board.truncate(
            self.config.max_reachable_departures + self.config.max_unreachable_departures,
        );
        board
    }

    /// Start of the query window.
    ///
    /// When unreachable departures are wanted, the window opens `lead_time`
    /// minutes before the reachable-time boundary.
    fn departure_time(&self, reachable_time: DateTime<Utc>) -> DateTime<Utc> {
        if self.config.max_unreachable_departures > 0 {
            reachable_time - Duration::minutes(self.lead_time)
        } else {
            reachable_time
        }
    }

    /// Length of the query window in minutes.
    ///
    /// Extended by `lead_time` when the window start moved earlier, so the
    /// far edge stays where the configuration put it.
    fn query_duration(&self) -> i64 {
        if self.config.max_unreachable_departures > 0 {
            self.config.time_in_future + self.lead_time
        } else {
            self.config.time_in_future
        }
    }
}

/// Partition per-direction results into merged departures and failures.
///
/// Empty successful responses are a soft condition worth a log line, not an
/// error; failures are logged and collected with their direction.
fn process_results(
    results: Vec<Result<Vec<Departure>, HafasError>>,
    directions: &[Option<String>],
    station: &str,
) -> (Vec<Departure>, Vec<(Option<String>, HafasError)>) {
    let mut departures = Vec::new();
    let mut failures = Vec::new();

    for (result, direction) in results.into_iter().zip(directions) {
        let direction_label = direction.as_deref().unwrap_or("all");
        match result {
            Ok(batch) if batch.is_empty() => {
                warn!("no departures found for stop {station}, direction {direction_label}");
            }
            Ok(batch) => departures.extend(batch),
            Err(err) => {
                error!(
                    "failed to fetch departures for stop {station}, \
                     direction {direction_label}: {err}"
                );
                failures.push((direction.clone(), err));
            }
        }
    }

    (departures, failures)
}
