//! The departure refinement chain.
//!
//! Every stage is a pure function from records to records: merging,
//! sorting, deduplication, the filter chain, reachability annotation, the
//! adaptive lead-time step, and surplus trimming. The fetcher composes
//! these around its upstream queries; tests exercise them directly with no
//! network involved.
//!
//! Sorting and deduplication take their input by reference and never mutate
//! it. Filter stages consume and return owned vectors, each stage feeding
//! the next.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::hafas::Departure;

/// A departure annotated with whether it can still be reached on foot.
///
/// Serializes as the departure's own fields plus `isReachable`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedDeparture {
    #[serde(flatten)]
    pub departure: Departure,

    pub is_reachable: bool,
}

/// Sort departures ascending by effective time (realtime if present, else
/// scheduled; records with neither sort first).
///
/// Returns a sorted copy; the input is left untouched.
pub fn sort_departures(departures: &[Departure]) -> Vec<Departure> {
    let mut sorted = departures.to_vec();
    sorted.sort_by_key(Departure::effective_timestamp);
    sorted
}

/// Drop duplicate departures, keeping the first occurrence.
///
/// Two records are duplicates when they agree on identity (trip id, else
/// line id, else "unknown"), effective time, and stop id (empty if absent).
/// Returns a filtered copy; the input is left untouched.
pub fn remove_duplicates(departures: &[Departure]) -> Vec<Departure> {
    let mut seen = HashSet::new();
    departures
        .iter()
        .filter(|dep| seen.insert(dedup_key(dep)))
        .cloned()
        .collect()
}

fn dedup_key(departure: &Departure) -> (String, i64, String) {
    let identity = departure
        .trip_id
        .clone()
        .or_else(|| departure.line.as_ref().and_then(|line| line.id.clone()))
        .unwrap_or_else(|| "unknown".to_string());

    let stop_id = departure
        .stop
        .as_ref()
        .and_then(|stop| stop.id.clone())
        .unwrap_or_default();

    (identity, departure.effective_timestamp(), stop_id)
}

/// Keep only departures whose line product is in the included set.
pub fn filter_by_transportation_types(
    departures: Vec<Departure>,
    included: &[String],
) -> Vec<Departure> {
    departures
        .into_iter()
        .filter(|dep| {
            dep.line
                .as_ref()
                .and_then(|line| line.product.as_deref())
                .is_some_and(|product| included.iter().any(|inc| inc == product))
        })
        .collect()
}

/// Drop departures whose line name matches an ignored name exactly
/// (case- and whitespace-sensitive).
pub fn filter_by_ignored_lines(
    departures: Vec<Departure>,
    ignored: &[String],
) -> Vec<Departure> {
    departures
        .into_iter()
        .filter(|dep| {
            let name = dep.line.as_ref().and_then(|line| line.name.as_deref());
            !name.is_some_and(|name| ignored.iter().any(|ign| ign == name))
        })
        .collect()
}

/// Keep only departures leaving from the exact queried station.
///
/// Filters out departures the provider merged in from related stations.
pub fn filter_by_stop_id(departures: Vec<Departure>, station_id: &str) -> Vec<Departure> {
    departures
        .into_iter()
        .filter(|dep| {
            dep.stop
                .as_ref()
                .and_then(|stop| stop.id.as_deref())
                .is_some_and(|id| id == station_id)
        })
        .collect()
}

/// Drop departures heading to an excluded destination. No-op when the
/// exclude list is empty.
pub fn filter_by_excluded_directions(
    departures: Vec<Departure>,
    excluded: &[String],
) -> Vec<Departure> {
    if excluded.is_empty() {
        return departures;
    }

    departures
        .into_iter()
        .filter(|dep| {
            !dep.direction
                .as_deref()
                .is_some_and(|dir| excluded.iter().any(|exc| exc == dir))
        })
        .collect()
}

/// Keep only departures from an allow-listed platform (realtime platform,
/// else planned). No-op when the allow-list is empty; departures with no
/// platform at all are dropped when it is not.
pub fn filter_by_platforms(
    departures: Vec<Departure>,
    platforms: &[String],
) -> Vec<Departure> {
    if platforms.is_empty() {
        return departures;
    }

    departures
        .into_iter()
        .filter(|dep| {
            dep.effective_platform()
                .is_some_and(|p| !p.is_empty() && platforms.iter().any(|want| want == p))
        })
        .collect()
}

/// Annotate each departure with its reachability.
///
/// A departure is reachable iff its effective time is at or after
/// `reachable_time` (the earliest instant the traveler can be at the
/// station). Records with no usable time at all are kept but marked
/// unreachable; losing them silently would hide a provider data defect.
pub fn mark_reachability(
    departures: Vec<Departure>,
    reachable_time: DateTime<Utc>,
) -> Vec<MarkedDeparture> {
    departures
        .into_iter()
        .map(|departure| {
            let is_reachable = is_reachable(&departure, reachable_time);
            MarkedDeparture {
                departure,
                is_reachable,
            }
        })
        .collect()
}

fn is_reachable(departure: &Departure, reachable_time: DateTime<Utc>) -> bool {
    match departure.effective_when() {
        Some(when) => when.with_timezone(&Utc) >= reachable_time,
        None => {
            warn!("departure has neither realtime nor planned time, treating as unreachable");
            false
        }
    }
}

/// Adapt the lead time from the unreachable count observed this cycle.
///
/// Too many unreachable departures means the look-back window was too wide:
/// halve it (rounded) plus one. Otherwise widen by 5 minutes per cycle
/// until the lead time passes 45.
pub fn adjust_lead_time(lead_time: i64, unreachable: usize, max_unreachable: usize) -> i64 {
    if unreachable > max_unreachable {
        // round(lead_time / 2) + 1, in integer arithmetic
        (lead_time + 1) / 2 + 1
    } else if lead_time <= 45 {
        lead_time + 5
    } else {
        lead_time
    }
}

/// Drop surplus unreachable departures and put the unreachable ones first.
///
/// The input is already sorted ascending by time; surplus entries are
/// removed from the *front* of the unreachable subset, so the latest
/// unreachable departures are the ones kept.
pub fn trim_surplus_unreachable(
    departures: Vec<MarkedDeparture>,
    max_unreachable: usize,
) -> Vec<MarkedDeparture> {
    let (mut unreachable, reachable): (Vec<_>, Vec<_>) = departures
        .into_iter()
        .partition(|dep| !dep.is_reachable);

    let surplus = unreachable.len().saturating_sub(max_unreachable);
    unreachable.drain(..surplus);

    unreachable.extend(reachable);
    unreachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hafas::{Line, Stop};
    use chrono::{Duration, FixedOffset, TimeZone};
    use serde_json::Map;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> DateTime<FixedOffset> {
        (base() + Duration::minutes(minutes)).fixed_offset()
    }

    fn line(id: &str, name: &str, product: &str) -> Line {
        Line {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            product: Some(product.to_string()),
            extra: Map::new(),
        }
    }

    fn stop(id: &str, name: &str) -> Stop {
        Stop {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            extra: Map::new(),
        }
    }

    /// A departure 15 minutes after base time, on tram line STR 11.
    fn sample_departure() -> Departure {
        Departure {
            trip_id: Some("trip-123".to_string()),
            when: Some(at(15)),
            planned_when: Some(at(15)),
            delay: Some(0),
            platform: None,
            planned_platform: None,
            direction: Some("Hauptbahnhof".to_string()),
            line: Some(line("line-1", "STR 11", "tram")),
            stop: Some(stop("8012202", "Wilhelm-Leuschner-Platz")),
            extra: Map::new(),
        }
    }

    fn departure_at(trip_id: &str, minutes: i64) -> Departure {
        let mut dep = sample_departure();
        dep.trip_id = Some(trip_id.to_string());
        dep.when = Some(at(minutes));
        dep.planned_when = Some(at(minutes));
        dep
    }

    fn trip_ids(departures: &[Departure]) -> Vec<&str> {
        departures
            .iter()
            .map(|dep| dep.trip_id.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn transportation_types_keeps_included() {
        let departures = vec![
            {
                let mut d = sample_departure();
                d.line = Some(line("1", "STR 11", "tram"));
                d
            },
            {
                let mut d = sample_departure();
                d.line = Some(line("2", "BUS 89", "bus"));
                d
            },
            {
                let mut d = sample_departure();
                d.line = Some(line("3", "S1", "suburban"));
                d
            },
        ];
        let included = vec!["tram".to_string(), "bus".to_string()];

        let result = filter_by_transportation_types(departures, &included);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].line.as_ref().unwrap().product.as_deref(), Some("tram"));
        assert_eq!(result[1].line.as_ref().unwrap().product.as_deref(), Some("bus"));
    }

    #[test]
    fn transportation_types_drops_unknown_products() {
        let mut no_line = sample_departure();
        no_line.line = None;
        let mut no_product = sample_departure();
        no_product.line = Some(Line {
            product: None,
            ..line("1", "STR 11", "tram")
        });

        let included = vec!["tram".to_string()];
        let result = filter_by_transportation_types(vec![no_line, no_product], &included);

        assert!(result.is_empty());
    }

    #[test]
    fn ignored_lines_drops_exact_matches() {
        let departures = vec![
            {
                let mut d = sample_departure();
                d.line = Some(line("1", "STR 11", "tram"));
                d
            },
            {
                let mut d = sample_departure();
                d.line = Some(line("2", "BUS 89", "bus"));
                d
            },
        ];

        let result = filter_by_ignored_lines(departures, &["STR 11".to_string()]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].line.as_ref().unwrap().name.as_deref(), Some("BUS 89"));
    }

    #[test]
    fn ignored_lines_is_case_sensitive() {
        let mut dep = sample_departure();
        dep.line = Some(line("1", "str 11", "tram"));

        let result = filter_by_ignored_lines(vec![dep], &["STR 11".to_string()]);

        assert_eq!(result.len(), 1);
    }

    #[test]
    fn ignored_lines_is_whitespace_sensitive() {
        let mut dep = sample_departure();
        dep.line = Some(line("1", "STR  11", "tram")); // double space

        let result = filter_by_ignored_lines(vec![dep], &["STR 11".to_string()]);

        assert_eq!(result.len(), 1);
    }

    #[test]
    fn ignored_lines_keeps_nameless_lines() {
        let mut dep = sample_departure();
        dep.line = Some(Line {
            name: None,
            ..line("1", "", "tram")
        });

        let result = filter_by_ignored_lines(vec![dep], &["STR 11".to_string()]);

        assert_eq!(result.len(), 1);
    }

    #[test]
    fn stop_id_filter_drops_related_stations() {
        let here = sample_departure();
        let mut related = sample_departure();
        related.stop = Some(stop("8012203", "Wilhelm-Leuschner-Platz (Nord)"));

        let result = filter_by_stop_id(vec![here, related], "8012202");

        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].stop.as_ref().unwrap().id.as_deref(),
            Some("8012202")
        );
    }

    #[test]
    fn excluded_directions_is_a_noop_when_empty() {
        let departures = vec![sample_departure(), sample_departure()];

        let result = filter_by_excluded_directions(departures.clone(), &[]);

        assert_eq!(result, departures);
    }

    #[test]
    fn excluded_directions_drops_matches_and_keeps_unnamed() {
        let to_hbf = sample_departure();
        let mut to_messe = sample_departure();
        to_messe.direction = Some("Messegelände".to_string());
        let mut unnamed = sample_departure();
        unnamed.direction = None;

        let result = filter_by_excluded_directions(
            vec![to_hbf, to_messe, unnamed],
            &["Hauptbahnhof".to_string()],
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].direction.as_deref(), Some("Messegelände"));
        assert_eq!(result[1].direction, None);
    }

    #[test]
    fn platform_filter_is_a_noop_when_empty() {
        let departures = vec![sample_departure()];

        let result = filter_by_platforms(departures.clone(), &[]);

        assert_eq!(result, departures);
    }

    #[test]
    fn platform_filter_prefers_realtime_and_falls_back_to_planned() {
        let mut realtime = sample_departure();
        realtime.platform = Some("2".to_string());
        realtime.planned_platform = Some("9".to_string());

        let mut planned_only = sample_departure();
        planned_only.planned_platform = Some("2".to_string());

        let mut elsewhere = sample_departure();
        elsewhere.platform = Some("9".to_string());

        let mut none = sample_departure();
        none.platform = None;
        none.planned_platform = None;

        let result = filter_by_platforms(
            vec![realtime, planned_only, elsewhere, none],
            &["2".to_string()],
        );

        assert_eq!(result.len(), 2);
    }

    #[test]
    fn sort_orders_by_effective_time() {
        let departures = vec![
            departure_at("late", 30),
            departure_at("early", 5),
            departure_at("middle", 15),
        ];

        let sorted = sort_departures(&departures);

        assert_eq!(trip_ids(&sorted), vec!["early", "middle", "late"]);
        // input untouched
        assert_eq!(trip_ids(&departures), vec!["late", "early", "middle"]);
    }

    #[test]
    fn sort_uses_planned_when_realtime_is_missing() {
        let mut planned_only = departure_at("planned", 5);
        planned_only.when = None;
        let realtime = departure_at("realtime", 10);

        let sorted = sort_departures(&[realtime, planned_only]);

        assert_eq!(trip_ids(&sorted), vec!["planned", "realtime"]);
    }

    #[test]
    fn sort_puts_timeless_records_first() {
        let mut timeless = departure_at("timeless", 0);
        timeless.when = None;
        timeless.planned_when = None;

        let sorted = sort_departures(&[departure_at("timed", 5), timeless]);

        assert_eq!(trip_ids(&sorted), vec!["timeless", "timed"]);
    }

    #[test]
    fn duplicates_are_dropped_first_wins() {
        let first = departure_at("trip-1", 10);
        let mut second = departure_at("trip-1", 10);
        second.direction = Some("somewhere else".to_string());
        let other = departure_at("trip-2", 10);

        let result = remove_duplicates(&[first.clone(), second, other]);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], first);
    }

    #[test]
    fn duplicates_differ_by_stop() {
        let here = departure_at("trip-1", 10);
        let mut there = departure_at("trip-1", 10);
        there.stop = Some(stop("8012203", "elsewhere"));

        let result = remove_duplicates(&[here, there]);

        assert_eq!(result.len(), 2);
    }

    #[test]
    fn duplicates_fall_back_to_line_id_then_unknown() {
        let mut by_line_a = departure_at("", 10);
        by_line_a.trip_id = None;
        let mut by_line_b = by_line_a.clone();
        by_line_b.direction = Some("copy".to_string());

        // same line id, same time, same stop: duplicates
        assert_eq!(remove_duplicates(&[by_line_a.clone(), by_line_b]).len(), 1);

        let mut anonymous_a = by_line_a.clone();
        anonymous_a.line = None;
        let mut anonymous_b = anonymous_a.clone();
        anonymous_b.direction = Some("copy".to_string());

        // no trip id, no line id: both key to "unknown"
        assert_eq!(remove_duplicates(&[anonymous_a, anonymous_b]).len(), 1);
    }

    #[test]
    fn deduplication_is_idempotent() {
        let departures = vec![
            departure_at("trip-1", 10),
            departure_at("trip-1", 10),
            departure_at("trip-2", 12),
        ];

        let once = remove_duplicates(&departures);
        let twice = remove_duplicates(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn reachability_boundary_is_inclusive() {
        let reachable_time = base() + Duration::minutes(10);
        let exactly = departure_at("exact", 10);
        let just_before = departure_at("before", 9);
        let after = departure_at("after", 11);

        let marked = mark_reachability(vec![just_before, exactly, after], reachable_time);

        assert!(!marked[0].is_reachable);
        assert!(marked[1].is_reachable);
        assert!(marked[2].is_reachable);
    }

    #[test]
    fn timeless_departures_are_marked_unreachable_but_kept() {
        let mut timeless = sample_departure();
        timeless.when = None;
        timeless.planned_when = None;

        let marked = mark_reachability(vec![timeless], base());

        assert_eq!(marked.len(), 1);
        assert!(!marked[0].is_reachable);
    }

    #[test]
    fn planned_only_matches_realtime_for_reachability() {
        let reachable_time = base() + Duration::minutes(10);
        let mut planned_only = departure_at("planned", 10);
        planned_only.when = None;
        let realtime = departure_at("realtime", 10);

        let marked = mark_reachability(vec![planned_only, realtime], reachable_time);

        assert_eq!(marked[0].is_reachable, marked[1].is_reachable);
    }

    #[test]
    fn lead_time_shrinks_on_surplus() {
        assert_eq!(adjust_lead_time(20, 5, 3), 11);
        assert_eq!(adjust_lead_time(21, 5, 3), 12); // round(10.5) + 1
    }

    #[test]
    fn lead_time_grows_when_there_is_room() {
        assert_eq!(adjust_lead_time(20, 2, 3), 25);
        assert_eq!(adjust_lead_time(20, 3, 3), 25); // equal to max is not a surplus
    }

    #[test]
    fn lead_time_stops_growing_above_45() {
        assert_eq!(adjust_lead_time(46, 2, 3), 46);
        assert_eq!(adjust_lead_time(45, 2, 3), 50); // still grows at exactly 45
    }

    #[test]
    fn trim_drops_the_soonest_unreachable_entries() {
        let mark = |trip: &str, minutes: i64, is_reachable: bool| MarkedDeparture {
            departure: departure_at(trip, minutes),
            is_reachable,
        };
        let departures = vec![
            mark("u1", 1, false),
            mark("u2", 2, false),
            mark("u3", 3, false),
            mark("u4", 4, false),
            mark("u5", 5, false),
            mark("r1", 20, true),
            mark("r2", 25, true),
        ];

        let trimmed = trim_surplus_unreachable(departures, 3);

        let ids: Vec<_> = trimmed
            .iter()
            .map(|d| d.departure.trip_id.as_deref().unwrap())
            .collect();
        // the two soonest unreachable entries are spliced off the front
        assert_eq!(ids, vec!["u3", "u4", "u5", "r1", "r2"]);
    }

    #[test]
    fn trim_with_zero_allowance_drops_all_unreachable() {
        let departures = vec![
            MarkedDeparture {
                departure: departure_at("u1", 1),
                is_reachable: false,
            },
            MarkedDeparture {
                departure: departure_at("r1", 20),
                is_reachable: true,
            },
        ];

        let trimmed = trim_surplus_unreachable(departures, 0);

        assert_eq!(trimmed.len(), 1);
        assert!(trimmed[0].is_reachable);
    }

    #[test]
    fn trim_below_allowance_keeps_everything() {
        let departures = vec![
            MarkedDeparture {
                departure: departure_at("u1", 1),
                is_reachable: false,
            },
            MarkedDeparture {
                departure: departure_at("r1", 20),
                is_reachable: true,
            },
        ];

        let trimmed = trim_surplus_unreachable(departures.clone(), 3);

        assert_eq!(trimmed, departures);
    }

    #[test]
    fn marked_departure_serializes_flat() {
        let marked = MarkedDeparture {
            departure: sample_departure(),
            is_reachable: true,
        };

        let value = serde_json::to_value(&marked).unwrap();

        assert_eq!(value["isReachable"], true);
        assert_eq!(value["tripId"], "trip-123");
        assert_eq!(value["direction"], "Hauptbahnhof");
    }
}
