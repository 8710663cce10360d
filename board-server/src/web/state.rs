//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::fetcher::MarkedDeparture;

/// The latest published board for one station.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub station_id: String,

    /// When the board was last successfully refreshed. `None` until the
    /// first successful cycle.
    pub updated_at: Option<DateTime<Utc>>,

    /// The refined departure list, unreachable entries first.
    pub departures: Vec<MarkedDeparture>,

    /// Error from the most recent failed cycle. Cleared on the next
    /// success; the departure list keeps showing the last good data while
    /// this is set.
    pub last_error: Option<String>,
}

impl BoardSnapshot {
    fn empty(station_id: String) -> Self {
        Self {
            station_id,
            updated_at: None,
            departures: Vec::new(),
            last_error: None,
        }
    }
}

/// Shared snapshot store, written by the refresh tasks and read by the
/// route handlers.
#[derive(Clone)]
pub struct AppState {
    boards: Arc<RwLock<HashMap<String, BoardSnapshot>>>,
}

impl AppState {
    /// Create the state with an empty snapshot per configured station, so
    /// boards are listed before their first refresh completes.
    pub fn new(station_ids: impl IntoIterator<Item = String>) -> Self {
        let boards = station_ids
            .into_iter()
            .map(|id| (id.clone(), BoardSnapshot::empty(id)))
            .collect();

        Self {
            boards: Arc::new(RwLock::new(boards)),
        }
    }

    /// Station ids with a board, sorted for stable output.
    pub async fn station_ids(&self) -> Vec<String> {
        let guard = self.boards.read().await;
        let mut ids: Vec<String> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The latest snapshot for a station.
    pub async fn board(&self, station_id: &str) -> Option<BoardSnapshot> {
        let guard = self.boards.read().await;
        guard.get(station_id).cloned()
    }

    /// Publish a successful refresh.
    pub async fn update(&self, station_id: &str, departures: Vec<MarkedDeparture>) {
        let mut guard = self.boards.write().await;
        let snapshot = guard
            .entry(station_id.to_string())
            .or_insert_with(|| BoardSnapshot::empty(station_id.to_string()));
        snapshot.departures = departures;
        snapshot.updated_at = Some(Utc::now());
        snapshot.last_error = None;
    }

    /// Record a failed refresh, keeping the previous board visible.
    pub async fn record_error(&self, station_id: &str, message: String) {
        let mut guard = self.boards.write().await;
        let snapshot = guard
            .entry(station_id.to_string())
            .or_insert_with(|| BoardSnapshot::empty(station_id.to_string()));
        snapshot.last_error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_stations_start_with_empty_boards() {
        let state = AppState::new(["b".to_string(), "a".to_string()]);

        assert_eq!(state.station_ids().await, vec!["a", "b"]);

        let board = state.board("a").await.unwrap();
        assert!(board.departures.is_empty());
        assert!(board.updated_at.is_none());
        assert!(board.last_error.is_none());
    }

    #[tokio::test]
    async fn update_clears_a_previous_error() {
        let state = AppState::new(["8012202".to_string()]);

        state
            .record_error("8012202", "upstream unavailable".to_string())
            .await;
        let board = state.board("8012202").await.unwrap();
        assert_eq!(board.last_error.as_deref(), Some("upstream unavailable"));

        state.update("8012202", Vec::new()).await;
        let board = state.board("8012202").await.unwrap();
        assert!(board.last_error.is_none());
        assert!(board.updated_at.is_some());
    }

    #[tokio::test]
    async fn errors_keep_the_previous_departures() {
        let state = AppState::new(["8012202".to_string()]);

        state.update("8012202", Vec::new()).await;
        let updated_at = state.board("8012202").await.unwrap().updated_at;

        state.record_error("8012202", "timeout".to_string()).await;
        let board = state.board("8012202").await.unwrap();

        assert_eq!(board.updated_at, updated_at);
        assert_eq!(board.last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn unknown_station_has_no_board() {
        let state = AppState::new(["8012202".to_string()]);

        assert!(state.board("999").await.is_none());
    }
}
