use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use board_server::config::AppConfig;
use board_server::fetcher::{DepartureFetcher, DepartureProvider};
use board_server::hafas::{HafasClient, HafasConfig};
use board_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    let mut config = AppConfig::load(&config_path)
        .unwrap_or_else(|e| panic!("failed to load {config_path}: {e}"));
    config.sanitize();

    let client = HafasClient::new(HafasConfig::new(config.hafas_profile))
        .expect("failed to create HAFAS client");
    info!(
        "querying the {} profile for {} station(s), refreshing every {}s",
        config.hafas_profile,
        config.stations.len(),
        config.updates_every
    );

    let state = AppState::new(config.stations.iter().map(|s| s.station_id.clone()));
    let period = Duration::from_secs(config.updates_every);

    // One task per station owns its fetcher, so cycles on an instance are
    // serialized: the next tick cannot start before the previous cycle
    // finished.
    for station_config in config.stations {
        let mut fetcher = DepartureFetcher::new(client.clone(), station_config);
        fetcher.init();

        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                refresh_board(&mut fetcher, &state).await;
            }
        });
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .unwrap();
    info!("departure board listening on http://{}", config.listen_addr);
    axum::serve(listener, app).await.unwrap();
}

/// Run one fetch cycle and publish the outcome.
async fn refresh_board<P: DepartureProvider>(
    fetcher: &mut DepartureFetcher<P>,
    state: &AppState,
) {
    let station_id = fetcher.station_id().to_string();
    match fetcher.fetch_departures().await {
        Ok(departures) => {
            info!(
                "board for stop {station_id} refreshed: {} departure(s)",
                departures.len()
            );
            state.update(&station_id, departures).await;
        }
        Err(e) => {
            error!("board refresh for stop {station_id} failed: {e}");
            state.record_error(&station_id, e.to_string()).await;
        }
    }
}
