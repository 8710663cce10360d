//! HTTP surface.
//!
//! Serves the latest board snapshots as JSON. Rendering (layout, styling,
//! time formatting) is the consumer's concern; this layer only publishes
//! what the fetchers produced.

mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, BoardSnapshot};
