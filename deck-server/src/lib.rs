//! # Deck Server Library
//!
//! Hosts embedded slide views over WebSocket. Each connection to `/ws` is
//! one view with its own protocol handler; this library is shared by the
//! binary and the integration tests.

use std::sync::Arc;

use axum::{routing::get, Router};
use deck_core::StyleResolver;
use deck_protocol::{AutosaveConfig, SnapshotStore};

pub mod bridge;
pub mod config;
pub mod health;
pub mod metrics;

pub use config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Style resolver over the loaded template and theme registries.
    pub resolver: StyleResolver,
    /// Snapshot storage shared by every view.
    pub store: Arc<dyn SnapshotStore>,
    /// Autosave settings for new views.
    pub autosave: AutosaveConfig,
    /// Theme for views that do not name one.
    pub default_theme: String,
}

impl AppState {
    /// Create application state.
    pub fn new(
        resolver: StyleResolver,
        store: Arc<dyn SnapshotStore>,
        autosave: AutosaveConfig,
        default_theme: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            store,
            autosave,
            default_theme: default_theme.into(),
        }
    }
}

/// View and health routes. The binary adds metrics and HTTP layers.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route("/ws", get(bridge::view_handler))
        .with_state(state)
}
