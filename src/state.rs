//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the document store behind a trait object, the parsed config, and
//! the recent cash-register reports snapshot kept fresh by a background poller.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::services::reports::RecentReports;
use crate::store::DocumentStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
    /// Latest `rapports_caisse` snapshot, overall and per shop.
    pub recent_reports: Arc<RwLock<RecentReports>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        Self { store, config: Arc::new(config), recent_reports: Arc::new(RwLock::new(RecentReports::default())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
