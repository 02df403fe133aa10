use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::ranking::explain::ExplanationProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable explanation provider, selected once at startup. Handlers
    /// and the orchestrator never branch on the AI feature flag directly.
    pub explainer: Arc<dyn ExplanationProvider>,
    pub config: Config,
}
