//! # Application State
//!
//! Shared state for the Axum application: the settlement engine behind
//! an `Arc`, cloned into every handler.

use std::sync::Arc;

use fundi_settlement::SettlementEngine;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The settlement engine serving every request.
    pub engine: Arc<SettlementEngine>,
}

impl AppState {
    /// Wrap an engine for the router.
    pub fn new(engine: Arc<SettlementEngine>) -> Self {
        Self { engine }
    }
}
