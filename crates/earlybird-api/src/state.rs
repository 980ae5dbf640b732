//! Shared application state.

use std::sync::Arc;

use chrono::FixedOffset;

use earlybird_catalog::BadgeCatalog;
use earlybird_core::clock::Clock;
use earlybird_core::store::ArrivalStore;
use earlybird_engine::evaluator::BadgeEvaluator;
use earlybird_engine::registrar::ArrivalRegistrar;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registration service.
    pub registrar: Arc<ArrivalRegistrar>,
    /// Badge evaluation service.
    pub evaluator: Arc<BadgeEvaluator>,
    /// Storage, for the read-only projections.
    pub store: Arc<dyn ArrivalStore>,
    /// Badge catalog, for enriching responses.
    pub catalog: Arc<BadgeCatalog>,
    /// Clock used when a request omits the arrival timestamp.
    pub clock: Arc<dyn Clock>,
    /// Offset that defines the local calendar day.
    pub local_offset: FixedOffset,
}

impl AppState {
    /// Create new application state, wiring the registrar and evaluator
    /// over the given store.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArrivalStore>,
        catalog: Arc<BadgeCatalog>,
        clock: Arc<dyn Clock>,
        local_offset: FixedOffset,
    ) -> Self {
        let registrar = Arc::new(ArrivalRegistrar::new(store.clone(), local_offset));
        let evaluator = Arc::new(BadgeEvaluator::new(
            store.clone(),
            catalog.clone(),
            local_offset,
        ));
        Self {
            registrar,
            evaluator,
            store,
            catalog,
            clock,
            local_offset,
        }
    }
}
