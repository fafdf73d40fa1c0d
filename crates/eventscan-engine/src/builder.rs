//! Fluent constructor for [`ScanEngine`].
//!
//! A deployment wires exactly one data source: a ranged block reader (with
//! a block handler to receive the callbacks) or an event reader (whose
//! decoded records land in the store). Everything else has defaults.

use std::sync::Arc;

use eventscan_core::config::ScanConfig;
use eventscan_core::dispatch::EventDispatcher;
use eventscan_core::error::ScanError;
use eventscan_core::handler::BlockHandler;
use eventscan_core::reader::{EventReader, RangedReader};
use eventscan_core::store::Store;

use crate::scan_loop::ScanEngine;
use crate::strategy::{EventBatchStrategy, RangedStrategy};

/// Builder for a [`ScanEngine`]. Start from [`EngineBuilder::new`], pick a
/// source, then [`build`](EngineBuilder::build).
#[derive(Default)]
pub struct EngineBuilder {
    config: ScanConfig,
    store: Option<Arc<dyn Store>>,
    ranged: Option<Arc<dyn RangedReader>>,
    events: Option<Arc<dyn EventReader>>,
    block_handler: Option<Arc<dyn BlockHandler>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default [`ScanConfig`].
    pub fn config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// The store records and checkpoints are written to. Required.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Scan consecutive block heights through `reader`, delivering each
    /// block to `handler`.
    pub fn ranged_source(
        mut self,
        reader: Arc<dyn RangedReader>,
        handler: Arc<dyn BlockHandler>,
    ) -> Self {
        self.ranged = Some(reader);
        self.block_handler = Some(handler);
        self
    }

    /// Poll `reader` for typed events by ID; the reader also serves as the
    /// outbound-transaction resolver for enrichment.
    pub fn event_source(mut self, reader: Arc<dyn EventReader>) -> Self {
        self.events = Some(reader);
        self
    }

    pub fn build(self) -> Result<ScanEngine, ScanError> {
        self.config.validate()?;
        let store = self
            .store
            .ok_or_else(|| ScanError::InvalidConfig("a store is required".into()))?;

        match (self.ranged, self.events) {
            (Some(reader), None) => {
                let handler = self.block_handler.ok_or_else(|| {
                    ScanError::InvalidConfig("ranged source requires a block handler".into())
                })?;
                let strategy = Arc::new(RangedStrategy::new(reader, self.config.max_batch_size));
                let dispatcher =
                    EventDispatcher::new(Arc::clone(&store)).with_block_handler(handler);
                ScanEngine::new(self.config, strategy, dispatcher, store)
            }
            (None, Some(reader)) => {
                let strategy = Arc::new(EventBatchStrategy::new(Arc::clone(&reader)));
                let dispatcher = EventDispatcher::new(Arc::clone(&store)).with_resolver(reader);
                ScanEngine::new(self.config, strategy, dispatcher, store)
            }
            (None, None) => Err(ScanError::InvalidConfig(
                "an event or ranged source is required".into(),
            )),
            (Some(_), Some(_)) => Err(ScanError::InvalidConfig(
                "event and ranged sources are mutually exclusive".into(),
            )),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use eventscan_core::types::{RawEvent, TxRef};
    use eventscan_storage::MemoryStore;

    struct NoEvents;

    #[async_trait]
    impl EventReader for NoEvents {
        async fn genesis(&self) -> Result<i64, ScanError> {
            Ok(0)
        }
        async fn events(&self, _after_id: i64) -> Result<Vec<RawEvent>, ScanError> {
            Ok(vec![])
        }
        async fn outbound_txs(&self, _event: &RawEvent) -> Result<Vec<TxRef>, ScanError> {
            Ok(vec![])
        }
    }

    #[test]
    fn build_requires_a_store() {
        let err = EngineBuilder::new()
            .event_source(Arc::new(NoEvents))
            .build()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn build_requires_exactly_one_source() {
        let err = EngineBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = ScanConfig {
            max_batch_size: 0,
            ..ScanConfig::default()
        };
        let err = EngineBuilder::new()
            .config(config)
            .store(Arc::new(MemoryStore::new()))
            .event_source(Arc::new(NoEvents))
            .build()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn event_source_builds() {
        let engine = EngineBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .event_source(Arc::new(NoEvents))
            .build()
            .unwrap();
        assert_eq!(engine.position(), 0);
    }
}
