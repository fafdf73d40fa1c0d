//! Fetch strategies — one capability, two deployments.
//!
//! The source chain exposes two ways to pull new data: ranged block fetch
//! and event-ID polling. Both are implementations of [`FetchStrategy`];
//! a deployment picks one at construction time.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use eventscan_core::error::ScanError;
use eventscan_core::event::GenesisRecord;
use eventscan_core::reader::{EventReader, RangedReader};
use eventscan_core::types::{LatestState, ScanItem};

use crate::fetcher::BatchFetcher;

/// One batch of work produced by a strategy.
#[derive(Debug)]
pub struct FetchBatch {
    /// Items in ascending position order (the dispatcher re-verifies).
    pub items: Vec<ScanItem>,
    /// Position after the last delivered item; equals the request position
    /// when the batch is empty.
    pub next_position: i64,
    /// `true` when the reader reported no further backlog.
    pub synced: bool,
    /// Error that truncated an otherwise usable batch (ranged partial
    /// failure). The loop logs it and retries from the new frontier.
    pub interrupted: Option<ScanError>,
}

/// A source of ordered scan items after a given position.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Fetch the next batch of items with positions strictly greater than
    /// `after`.
    async fn next_batch(&self, after: i64) -> Result<FetchBatch, ScanError>;

    /// One-time genesis metadata, persisted before the poll loop starts.
    /// Strategies without genesis data return `None`.
    async fn genesis(&self) -> Result<Option<GenesisRecord>, ScanError> {
        Ok(None)
    }

    /// Which checkpoint field this strategy resumes from.
    fn resume_position(&self, state: &LatestState) -> i64;
}

// ─── Ranged blocks ───────────────────────────────────────────────────────────

/// Ranged block fetch through the [`BatchFetcher`]; positions are heights.
pub struct RangedStrategy {
    fetcher: BatchFetcher,
}

impl RangedStrategy {
    pub fn new(reader: Arc<dyn RangedReader>, max_batch: i64) -> Self {
        Self {
            fetcher: BatchFetcher::new(reader, max_batch),
        }
    }
}

#[async_trait]
impl FetchStrategy for RangedStrategy {
    async fn next_batch(&self, after: i64) -> Result<FetchBatch, ScanError> {
        let batch = self.fetcher.fetch_from(after).await?;
        let next_position = batch.blocks.last().map(|b| b.height).unwrap_or(after);
        Ok(FetchBatch {
            items: batch.blocks.into_iter().map(ScanItem::Block).collect(),
            next_position,
            synced: batch.synced,
            interrupted: batch.interrupted,
        })
    }

    fn resume_position(&self, state: &LatestState) -> i64 {
        state.height
    }
}

// ─── Event-ID polling ────────────────────────────────────────────────────────

/// Event-batch polling; positions are node-assigned event IDs.
pub struct EventBatchStrategy {
    reader: Arc<dyn EventReader>,
}

impl EventBatchStrategy {
    pub fn new(reader: Arc<dyn EventReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl FetchStrategy for EventBatchStrategy {
    async fn next_batch(&self, after: i64) -> Result<FetchBatch, ScanError> {
        let events = self.reader.events(after).await?;
        let next_position = events.last().map(|e| e.id).unwrap_or(after);
        let synced = events.is_empty();
        debug!(after, count = events.len(), "event batch fetched");
        Ok(FetchBatch {
            items: events.into_iter().map(ScanItem::Event).collect(),
            next_position,
            synced,
            interrupted: None,
        })
    }

    async fn genesis(&self) -> Result<Option<GenesisRecord>, ScanError> {
        let genesis_time = self.reader.genesis().await?;
        Ok(Some(GenesisRecord { genesis_time }))
    }

    fn resume_position(&self, state: &LatestState) -> i64 {
        state.event_id
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use eventscan_core::types::{RawEvent, TxRef};

    struct StaticEvents(Vec<RawEvent>);

    #[async_trait]
    impl EventReader for StaticEvents {
        async fn genesis(&self) -> Result<i64, ScanError> {
            Ok(1_550_000_000)
        }
        async fn events(&self, after_id: i64) -> Result<Vec<RawEvent>, ScanError> {
            Ok(self.0.iter().filter(|e| e.id > after_id).cloned().collect())
        }
        async fn outbound_txs(&self, _event: &RawEvent) -> Result<Vec<TxRef>, ScanError> {
            Ok(vec![])
        }
    }

    fn ev(id: i64) -> RawEvent {
        RawEvent {
            id,
            height: id,
            kind: "swap".into(),
            attributes: serde_json::Value::Null,
            out_txs: None,
        }
    }

    #[tokio::test]
    async fn event_strategy_filters_by_position() {
        let strategy = EventBatchStrategy::new(Arc::new(StaticEvents(vec![ev(1), ev(2), ev(3)])));

        let batch = strategy.next_batch(1).await.unwrap();
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.next_position, 3);
        assert!(!batch.synced);

        let batch = strategy.next_batch(3).await.unwrap();
        assert!(batch.items.is_empty());
        assert_eq!(batch.next_position, 3);
        assert!(batch.synced);
    }

    #[tokio::test]
    async fn event_strategy_exposes_genesis() {
        let strategy = EventBatchStrategy::new(Arc::new(StaticEvents(vec![])));
        let genesis = strategy.genesis().await.unwrap().unwrap();
        assert_eq!(genesis.genesis_time, 1_550_000_000);
    }

    #[test]
    fn resume_positions_differ_by_strategy() {
        let state = LatestState {
            height: 120,
            event_id: 4_500,
        };
        let events = EventBatchStrategy::new(Arc::new(StaticEvents(vec![])));
        assert_eq!(events.resume_position(&state), 4_500);
    }
}
