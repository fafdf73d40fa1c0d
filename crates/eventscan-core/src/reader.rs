//! Chain reader contracts — the two fetch surfaces a remote node exposes.
//!
//! Implementations wrap an RPC client; the engine only requires that
//! concurrent reads are safe (the batch fetcher issues parallel
//! `block_results` calls).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::types::{RawEvent, TxRef};

/// Per-block metadata returned by a ranged query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    pub height: i64,
    /// Block time as a unix timestamp (seconds).
    pub time: i64,
}

/// Result of a ranged metadata query: the node's current tip plus metadata
/// for the requested heights (bounded by the tip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInfo {
    pub tip: i64,
    pub metas: Vec<BlockMeta>,
}

/// Events of a single block, grouped the way the node reports them.
#[derive(Debug, Clone, Default)]
pub struct BlockResults {
    pub begin_events: Vec<RawEvent>,
    pub end_events: Vec<RawEvent>,
    pub tx_events: Vec<Vec<RawEvent>>,
}

/// Ranged block fetch: ask for a height window, get the tip and per-block
/// results.
#[async_trait]
pub trait RangedReader: Send + Sync {
    /// Query block metadata for `[min_height, max_height]` and the node's
    /// current chain tip.
    async fn range_info(&self, min_height: i64, max_height: i64) -> Result<RangeInfo, ScanError>;

    /// Fetch the events of a single block.
    async fn block_results(&self, height: i64) -> Result<BlockResults, ScanError>;
}

/// Event-batch fetch: poll for domain events after a last-seen event ID.
#[async_trait]
pub trait EventReader: Send + Sync {
    /// Chain genesis time as a unix timestamp (seconds).
    async fn genesis(&self) -> Result<i64, ScanError>;

    /// The next batch of events with IDs strictly greater than `after_id`.
    /// An empty batch means the reader is caught up.
    async fn events(&self, after_id: i64) -> Result<Vec<RawEvent>, ScanError>;

    /// Resolve the outbound transactions of an inbound event.
    /// Best-effort enrichment; failures never block persistence.
    async fn outbound_txs(&self, event: &RawEvent) -> Result<Vec<TxRef>, ScanError>;
}
