//! Block callback trait for the ranged-fetch deployment.

use async_trait::async_trait;

use crate::error::ScanError;
use crate::types::RawEvent;

/// Receives ordered block deliveries from the dispatcher.
///
/// `on_block` is called once per height with the block-level events;
/// `on_tx` once per transaction that carried events. A returned error
/// halts the current batch without advancing the position past the block,
/// so the same height is re-delivered on the next cycle.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    async fn on_block(
        &self,
        height: i64,
        time: i64,
        begin_events: &[RawEvent],
        end_events: &[RawEvent],
    ) -> Result<(), ScanError>;

    async fn on_tx(
        &self,
        height: i64,
        tx_index: usize,
        events: &[RawEvent],
    ) -> Result<(), ScanError>;
}
