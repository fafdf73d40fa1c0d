//! Event dispatcher — turns raw envelopes into exactly one typed store
//! write each, in position order.
//!
//! Failure policy (per error class):
//! - decode failure / unknown tag: log, skip the event, keep going
//! - enrichment failure: log, persist the event without outbounds
//! - store write failure: log, halt the batch, do not advance past the item

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::event::{
    AddRecord, EventEnvelope, EventKind, GasRecord, PoolRecord, RefundRecord, RewardRecord,
    SlashRecord, StakeRecord, SwapRecord, TypedEvent, UnstakeRecord,
};
use crate::handler::BlockHandler;
use crate::reader::EventReader;
use crate::store::Store;
use crate::tracker::PositionTracker;
use crate::types::{BlockRecord, RawEvent, ScanItem, TxRef};

/// What happened to a single dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded and written to the store.
    Persisted,
    /// Unknown tag or malformed payload; logged and dropped.
    Skipped,
}

/// Envelope fields the node embeds in the attribute payload.
#[derive(Debug, Default, Deserialize)]
struct EnvelopeFields {
    #[serde(default)]
    status: String,
    #[serde(default)]
    in_tx: TxRef,
    #[serde(default)]
    timestamp: i64,
}

/// Converts raw events into typed store writes and delivers block records
/// to the block callback.
pub struct EventDispatcher {
    store: Arc<dyn Store>,
    /// Outbound-transaction resolver for enrichment (event-batch
    /// deployments). `None` disables enrichment.
    resolver: Option<Arc<dyn EventReader>>,
    /// Block callback for ranged deployments.
    block_handler: Option<Arc<dyn BlockHandler>>,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            resolver: None,
            block_handler: None,
        }
    }

    /// Enable outbound-transaction enrichment through `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<dyn EventReader>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attach the block callback used for `ScanItem::Block` deliveries.
    pub fn with_block_handler(mut self, handler: Arc<dyn BlockHandler>) -> Self {
        self.block_handler = Some(handler);
        self
    }

    /// Process one fetched batch in ascending position order, advancing the
    /// tracker after each item's write attempt has returned.
    ///
    /// The sort is re-verified here even though strategies already deliver
    /// in order. Returns the number of items that were persisted; a store
    /// or callback failure stops the batch and leaves the tracker at the
    /// last successful item.
    pub async fn dispatch_all(
        &self,
        mut items: Vec<ScanItem>,
        tracker: &PositionTracker,
    ) -> Result<usize, ScanError> {
        items.sort_by_key(|item| item.position());

        let mut persisted = 0;
        for item in items {
            let position = item.position();
            match item {
                ScanItem::Event(event) => match self.dispatch(event).await {
                    Ok(DispatchOutcome::Persisted) => {
                        tracker.advance(position);
                        persisted += 1;
                    }
                    // A malformed event is dropped for good; refetching the
                    // same bytes cannot fix it, so the position moves on.
                    Ok(DispatchOutcome::Skipped) => tracker.advance(position),
                    Err(e) => {
                        warn!(position, error = %e, "store write failed, halting batch");
                        return Err(e);
                    }
                },
                ScanItem::Block(block) => match self.dispatch_block(&block).await {
                    Ok(()) => {
                        tracker.advance(position);
                        persisted += 1;
                    }
                    Err(e) => {
                        warn!(height = position, error = %e, "block delivery failed, halting batch");
                        return Err(e);
                    }
                },
            }
        }
        Ok(persisted)
    }

    /// Dispatch a single raw event: decode, enrich, persist.
    pub async fn dispatch(&self, event: RawEvent) -> Result<DispatchOutcome, ScanError> {
        let Some(kind) = EventKind::from_tag(&event.kind) else {
            debug!(id = event.id, kind = %event.kind, "unknown event tag, skipping");
            return Ok(DispatchOutcome::Skipped);
        };

        let typed = match self.decode(kind, &event).await {
            Ok(typed) => typed,
            Err(e) => {
                warn!(id = event.id, kind = %kind, error = %e, "undecodable event, skipping");
                return Ok(DispatchOutcome::Skipped);
            }
        };

        self.persist(typed).await?;
        Ok(DispatchOutcome::Persisted)
    }

    /// Deliver one block to the block callback: one `on_block`, then one
    /// `on_tx` per transaction event list.
    pub async fn dispatch_block(&self, block: &BlockRecord) -> Result<(), ScanError> {
        let handler = self.block_handler.as_ref().ok_or_else(|| {
            ScanError::InvalidConfig("ranged items require a block handler".into())
        })?;

        handler
            .on_block(
                block.height,
                block.time,
                &block.begin_events,
                &block.end_events,
            )
            .await?;

        for (tx_index, events) in block.tx_events.iter().enumerate() {
            handler.on_tx(block.height, tx_index, events).await?;
        }
        Ok(())
    }

    async fn decode(&self, kind: EventKind, event: &RawEvent) -> Result<TypedEvent, ScanError> {
        let common = self.envelope(kind, event).await;
        let attrs = &event.attributes;

        let decode_err = |e: serde_json::Error| ScanError::Decode {
            id: event.id,
            kind: event.kind.clone(),
            reason: e.to_string(),
        };

        let typed = match kind {
            EventKind::Stake => TypedEvent::Stake(StakeRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Unstake => TypedEvent::Unstake(UnstakeRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Swap => TypedEvent::Swap(SwapRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Reward => TypedEvent::Reward(RewardRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Add => TypedEvent::Add(AddRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Pool => TypedEvent::Pool(PoolRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Gas => TypedEvent::Gas(GasRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Refund => TypedEvent::Refund(RefundRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
            EventKind::Slash => TypedEvent::Slash(SlashRecord {
                common,
                ..serde_json::from_value(attrs.clone()).map_err(decode_err)?
            }),
        };
        Ok(typed)
    }

    /// Build the common envelope, resolving outbound transactions when the
    /// variant references them and the node did not include them.
    async fn envelope(&self, kind: EventKind, event: &RawEvent) -> EventEnvelope {
        let fields: EnvelopeFields =
            serde_json::from_value(event.attributes.clone()).unwrap_or_default();

        let out_txs = match &event.out_txs {
            Some(txs) => txs.clone(),
            None if kind.has_outbounds() => match &self.resolver {
                Some(resolver) => match resolver.outbound_txs(event).await {
                    Ok(txs) => txs,
                    Err(e) => {
                        warn!(id = event.id, error = %e, "outbound lookup failed, persisting unenriched");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        EventEnvelope {
            event_id: event.id,
            height: event.height,
            status: fields.status,
            in_tx: fields.in_tx,
            out_txs,
            timestamp: fields.timestamp,
        }
    }

    async fn persist(&self, typed: TypedEvent) -> Result<(), ScanError> {
        match typed {
            TypedEvent::Stake(r) => self.store.create_stake(r).await,
            TypedEvent::Unstake(r) => self.store.create_unstake(r).await,
            TypedEvent::Swap(r) => self.store.create_swap(r).await,
            TypedEvent::Reward(r) => self.store.create_reward(r).await,
            TypedEvent::Add(r) => self.store.create_add(r).await,
            TypedEvent::Pool(r) => self.store.create_pool(r).await,
            TypedEvent::Gas(r) => self.store.create_gas(r).await,
            TypedEvent::Refund(r) => self.store.create_refund(r).await,
            TypedEvent::Slash(r) => self.store.create_slash(r).await,
            TypedEvent::Genesis(r) => self.store.create_genesis(r).await.map(|_| ()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
