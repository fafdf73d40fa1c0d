//! Shared types for the ingestion pipeline.

use serde::{Deserialize, Serialize};

// ─── TxRef ───────────────────────────────────────────────────────────────────

/// Reference to a chain transaction, as carried by event envelopes and
/// returned by outbound-transaction lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    /// Transaction hash/ID as reported by the node.
    pub tx_id: String,
    /// Transaction memo (routing/intent string).
    #[serde(default)]
    pub memo: String,
}

impl TxRef {
    pub fn new(tx_id: impl Into<String>, memo: impl Into<String>) -> Self {
        Self {
            tx_id: tx_id.into(),
            memo: memo.into(),
        }
    }
}

// ─── RawEvent ────────────────────────────────────────────────────────────────

/// An untyped event envelope as received from the chain node.
///
/// `attributes` holds the variant-specific payload as JSON; the dispatcher
/// decodes it into a typed record based on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Strictly increasing event ID assigned by the node.
    pub id: i64,
    /// Block height the event was emitted at.
    pub height: i64,
    /// Type tag (e.g. `"stake"`, `"swap"`).
    pub kind: String,
    /// Opaque variant-specific payload.
    pub attributes: serde_json::Value,
    /// Outbound transactions, when the node already resolved them.
    /// `None` means unknown — the dispatcher may look them up.
    #[serde(default)]
    pub out_txs: Option<Vec<TxRef>>,
}

// ─── BlockRecord ─────────────────────────────────────────────────────────────

/// One fetched block, ready for ordered delivery to the block callback.
///
/// Constructed per height by the batch fetcher, consumed exactly once by
/// the dispatcher, then discarded.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub height: i64,
    /// Block time as a unix timestamp (seconds).
    pub time: i64,
    pub begin_events: Vec<RawEvent>,
    pub end_events: Vec<RawEvent>,
    /// Per-transaction event lists, in transaction order.
    pub tx_events: Vec<Vec<RawEvent>>,
}

// ─── LatestState ─────────────────────────────────────────────────────────────

/// Durable checkpoint read once at startup: the last processed height and
/// event ID. Only used to seed the position tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestState {
    pub height: i64,
    pub event_id: i64,
}

// ─── ScanItem ────────────────────────────────────────────────────────────────

/// One unit of work produced by a fetch strategy.
///
/// The ranged strategy yields blocks; the event-batch strategy yields raw
/// events. Both carry a monotone position so the loop can advance the
/// tracker per item.
#[derive(Debug, Clone)]
pub enum ScanItem {
    Block(BlockRecord),
    Event(RawEvent),
}

impl ScanItem {
    /// The monotone position of this item (block height or event ID).
    pub fn position(&self) -> i64 {
        match self {
            Self::Block(b) => b.height,
            Self::Event(e) => e.id,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_item_position() {
        let block = ScanItem::Block(BlockRecord {
            height: 42,
            time: 0,
            begin_events: vec![],
            end_events: vec![],
            tx_events: vec![],
        });
        assert_eq!(block.position(), 42);

        let event = ScanItem::Event(RawEvent {
            id: 7,
            height: 42,
            kind: "swap".into(),
            attributes: serde_json::Value::Null,
            out_txs: None,
        });
        assert_eq!(event.position(), 7);
    }

    #[test]
    fn raw_event_out_txs_default_to_unknown() {
        let ev: RawEvent = serde_json::from_value(serde_json::json!({
            "id": 1,
            "height": 10,
            "kind": "stake",
            "attributes": {}
        }))
        .unwrap();
        assert!(ev.out_txs.is_none());
    }
}
