//! eventscan-core — foundation for the resumable chain-event ingestion engine.
//!
//! # Architecture
//!
//! ```text
//! ScanEngine (eventscan-engine)
//!     ├── FetchStrategy      (ranged blocks or event-ID batches)
//!     ├── PositionTracker    (atomic ingestion frontier)
//!     ├── EventDispatcher    (tag → typed record → Store write)
//!     ├── BlockHandler       (per-block callback for the ranged deployment)
//!     └── Store backend      (memory / SQLite)
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod reader;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::ScanConfig;
pub use dispatch::{DispatchOutcome, EventDispatcher};
pub use error::ScanError;
pub use event::{EventEnvelope, EventKind, GenesisRecord, TypedEvent};
pub use handler::BlockHandler;
pub use reader::{BlockMeta, BlockResults, EventReader, RangeInfo, RangedReader};
pub use store::Store;
pub use tracker::PositionTracker;
pub use types::{BlockRecord, LatestState, RawEvent, ScanItem, TxRef};
