//! eventscan-engine — the ingestion engine proper.
//!
//! One background worker polls a [`FetchStrategy`] for new data after the
//! current position, dispatches it in order, and advances the position
//! tracker per committed item. Transient failures are logged and retried
//! forever; the worker only exits on an explicit stop.

pub mod builder;
pub mod fetcher;
pub mod scan_loop;
pub mod strategy;

pub use builder::EngineBuilder;
pub use fetcher::{BatchFetcher, RangedBatch};
pub use scan_loop::ScanEngine;
pub use strategy::{EventBatchStrategy, FetchBatch, FetchStrategy, RangedStrategy};
