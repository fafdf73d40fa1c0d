//! eventscan-storage — persistence backends for the scan engine.
//!
//! Two implementations of the core [`Store`](eventscan_core::store::Store)
//! contract:
//!
//! - [`MemoryStore`] (feature `memory`, on by default): everything in RAM,
//!   for tests and short-lived runs.
//! - [`SqliteStore`] (feature `sqlite`): one SQLite file, each record
//!   family normalized into its own table.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
