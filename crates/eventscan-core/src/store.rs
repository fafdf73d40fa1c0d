//! Store contract — the append-only persistence sink for typed records.
//!
//! One `create_*` method per event variant so backends can normalize each
//! family into its own table. The engine is the only caller and calls
//! sequentially; backends do not need internal write coordination for it.

use async_trait::async_trait;

use crate::error::ScanError;
use crate::event::{
    AddRecord, GasRecord, GenesisRecord, PoolRecord, RefundRecord, RewardRecord, SlashRecord,
    StakeRecord, SwapRecord, UnstakeRecord,
};
use crate::types::LatestState;

/// Persistence sink for typed event records.
#[async_trait]
pub trait Store: Send + Sync {
    /// The last durably recorded position, or `None` for an empty store.
    /// Read once at startup to resume scanning.
    async fn latest_state(&self) -> Result<Option<LatestState>, ScanError>;

    async fn create_stake(&self, record: StakeRecord) -> Result<(), ScanError>;
    async fn create_unstake(&self, record: UnstakeRecord) -> Result<(), ScanError>;
    async fn create_swap(&self, record: SwapRecord) -> Result<(), ScanError>;
    async fn create_reward(&self, record: RewardRecord) -> Result<(), ScanError>;
    async fn create_add(&self, record: AddRecord) -> Result<(), ScanError>;
    async fn create_pool(&self, record: PoolRecord) -> Result<(), ScanError>;
    async fn create_gas(&self, record: GasRecord) -> Result<(), ScanError>;
    async fn create_refund(&self, record: RefundRecord) -> Result<(), ScanError>;
    async fn create_slash(&self, record: SlashRecord) -> Result<(), ScanError>;

    /// Persist the genesis marker. Returns the number of rows written
    /// (zero when the marker already exists).
    async fn create_genesis(&self, record: GenesisRecord) -> Result<u64, ScanError>;
}
