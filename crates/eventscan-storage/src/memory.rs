//! In-memory storage backend.
//!
//! Keeps every record family in a plain vector behind a mutex. All data is
//! lost when the process exits; the accessors exist so tests can assert on
//! exactly what was written.

use async_trait::async_trait;
use std::sync::Mutex;

use eventscan_core::error::ScanError;
use eventscan_core::event::{
    AddRecord, EventEnvelope, GasRecord, GenesisRecord, PoolRecord, RefundRecord, RewardRecord,
    SlashRecord, StakeRecord, SwapRecord, UnstakeRecord,
};
use eventscan_core::store::Store;
use eventscan_core::types::LatestState;

#[derive(Default)]
struct Records {
    stakes: Vec<StakeRecord>,
    unstakes: Vec<UnstakeRecord>,
    swaps: Vec<SwapRecord>,
    rewards: Vec<RewardRecord>,
    adds: Vec<AddRecord>,
    pools: Vec<PoolRecord>,
    gas: Vec<GasRecord>,
    refunds: Vec<RefundRecord>,
    slashes: Vec<SlashRecord>,
    genesis: Option<GenesisRecord>,
}

/// In-memory event store.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
    latest: Mutex<Option<LatestState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the checkpoint, as if a previous process had written up to
    /// `state`. For restart tests.
    pub fn set_latest_state(&self, state: LatestState) {
        *self.latest.lock().unwrap() = Some(state);
    }

    pub fn stakes(&self) -> Vec<StakeRecord> {
        self.records.lock().unwrap().stakes.clone()
    }

    pub fn unstakes(&self) -> Vec<UnstakeRecord> {
        self.records.lock().unwrap().unstakes.clone()
    }

    pub fn swaps(&self) -> Vec<SwapRecord> {
        self.records.lock().unwrap().swaps.clone()
    }

    pub fn rewards(&self) -> Vec<RewardRecord> {
        self.records.lock().unwrap().rewards.clone()
    }

    pub fn adds(&self) -> Vec<AddRecord> {
        self.records.lock().unwrap().adds.clone()
    }

    pub fn pools(&self) -> Vec<PoolRecord> {
        self.records.lock().unwrap().pools.clone()
    }

    pub fn gas(&self) -> Vec<GasRecord> {
        self.records.lock().unwrap().gas.clone()
    }

    pub fn refunds(&self) -> Vec<RefundRecord> {
        self.records.lock().unwrap().refunds.clone()
    }

    pub fn slashes(&self) -> Vec<SlashRecord> {
        self.records.lock().unwrap().slashes.clone()
    }

    pub fn genesis(&self) -> Option<GenesisRecord> {
        self.records.lock().unwrap().genesis
    }

    /// Total number of stream records across all families (genesis marker
    /// excluded).
    pub fn event_count(&self) -> usize {
        let r = self.records.lock().unwrap();
        r.stakes.len()
            + r.unstakes.len()
            + r.swaps.len()
            + r.rewards.len()
            + r.adds.len()
            + r.pools.len()
            + r.gas.len()
            + r.refunds.len()
            + r.slashes.len()
    }

    fn note(&self, envelope: &EventEnvelope) {
        let mut latest = self.latest.lock().unwrap();
        let state = latest.get_or_insert(LatestState {
            height: 0,
            event_id: 0,
        });
        state.height = state.height.max(envelope.height);
        state.event_id = state.event_id.max(envelope.event_id);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn latest_state(&self) -> Result<Option<LatestState>, ScanError> {
        Ok(*self.latest.lock().unwrap())
    }

    async fn create_stake(&self, record: StakeRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().stakes.push(record);
        Ok(())
    }

    async fn create_unstake(&self, record: UnstakeRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().unstakes.push(record);
        Ok(())
    }

    async fn create_swap(&self, record: SwapRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().swaps.push(record);
        Ok(())
    }

    async fn create_reward(&self, record: RewardRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().rewards.push(record);
        Ok(())
    }

    async fn create_add(&self, record: AddRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().adds.push(record);
        Ok(())
    }

    async fn create_pool(&self, record: PoolRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().pools.push(record);
        Ok(())
    }

    async fn create_gas(&self, record: GasRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().gas.push(record);
        Ok(())
    }

    async fn create_refund(&self, record: RefundRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().refunds.push(record);
        Ok(())
    }

    async fn create_slash(&self, record: SlashRecord) -> Result<(), ScanError> {
        self.note(&record.common);
        self.records.lock().unwrap().slashes.push(record);
        Ok(())
    }

    async fn create_genesis(&self, record: GenesisRecord) -> Result<u64, ScanError> {
        let mut records = self.records.lock().unwrap();
        if records.genesis.is_some() {
            return Ok(0);
        }
        records.genesis = Some(record);
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap(event_id: i64, height: i64) -> SwapRecord {
        SwapRecord {
            common: EventEnvelope {
                event_id,
                height,
                status: "Success".into(),
                ..EventEnvelope::default()
            },
            pool: "BNB.BNB".into(),
            price_target: 0,
            trade_slip: 21,
            liquidity_fee: 7,
        }
    }

    #[tokio::test]
    async fn empty_store_has_no_state() {
        let store = MemoryStore::new();
        assert!(store.latest_state().await.unwrap().is_none());
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn writes_advance_latest_state() {
        let store = MemoryStore::new();
        store.create_swap(swap(1, 17)).await.unwrap();
        store.create_swap(swap(2, 18)).await.unwrap();

        let state = store.latest_state().await.unwrap().unwrap();
        assert_eq!(state.event_id, 2);
        assert_eq!(state.height, 18);
        assert_eq!(store.swaps().len(), 2);
    }

    #[tokio::test]
    async fn genesis_is_written_once() {
        let store = MemoryStore::new();
        let marker = GenesisRecord {
            genesis_time: 1_550_000_000,
        };
        assert_eq!(store.create_genesis(marker).await.unwrap(), 1);
        assert_eq!(store.create_genesis(marker).await.unwrap(), 0);
        assert_eq!(store.genesis().unwrap().genesis_time, 1_550_000_000);

        // The marker is not a stream record.
        assert!(store.latest_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seeded_state_is_returned() {
        let store = MemoryStore::new();
        store.set_latest_state(LatestState {
            height: 120,
            event_id: 4_500,
        });
        let state = store.latest_state().await.unwrap().unwrap();
        assert_eq!(state.event_id, 4_500);
    }
}
