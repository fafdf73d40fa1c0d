//! SQLite storage backend.
//!
//! Persists the event stream to a single SQLite file. The common envelope
//! lands in `events` (with outbound transactions in `out_txs`), and each
//! record family is normalized into its own table keyed by event ID. Uses
//! `sqlx` with WAL mode for concurrent read performance.
//!
//! # Usage
//! ```rust,no_run
//! use eventscan_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./events.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use eventscan_core::error::ScanError;
use eventscan_core::event::{
    AddRecord, EventEnvelope, GasRecord, GenesisRecord, PoolRecord, RefundRecord, RewardRecord,
    SlashRecord, StakeRecord, SwapRecord, UnstakeRecord,
};
use eventscan_core::store::Store;
use eventscan_core::types::LatestState;

fn db_err(e: sqlx::Error) -> ScanError {
    ScanError::Storage(e.to_string())
}

/// SQLite-backed event store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./events.db"`) or a full
    /// SQLite URL (`"sqlite:./events.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, ScanError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(db_err)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database.
    ///
    /// All data is lost when the pool is dropped. Ideal for tests.
    pub async fn in_memory() -> Result<Self, ScanError> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(db_err)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), ScanError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let statements = [
            // Common envelope, one row per stream event
            "CREATE TABLE IF NOT EXISTS events (
                event_id   INTEGER PRIMARY KEY,
                height     INTEGER NOT NULL,
                type       TEXT    NOT NULL,
                status     TEXT    NOT NULL,
                in_tx_id   TEXT    NOT NULL,
                in_memo    TEXT    NOT NULL,
                timestamp  INTEGER NOT NULL
            );",
            "CREATE INDEX IF NOT EXISTS idx_events_height ON events (height);",
            // Outbound transactions resolved for an event
            "CREATE TABLE IF NOT EXISTS out_txs (
                event_id INTEGER NOT NULL,
                tx_id    TEXT    NOT NULL,
                memo     TEXT    NOT NULL
            );",
            "CREATE INDEX IF NOT EXISTS idx_out_txs_event ON out_txs (event_id);",
            // One table per record family
            "CREATE TABLE IF NOT EXISTS stakes (
                event_id     INTEGER PRIMARY KEY,
                pool         TEXT    NOT NULL,
                stake_units  INTEGER NOT NULL,
                rune_amount  INTEGER NOT NULL,
                asset_amount INTEGER NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS unstakes (
                event_id     INTEGER PRIMARY KEY,
                pool         TEXT    NOT NULL,
                stake_units  INTEGER NOT NULL,
                basis_points INTEGER NOT NULL,
                asymmetry_bp INTEGER NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS swaps (
                event_id      INTEGER PRIMARY KEY,
                pool          TEXT    NOT NULL,
                price_target  INTEGER NOT NULL,
                trade_slip    INTEGER NOT NULL,
                liquidity_fee INTEGER NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS rewards (
                event_id     INTEGER PRIMARY KEY,
                bond_reward  INTEGER NOT NULL,
                pool_rewards TEXT    NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS adds (
                event_id     INTEGER PRIMARY KEY,
                pool         TEXT    NOT NULL,
                rune_amount  INTEGER NOT NULL,
                asset_amount INTEGER NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS pools (
                event_id INTEGER PRIMARY KEY,
                pool     TEXT NOT NULL,
                status   TEXT NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS gas (
                event_id INTEGER PRIMARY KEY,
                pools    TEXT NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS refunds (
                event_id INTEGER PRIMARY KEY,
                code     INTEGER NOT NULL,
                reason   TEXT    NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS slashes (
                event_id INTEGER PRIMARY KEY,
                pool     TEXT NOT NULL,
                amounts  TEXT NOT NULL
            );",
            // Single-row genesis marker
            "CREATE TABLE IF NOT EXISTS genesis (
                id           INTEGER PRIMARY KEY CHECK (id = 1),
                genesis_time INTEGER NOT NULL
            );",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    /// Begin the write transaction for one event. Envelope, outbound, and
    /// family rows commit together, so a failed write leaves no trace and
    /// `latest_state` never reports an uncommitted position.
    async fn begin_event(
        &self,
        env: &EventEnvelope,
        kind: &str,
    ) -> Result<Transaction<'_, Sqlite>, ScanError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO events (event_id, height, type, status, in_tx_id, in_memo, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(env.event_id)
        .bind(env.height)
        .bind(kind)
        .bind(&env.status)
        .bind(&env.in_tx.tx_id)
        .bind(&env.in_tx.memo)
        .bind(env.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for out in &env.out_txs {
            sqlx::query("INSERT INTO out_txs (event_id, tx_id, memo) VALUES (?, ?, ?)")
                .bind(env.event_id)
                .bind(&out.tx_id)
                .bind(&out.memo)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        debug!(event_id = env.event_id, height = env.height, kind, "event write started");
        Ok(tx)
    }

    /// Total number of stream events across all families.
    pub async fn event_count(&self) -> Result<u64, ScanError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }

    /// The stored genesis time, if a marker has been written.
    pub async fn genesis_time(&self) -> Result<Option<i64>, ScanError> {
        let row = sqlx::query("SELECT genesis_time FROM genesis WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| r.get("genesis_time")))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn latest_state(&self) -> Result<Option<LatestState>, ScanError> {
        let row = sqlx::query("SELECT MAX(height) as h, MAX(event_id) as e FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let height: Option<i64> = row.get("h");
        let event_id: Option<i64> = row.get("e");
        Ok(match (height, event_id) {
            (Some(height), Some(event_id)) => Some(LatestState { height, event_id }),
            _ => None,
        })
    }

    async fn create_stake(&self, record: StakeRecord) -> Result<(), ScanError> {
        let mut tx = self.begin_event(&record.common, "stake").await?;
        sqlx::query(
            "INSERT INTO stakes (event_id, pool, stake_units, rune_amount, asset_amount)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.common.event_id)
        .bind(&record.pool)
        .bind(record.stake_units)
        .bind(record.rune_amount)
        .bind(record.asset_amount)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_unstake(&self, record: UnstakeRecord) -> Result<(), ScanError> {
        let mut tx = self.begin_event(&record.common, "unstake").await?;
        sqlx::query(
            "INSERT INTO unstakes (event_id, pool, stake_units, basis_points, asymmetry_bp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.common.event_id)
        .bind(&record.pool)
        .bind(record.stake_units)
        .bind(record.basis_points)
        .bind(record.asymmetry_bp)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_swap(&self, record: SwapRecord) -> Result<(), ScanError> {
        let mut tx = self.begin_event(&record.common, "swap").await?;
        sqlx::query(
            "INSERT INTO swaps (event_id, pool, price_target, trade_slip, liquidity_fee)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.common.event_id)
        .bind(&record.pool)
        .bind(record.price_target)
        .bind(record.trade_slip)
        .bind(record.liquidity_fee)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_reward(&self, record: RewardRecord) -> Result<(), ScanError> {
        let pool_rewards = serde_json::to_string(&record.pool_rewards)
            .map_err(|e| ScanError::Storage(e.to_string()))?;
        let mut tx = self.begin_event(&record.common, "rewards").await?;
        sqlx::query("INSERT INTO rewards (event_id, bond_reward, pool_rewards) VALUES (?, ?, ?)")
            .bind(record.common.event_id)
            .bind(record.bond_reward)
            .bind(&pool_rewards)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_add(&self, record: AddRecord) -> Result<(), ScanError> {
        let mut tx = self.begin_event(&record.common, "add").await?;
        sqlx::query(
            "INSERT INTO adds (event_id, pool, rune_amount, asset_amount) VALUES (?, ?, ?, ?)",
        )
        .bind(record.common.event_id)
        .bind(&record.pool)
        .bind(record.rune_amount)
        .bind(record.asset_amount)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_pool(&self, record: PoolRecord) -> Result<(), ScanError> {
        let mut tx = self.begin_event(&record.common, "pool").await?;
        sqlx::query("INSERT INTO pools (event_id, pool, status) VALUES (?, ?, ?)")
            .bind(record.common.event_id)
            .bind(&record.pool)
            .bind(&record.status)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_gas(&self, record: GasRecord) -> Result<(), ScanError> {
        let pools =
            serde_json::to_string(&record.pools).map_err(|e| ScanError::Storage(e.to_string()))?;
        let mut tx = self.begin_event(&record.common, "gas").await?;
        sqlx::query("INSERT INTO gas (event_id, pools) VALUES (?, ?)")
            .bind(record.common.event_id)
            .bind(&pools)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_refund(&self, record: RefundRecord) -> Result<(), ScanError> {
        let mut tx = self.begin_event(&record.common, "refund").await?;
        sqlx::query("INSERT INTO refunds (event_id, code, reason) VALUES (?, ?, ?)")
            .bind(record.common.event_id)
            .bind(record.code)
            .bind(&record.reason)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_slash(&self, record: SlashRecord) -> Result<(), ScanError> {
        let amounts =
            serde_json::to_string(&record.amounts).map_err(|e| ScanError::Storage(e.to_string()))?;
        let mut tx = self.begin_event(&record.common, "slash").await?;
        sqlx::query("INSERT INTO slashes (event_id, pool, amounts) VALUES (?, ?, ?)")
            .bind(record.common.event_id)
            .bind(&record.pool)
            .bind(&amounts)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn create_genesis(&self, record: GenesisRecord) -> Result<u64, ScanError> {
        let result = sqlx::query("INSERT OR IGNORE INTO genesis (id, genesis_time) VALUES (1, ?)")
            .bind(record.genesis_time)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use eventscan_core::types::TxRef;

    fn envelope(event_id: i64, height: i64) -> EventEnvelope {
        EventEnvelope {
            event_id,
            height,
            status: "Success".into(),
            in_tx: TxRef {
                tx_id: format!("IN{event_id:04}"),
                memo: "swap:BNB.BNB".into(),
            },
            out_txs: vec![TxRef {
                tx_id: format!("OUT{event_id:04}"),
                memo: "OUTBOUND".into(),
            }],
            timestamp: 1_550_000_000 + event_id,
        }
    }

    fn swap(event_id: i64, height: i64) -> SwapRecord {
        SwapRecord {
            common: envelope(event_id, height),
            pool: "BNB.BNB".into(),
            price_target: 0,
            trade_slip: 21,
            liquidity_fee: 7,
        }
    }

    #[tokio::test]
    async fn empty_store_has_no_state() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.latest_state().await.unwrap().is_none());
        assert_eq!(store.event_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn latest_state_tracks_written_events() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_swap(swap(1, 17)).await.unwrap();
        store.create_swap(swap(2, 18)).await.unwrap();
        store
            .create_stake(StakeRecord {
                common: envelope(3, 19),
                pool: "BTC.BTC".into(),
                stake_units: 25_000_000,
                rune_amount: 100_000_000,
                asset_amount: 50_000_000,
            })
            .await
            .unwrap();

        let state = store.latest_state().await.unwrap().unwrap();
        assert_eq!(state.event_id, 3);
        assert_eq!(state.height, 19);
        assert_eq!(store.event_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn failed_family_insert_rolls_back_the_envelope() {
        let store = SqliteStore::in_memory().await.unwrap();

        // Occupy the swaps primary key so the family insert fails after
        // the envelope insert succeeded inside the same transaction.
        sqlx::query(
            "INSERT INTO swaps (event_id, pool, price_target, trade_slip, liquidity_fee)
             VALUES (1, 'BNB.BNB', 0, 0, 0)",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.create_swap(swap(1, 17)).await.unwrap_err();
        assert!(matches!(err, ScanError::Storage(_)));

        // The whole write rolled back: no envelope or outbound rows leaked,
        // and the checkpoint does not report the failed position as done.
        assert_eq!(store.event_count().await.unwrap(), 0);
        assert!(store.latest_state().await.unwrap().is_none());
        let out_rows = sqlx::query("SELECT tx_id FROM out_txs WHERE event_id = 1")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert!(out_rows.is_empty());

        // Once the conflict clears, the same event can be retried.
        sqlx::query("DELETE FROM swaps WHERE event_id = 1")
            .execute(&store.pool)
            .await
            .unwrap();
        store.create_swap(swap(1, 17)).await.unwrap();
        let state = store.latest_state().await.unwrap().unwrap();
        assert_eq!(state.event_id, 1);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_swap(swap(1, 17)).await.unwrap();

        // The envelope primary key makes redelivery a hard error rather
        // than a silent duplicate row.
        let err = store.create_swap(swap(1, 17)).await.unwrap_err();
        assert!(matches!(err, ScanError::Storage(_)));
    }

    #[tokio::test]
    async fn genesis_marker_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let marker = GenesisRecord {
            genesis_time: 1_550_000_000,
        };
        assert_eq!(store.create_genesis(marker).await.unwrap(), 1);
        assert_eq!(store.create_genesis(marker).await.unwrap(), 0);
        assert_eq!(store.genesis_time().await.unwrap(), Some(1_550_000_000));

        // The marker does not appear in the stream.
        assert!(store.latest_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reward_and_gas_payloads_round_trip_as_json() {
        use eventscan_core::event::{GasPool, PoolAmount};

        let store = SqliteStore::in_memory().await.unwrap();
        store
            .create_reward(RewardRecord {
                common: envelope(1, 10),
                bond_reward: 1234,
                pool_rewards: vec![PoolAmount {
                    pool: "BNB.BNB".into(),
                    amount: -55,
                }],
            })
            .await
            .unwrap();
        store
            .create_gas(GasRecord {
                common: envelope(2, 11),
                pools: vec![GasPool {
                    asset: "BNB.BNB".into(),
                    rune_amount: 100,
                    asset_amount: 50,
                    tx_count: 2,
                }],
            })
            .await
            .unwrap();

        let row = sqlx::query("SELECT pool_rewards FROM rewards WHERE event_id = 1")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let rewards: Vec<PoolAmount> =
            serde_json::from_str(&row.get::<String, _>("pool_rewards")).unwrap();
        assert_eq!(rewards[0].amount, -55);

        let row = sqlx::query("SELECT pools FROM gas WHERE event_id = 2")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let pools: Vec<GasPool> = serde_json::from_str(&row.get::<String, _>("pools")).unwrap();
        assert_eq!(pools[0].tx_count, 2);
    }

    #[tokio::test]
    async fn outbound_txs_are_stored_per_event() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_swap(swap(7, 70)).await.unwrap();

        let rows = sqlx::query("SELECT tx_id, memo FROM out_txs WHERE event_id = 7")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String, _>("tx_id"), "OUT0007");
    }
}
