//! Typed event model — the closed set of domain records the dispatcher
//! produces and the store persists.
//!
//! Amounts are fixed-point values carried as `i64` (1e8 base units). They
//! are never represented as floats so financial sums cannot drift.

use serde::{Deserialize, Serialize};

use crate::types::TxRef;

// ─── Tag parsing ─────────────────────────────────────────────────────────────

/// The closed set of event type tags the dispatcher understands.
///
/// Adding a variant here forces every dispatch match to be extended, which
/// is the point: no string-keyed handler table to silently fall through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Stake,
    Unstake,
    Swap,
    Reward,
    Add,
    Pool,
    Gas,
    Refund,
    Slash,
}

impl EventKind {
    /// Parse a node-side type tag. Returns `None` for unrecognized tags so
    /// the dispatcher can skip them (forward compatibility).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "stake" => Some(Self::Stake),
            "unstake" => Some(Self::Unstake),
            "swap" => Some(Self::Swap),
            "rewards" => Some(Self::Reward),
            "add" => Some(Self::Add),
            "pool" => Some(Self::Pool),
            "gas" => Some(Self::Gas),
            "refund" => Some(Self::Refund),
            "slash" => Some(Self::Slash),
            _ => None,
        }
    }

    /// Returns `true` if events of this kind reference outbound
    /// transactions that may need to be resolved separately.
    pub fn has_outbounds(&self) -> bool {
        matches!(self, Self::Unstake | Self::Swap | Self::Refund)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Swap => "swap",
            Self::Reward => "rewards",
            Self::Add => "add",
            Self::Pool => "pool",
            Self::Gas => "gas",
            Self::Refund => "refund",
            Self::Slash => "slash",
        };
        f.write_str(s)
    }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Fields common to every stream event variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Node-assigned event ID (the position in event-batch deployments).
    pub event_id: i64,
    /// Block height the event was emitted at.
    pub height: i64,
    /// Node-reported status (e.g. `"Success"`).
    pub status: String,
    /// The inbound transaction that caused the event.
    pub in_tx: TxRef,
    /// Outbound transactions, possibly resolved by enrichment.
    pub out_txs: Vec<TxRef>,
    /// Event time as a unix timestamp (seconds).
    pub timestamp: i64,
}

// ─── Variant payloads ────────────────────────────────────────────────────────

/// A `(pool, amount)` pair used by reward and slash events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAmount {
    pub pool: String,
    #[serde(deserialize_with = "de::int64")]
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pool: String,
    #[serde(deserialize_with = "de::int64")]
    pub stake_units: i64,
    #[serde(deserialize_with = "de::int64")]
    pub rune_amount: i64,
    #[serde(deserialize_with = "de::int64")]
    pub asset_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pool: String,
    #[serde(deserialize_with = "de::int64")]
    pub stake_units: i64,
    #[serde(deserialize_with = "de::int64")]
    pub basis_points: i64,
    /// Withdrawal asymmetry in basis points (0 = symmetric).
    #[serde(default, deserialize_with = "de::int64_opt_zero")]
    pub asymmetry_bp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pool: String,
    #[serde(deserialize_with = "de::int64")]
    pub price_target: i64,
    #[serde(deserialize_with = "de::int64")]
    pub trade_slip: i64,
    #[serde(deserialize_with = "de::int64")]
    pub liquidity_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    #[serde(deserialize_with = "de::int64")]
    pub bond_reward: i64,
    #[serde(default)]
    pub pool_rewards: Vec<PoolAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pool: String,
    #[serde(deserialize_with = "de::int64")]
    pub rune_amount: i64,
    #[serde(deserialize_with = "de::int64")]
    pub asset_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pool: String,
    pub status: String,
}

/// Gas consumed from a single pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPool {
    pub asset: String,
    #[serde(deserialize_with = "de::int64")]
    pub rune_amount: i64,
    #[serde(deserialize_with = "de::int64")]
    pub asset_amount: i64,
    #[serde(deserialize_with = "de::int64")]
    pub tx_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pools: Vec<GasPool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    #[serde(deserialize_with = "de::int64")]
    pub code: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRecord {
    #[serde(skip)]
    pub common: EventEnvelope,
    pub pool: String,
    #[serde(default)]
    pub amounts: Vec<PoolAmount>,
}

/// The one-time genesis marker persisted before the poll loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisRecord {
    /// Chain genesis time as a unix timestamp (seconds).
    pub genesis_time: i64,
}

// ─── TypedEvent ──────────────────────────────────────────────────────────────

/// A decoded, variant-specific domain record ready for persistence.
///
/// Owned exclusively by the dispatch call that created it and handed to the
/// store by value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedEvent {
    Stake(StakeRecord),
    Unstake(UnstakeRecord),
    Swap(SwapRecord),
    Reward(RewardRecord),
    Add(AddRecord),
    Pool(PoolRecord),
    Gas(GasRecord),
    Refund(RefundRecord),
    Slash(SlashRecord),
    Genesis(GenesisRecord),
}

impl TypedEvent {
    /// The common envelope, when the variant carries one.
    /// Genesis is a startup marker and has no stream envelope.
    pub fn envelope(&self) -> Option<&EventEnvelope> {
        match self {
            Self::Stake(r) => Some(&r.common),
            Self::Unstake(r) => Some(&r.common),
            Self::Swap(r) => Some(&r.common),
            Self::Reward(r) => Some(&r.common),
            Self::Add(r) => Some(&r.common),
            Self::Pool(r) => Some(&r.common),
            Self::Gas(r) => Some(&r.common),
            Self::Refund(r) => Some(&r.common),
            Self::Slash(r) => Some(&r.common),
            Self::Genesis(_) => None,
        }
    }
}

// ─── Deserialization helpers ─────────────────────────────────────────────────

/// Chain nodes emit fixed-point amounts as decimal strings inside JSON
/// attributes; accept both string and integer forms.
pub(crate) mod de {
    use serde::de::{Deserializer, Error, Unexpected, Visitor};

    struct Int64Visitor;

    impl Visitor<'_> for Int64Visitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an integer or a decimal string")
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<i64, E> {
            v.parse::<i64>()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    pub fn int64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        d.deserialize_any(Int64Visitor)
    }

    /// Like [`int64`] but for optional fields: absent or null means zero.
    pub fn int64_opt_zero<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        use serde::Deserialize;

        #[derive(Deserialize)]
        struct Wrapper(#[serde(deserialize_with = "int64")] i64);

        Ok(Option::<Wrapper>::deserialize(d)?.map(|w| w.0).unwrap_or(0))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_parse_round_trip() {
        for kind in [
            EventKind::Stake,
            EventKind::Unstake,
            EventKind::Swap,
            EventKind::Reward,
            EventKind::Add,
            EventKind::Pool,
            EventKind::Gas,
            EventKind::Refund,
            EventKind::Slash,
        ] {
            assert_eq!(EventKind::from_tag(&kind.to_string()), Some(kind));
        }
        assert_eq!(EventKind::from_tag("bond_paid"), None);
    }

    #[test]
    fn amounts_decode_from_strings() {
        let stake: StakeRecord = serde_json::from_value(serde_json::json!({
            "pool": "BNB.BNB",
            "stake_units": "25000000",
            "rune_amount": "100000000",
            "asset_amount": 50000000
        }))
        .unwrap();
        assert_eq!(stake.stake_units, 25_000_000);
        assert_eq!(stake.rune_amount, 100_000_000);
        assert_eq!(stake.asset_amount, 50_000_000);
    }

    #[test]
    fn non_numeric_amount_is_an_error() {
        let result: Result<StakeRecord, _> = serde_json::from_value(serde_json::json!({
            "pool": "BNB.BNB",
            "stake_units": "lots",
            "rune_amount": "1",
            "asset_amount": "1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn unstake_asymmetry_defaults_to_zero() {
        let unstake: UnstakeRecord = serde_json::from_value(serde_json::json!({
            "pool": "BTC.BTC",
            "stake_units": "1000",
            "basis_points": "10000"
        }))
        .unwrap();
        assert_eq!(unstake.asymmetry_bp, 0);
    }

    #[test]
    fn reward_pool_amounts_decode() {
        let reward: RewardRecord = serde_json::from_value(serde_json::json!({
            "bond_reward": "1234",
            "pool_rewards": [
                { "pool": "BNB.BNB", "amount": "-55" },
                { "pool": "BTC.BTC", "amount": 99 }
            ]
        }))
        .unwrap();
        assert_eq!(reward.bond_reward, 1234);
        assert_eq!(reward.pool_rewards[0].amount, -55);
        assert_eq!(reward.pool_rewards[1].amount, 99);
    }

    #[test]
    fn outbound_kinds() {
        assert!(EventKind::Unstake.has_outbounds());
        assert!(EventKind::Swap.has_outbounds());
        assert!(EventKind::Refund.has_outbounds());
        assert!(!EventKind::Stake.has_outbounds());
        assert!(!EventKind::Reward.has_outbounds());
    }
}
