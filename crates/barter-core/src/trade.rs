use serde::{Deserialize, Serialize};

use crate::types::{L1Address, TradeKey};

// ── TradeRecord ──────────────────────────────────────────────────────────────

/// One slot of the pool's off-chain Merkle map.
///
/// Mutated only by the operator methods `lockTrade` / `emergencyUnlock`;
/// cleared by user claim or refund (both set `completed`, after which every
/// reader treats the slot as absent).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Who funded the pool side.
    pub depositor: L1Address,
    /// Escrowed amount in smallest units.
    pub amount: u64,
    /// True iff the pool side is locked by the operator.
    pub in_transit: bool,
    /// Party authorized to claim the pool side. Non-empty iff `in_transit`.
    pub claimant: Option<L1Address>,
    pub refund_address: L1Address,
    pub deposit_block_height: u64,
    pub expiry_block_height: u64,
    pub completed: bool,
}

impl TradeRecord {
    /// Check the record-level invariants. A violation means the slot decode
    /// produced garbage; callers log and skip the slot rather than acting.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.in_transit != self.claimant.is_some() {
            return Err(format!(
                "in_transit={} but claimant {}",
                self.in_transit,
                if self.claimant.is_some() { "set" } else { "empty" }
            ));
        }
        if self.expiry_block_height < self.deposit_block_height {
            return Err(format!(
                "expiry height {} before deposit height {}",
                self.expiry_block_height, self.deposit_block_height
            ));
        }
        if !self.completed && self.amount == 0 {
            return Err("active record with zero amount".into());
        }
        Ok(())
    }
}

// ── L2State ──────────────────────────────────────────────────────────────────

/// Daemon-reported state of the value-transfer side of one trade.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2State {
    /// True once the daemon has recognized the L2 funding.
    #[serde(default)]
    pub verified: bool,
    /// True once the L2 side is locked.
    #[serde(default)]
    pub in_transit: bool,
    /// Refund destination on L2, when the daemon knows it.
    #[serde(default)]
    pub origin_address: Option<String>,
    #[serde(default)]
    pub received_amount: Option<String>,
    /// Daemon-internal status scalar, passed through for logging.
    #[serde(default)]
    pub status: Option<String>,
}

// ── CombinedState ────────────────────────────────────────────────────────────

/// The join of both ledgers' views of one trade, as observed in one poll
/// cycle.
#[derive(Clone, Debug)]
pub struct CombinedState {
    pub key: TradeKey,
    pub record: Option<TradeRecord>,
    pub l2: Option<L2State>,
}

impl CombinedState {
    pub fn new(key: TradeKey, record: Option<TradeRecord>, l2: Option<L2State>) -> Self {
        Self { key, record, l2 }
    }

    /// Both sides funded, neither side locked.
    pub fn ready_to_lock(&self) -> bool {
        match (&self.record, &self.l2) {
            (Some(record), Some(l2)) => {
                !record.in_transit && l2.verified && !l2.in_transit
            }
            _ => false,
        }
    }
}
