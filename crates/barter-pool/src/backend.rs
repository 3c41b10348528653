use async_trait::async_trait;

use barter_core::{BarterError, L1Address, TradeRecord, TxHash};
use barter_crypto::Fp;

use crate::proof::SettlementProof;

// ── Account views ────────────────────────────────────────────────────────────

/// On-chain view of the shared escrow pool account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolAccount {
    /// Pool balance in smallest units.
    pub balance: u64,
    pub nonce: u32,
    /// Committed off-chain map root (app state slot 0).
    pub offchain_root: Fp,
    /// Action state at the last settlement (app state slot 1).
    pub settled_action_state: Fp,
    /// Latest emitted action state, ahead of the settled one while actions
    /// are pending.
    pub action_state: Fp,
}

/// Fee-payer view of the operator account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorAccount {
    pub nonce: u32,
    pub balance: u64,
}

// ── Actions ──────────────────────────────────────────────────────────────────

/// One emitted off-chain-state mutation, as a flat field-element tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionEntry {
    pub fields: Vec<Fp>,
}

/// Actions emitted within one ledger block, grouped per account update.
/// The pending-action count is the sum of the inner list lengths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionBlock {
    pub block_height: u64,
    /// Cumulative action state after this block.
    pub action_state: Fp,
    pub actions: Vec<Vec<ActionEntry>>,
}

impl ActionBlock {
    pub fn entry_count(&self) -> usize {
        self.actions.iter().map(Vec::len).sum()
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// The three operator-only pool mutations.
#[derive(Clone, Debug)]
pub enum PoolOperation {
    LockTrade { key: Fp, claimant: L1Address },
    EmergencyUnlock { key: Fp },
    Settle { proof: SettlementProof },
}

impl PoolOperation {
    pub fn name(&self) -> &'static str {
        match self {
            PoolOperation::LockTrade { .. } => "lockTrade",
            PoolOperation::EmergencyUnlock { .. } => "emergencyUnlock",
            PoolOperation::Settle { .. } => "settle",
        }
    }
}

// ── Backend trait ────────────────────────────────────────────────────────────

/// Typed face of the ledger SDK: one read path for off-chain map slots, one
/// write path for proven operator commands. The concrete implementation is
/// the GraphQL backend; tests substitute an in-memory one.
#[async_trait]
pub trait L1Backend: Send + Sync {
    /// One-shot connection/setup. Idempotent.
    async fn connect(&self) -> Result<(), BarterError>;

    /// Raw off-chain map slot for `key` — including completed records, which
    /// the policy layer above maps to absence.
    async fn fetch_record(&self, key: Fp) -> Result<Option<TradeRecord>, BarterError>;

    async fn pool_account(&self) -> Result<PoolAccount, BarterError>;

    async fn operator_account(&self) -> Result<OperatorAccount, BarterError>;

    /// Action blocks emitted after `since` (the settled action state), in
    /// ledger order.
    async fn fetch_actions(&self, since: Fp) -> Result<Vec<ActionBlock>, BarterError>;

    /// Prove, sign and submit one operation. Never returns an empty hash.
    async fn submit(&self, op: PoolOperation) -> Result<TxHash, BarterError>;

    /// Best-effort inclusion wait. A failure here does not invalidate an
    /// already-returned transaction id.
    async fn wait(&self, tx: &TxHash) -> Result<(), BarterError>;
}
