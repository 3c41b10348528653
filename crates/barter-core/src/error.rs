use thiserror::Error;

#[derive(Debug, Error)]
pub enum BarterError {
    // ── Transient ledger conditions ──────────────────────────────────────────
    #[error("off-chain root mismatch for key {key}: replayed root is ahead of the on-chain commitment")]
    RootMismatch { key: String },

    #[error("ledger rpc error: {0}")]
    Rpc(String),

    #[error("http transport error: {0}")]
    Transport(String),

    // ── Data faults ──────────────────────────────────────────────────────────
    #[error("malformed trade record for key {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("malformed action entry: {0}")]
    MalformedAction(String),

    #[error("invalid trade key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    // ── Oracle ───────────────────────────────────────────────────────────────
    #[error("oracle price unavailable for {asset}")]
    PriceUnavailable { asset: String },

    #[error("non-positive derived price ({numerator} / {denominator})")]
    NonPositivePrice { numerator: u128, denominator: u128 },

    // ── Submission ───────────────────────────────────────────────────────────
    #[error("ledger rejected {operation}: {reason}")]
    SubmitRejected { operation: String, reason: String },

    #[error("ledger accepted {operation} but returned no transaction id")]
    EmptyTxHash { operation: String },

    #[error("operator signature failure: {0}")]
    Signature(String),

    // ── Persistence ──────────────────────────────────────────────────────────
    #[error("tracked-key store error: {0}")]
    TrackedKeyStore(String),

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
}

impl BarterError {
    /// Transient conditions are swallowed at component boundaries and retried
    /// on the next poll cycle (never propagated across the coordinator).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BarterError::RootMismatch { .. } | BarterError::Rpc(_) | BarterError::Transport(_)
        )
    }
}
