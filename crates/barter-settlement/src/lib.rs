//! Settlement worker: counts pending off-chain actions and, past the
//! threshold, generates and submits a settlement proof.
//!
//! Runs on its own timer, independent of the coordinator, and shares no
//! mutable state with it. Ticks never overlap: one loop task awaits each
//! check (proof generation included) before sleeping for the next.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use barter_core::{BarterError, TxHash, DEFAULT_SETTLEMENT_INTERVAL_MS, DEFAULT_SETTLEMENT_MIN_ACTIONS};
use barter_crypto::Fp;
use barter_pool::{compute_settlement_proof, ActionBlock, EscrowPool, SettlementProof};

#[derive(Clone, Debug)]
pub struct SettlementConfig {
    pub interval: Duration,
    pub min_actions: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_SETTLEMENT_INTERVAL_MS),
            min_actions: DEFAULT_SETTLEMENT_MIN_ACTIONS,
        }
    }
}

/// Proof generation, separated from the worker loop so tests can observe
/// invocations and production can run the fold off the async threads.
#[async_trait]
pub trait SettlementProver: Send + Sync {
    async fn create_proof(
        &self,
        prior_root: Fp,
        prior_action_state: Fp,
        blocks: &[ActionBlock],
    ) -> Result<SettlementProof, BarterError>;
}

/// Production prover: the transcript fold on a blocking thread. Large
/// backlogs take minutes of CPU, which must not stall the runtime.
pub struct TranscriptProver;

#[async_trait]
impl SettlementProver for TranscriptProver {
    async fn create_proof(
        &self,
        prior_root: Fp,
        prior_action_state: Fp,
        blocks: &[ActionBlock],
    ) -> Result<SettlementProof, BarterError> {
        let blocks = blocks.to_vec();
        tokio::task::spawn_blocking(move || {
            compute_settlement_proof(prior_root, prior_action_state, &blocks)
        })
        .await
        .map_err(|e| BarterError::Rpc(format!("prover task aborted: {e}")))?
    }
}

/// What one settlement check did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    BelowThreshold { pending: usize },
    Settled { pending: usize, tx: TxHash },
}

/// Pending actions across the nested block → account-update → action shape.
pub fn count_pending(blocks: &[ActionBlock]) -> usize {
    blocks.iter().map(ActionBlock::entry_count).sum()
}

pub struct SettlementWorker<P, V> {
    pool: Arc<P>,
    prover: V,
    config: SettlementConfig,
}

impl<P: EscrowPool, V: SettlementProver> SettlementWorker<P, V> {
    pub fn new(pool: Arc<P>, prover: V, config: SettlementConfig) -> Self {
        Self { pool, prover, config }
    }

    pub fn prover(&self) -> &V {
        &self.prover
    }

    /// One full check: refresh the pool commitments, count pending actions,
    /// prove and settle when at or past the threshold.
    pub async fn check_once(&self) -> Result<SettlementOutcome, BarterError> {
        let snapshot = self.pool.pool_snapshot().await?;
        let blocks = self.pool.actions_since(snapshot.settled_action_state).await?;
        let pending = count_pending(&blocks);
        if pending < self.config.min_actions {
            debug!(pending, threshold = self.config.min_actions, "below settlement threshold");
            return Ok(SettlementOutcome::BelowThreshold { pending });
        }

        info!(pending, "generating settlement proof");
        let proof = self
            .prover
            .create_proof(snapshot.offchain_root, snapshot.settled_action_state, &blocks)
            .await?;
        let tx = self.pool.settle(proof).await?;
        info!(pending, %tx, "settlement submitted");
        Ok(SettlementOutcome::Settled { pending, tx })
    }

    /// Run until shutdown: one check immediately, then one per interval.
    /// Errors are logged and the next tick proceeds.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.config.interval.as_millis() as u64, "settlement worker started");
        loop {
            if let Err(e) = self.check_once().await {
                warn!(error = %e, "settlement check failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("settlement worker stopping");
                        break;
                    }
                }
            }
        }
    }
}
