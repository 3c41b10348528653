use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use barter_core::{BarterError, L1Address, TradeKey, TradeRecord, TxHash};
use barter_crypto::{trade_key_field, Fp};

use crate::backend::{L1Backend, PoolAccount, PoolOperation};
use crate::proof::SettlementProof;
use crate::tracked::TrackedKeys;

/// One active slot of the pool, paired with its display key.
#[derive(Clone, Debug)]
pub struct ActiveTrade {
    pub key: TradeKey,
    pub record: TradeRecord,
}

/// Pool client configuration (env-derived, see the operator binary).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub graphql_endpoint: String,
    pub pool_address: L1Address,
    pub tx_fee: u64,
    pub tracked_keys_path: PathBuf,
}

/// Coordinator- and worker-facing surface of the L1 side.
///
/// Scenario tests substitute recording fakes; the production implementation
/// is [`PoolClient`] over the GraphQL backend.
#[async_trait]
pub trait EscrowPool: Send + Sync {
    async fn connect(&self) -> Result<(), BarterError>;

    /// Every tracked, present, non-completed trade. Per-key failures are
    /// logged and skipped, never fatal; completed slots are unregistered.
    async fn get_active_trades(&self) -> Result<Vec<ActiveTrade>, BarterError>;

    /// One slot; `None` for absent or completed.
    async fn get_trade(&self, key: &TradeKey) -> Result<Option<TradeRecord>, BarterError>;

    async fn lock_trade(&self, key: &TradeKey, claimant: &L1Address)
        -> Result<TxHash, BarterError>;

    async fn emergency_unlock(&self, key: &TradeKey) -> Result<TxHash, BarterError>;

    async fn settle(&self, proof: SettlementProof) -> Result<TxHash, BarterError>;

    /// Balance and commitment view of the pool account.
    async fn pool_snapshot(&self) -> Result<PoolAccount, BarterError>;

    /// Pending action blocks emitted after `state`.
    async fn actions_since(&self, state: Fp)
        -> Result<Vec<crate::backend::ActionBlock>, BarterError>;

    async fn register_trade(&self, key: &TradeKey) -> Result<(), BarterError>;

    async fn unregister_trade(&self, key: &TradeKey) -> Result<(), BarterError>;

    fn tracked_keys(&self) -> Vec<TradeKey>;
}

/// Policy layer over a raw [`L1Backend`]: tracked-key iteration, completed
/// slots treated as absent, transient-error swallowing, record sanity
/// checks.
pub struct PoolClient<B: L1Backend> {
    backend: B,
    tracked: Mutex<TrackedKeys>,
}

impl<B: L1Backend> PoolClient<B> {
    pub fn new(backend: B, tracked_keys_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            tracked: Mutex::new(TrackedKeys::load(tracked_keys_path.into())),
        }
    }

    fn scalar(key: &TradeKey) -> Result<Fp, BarterError> {
        trade_key_field(key)
    }

    /// Fetch one raw slot and apply record policy: completed ⇒ absent,
    /// invariant violations ⇒ error (slot is garbage, never act on it).
    async fn fetch_checked(&self, key: &TradeKey) -> Result<Option<TradeRecord>, BarterError> {
        let record = self.backend.fetch_record(Self::scalar(key)?).await?;
        let Some(record) = record else {
            return Ok(None);
        };
        if record.completed {
            return Ok(None);
        }
        record
            .check_invariants()
            .map_err(|reason| BarterError::MalformedRecord {
                key: key.to_string(),
                reason,
            })?;
        Ok(Some(record))
    }

    async fn submit_checked(&self, op: PoolOperation) -> Result<TxHash, BarterError> {
        let name = op.name();
        let tx = self.backend.submit(op).await?;
        if tx.is_empty() {
            return Err(BarterError::EmptyTxHash {
                operation: name.to_string(),
            });
        }
        // The command is accepted once an id is held; a failed inclusion
        // watch only costs us the confirmation.
        if let Err(e) = self.backend.wait(&tx).await {
            warn!(operation = name, tx = %tx, error = %e, "inclusion wait failed (non-fatal)");
        }
        Ok(tx)
    }
}

#[async_trait]
impl<B: L1Backend> EscrowPool for PoolClient<B> {
    async fn connect(&self) -> Result<(), BarterError> {
        self.backend.connect().await
    }

    async fn get_active_trades(&self) -> Result<Vec<ActiveTrade>, BarterError> {
        let keys = self.tracked_keys();
        let mut active = Vec::new();
        let mut completed = Vec::new();
        for key in keys {
            let scalar = match Self::scalar(&key) {
                Ok(scalar) => scalar,
                Err(e) => {
                    warn!(key = %key, error = %e, "tracked key is not mappable, skipping");
                    continue;
                }
            };
            match self.backend.fetch_record(scalar).await {
                Ok(None) => {}
                Ok(Some(record)) if record.completed => completed.push(key),
                Ok(Some(record)) => match record.check_invariants() {
                    Ok(()) => active.push(ActiveTrade { key, record }),
                    Err(reason) => {
                        warn!(key = %key, %reason, "skipping malformed trade record")
                    }
                },
                Err(e) if e.is_transient() => {
                    debug!(key = %key, error = %e, "transient read failure, skipping key this cycle")
                }
                Err(e) => warn!(key = %key, error = %e, "trade read failed, skipping key"),
            }
        }
        for key in completed {
            debug!(key = %key, "trade completed, unregistering");
            if let Err(e) = self.unregister_trade(&key).await {
                warn!(key = %key, error = %e, "failed to unregister completed trade");
            }
        }
        Ok(active)
    }

    async fn get_trade(&self, key: &TradeKey) -> Result<Option<TradeRecord>, BarterError> {
        match self.fetch_checked(key).await {
            Err(e) if e.is_transient() => {
                debug!(key = %key, error = %e, "transient read failure for single trade");
                Ok(None)
            }
            other => other,
        }
    }

    async fn lock_trade(
        &self,
        key: &TradeKey,
        claimant: &L1Address,
    ) -> Result<TxHash, BarterError> {
        self.submit_checked(PoolOperation::LockTrade {
            key: Self::scalar(key)?,
            claimant: claimant.clone(),
        })
        .await
    }

    async fn emergency_unlock(&self, key: &TradeKey) -> Result<TxHash, BarterError> {
        self.submit_checked(PoolOperation::EmergencyUnlock {
            key: Self::scalar(key)?,
        })
        .await
    }

    async fn settle(&self, proof: SettlementProof) -> Result<TxHash, BarterError> {
        self.submit_checked(PoolOperation::Settle { proof }).await
    }

    async fn pool_snapshot(&self) -> Result<PoolAccount, BarterError> {
        self.backend.pool_account().await
    }

    async fn actions_since(
        &self,
        state: Fp,
    ) -> Result<Vec<crate::backend::ActionBlock>, BarterError> {
        self.backend.fetch_actions(state).await
    }

    async fn register_trade(&self, key: &TradeKey) -> Result<(), BarterError> {
        self.tracked
            .lock()
            .expect("tracked-key mutex poisoned")
            .register(key)
    }

    async fn unregister_trade(&self, key: &TradeKey) -> Result<(), BarterError> {
        self.tracked
            .lock()
            .expect("tracked-key mutex poisoned")
            .unregister(key)
    }

    fn tracked_keys(&self) -> Vec<TradeKey> {
        self.tracked
            .lock()
            .expect("tracked-key mutex poisoned")
            .keys()
            .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ActionBlock, OperatorAccount};
    use barter_crypto::field_to_address;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory backend: slots keyed by scalar, scripted failures.
    #[derive(Default)]
    struct MemBackend {
        records: Mutex<HashMap<Fp, TradeRecord>>,
        root_mismatch_keys: Mutex<Vec<Fp>>,
        submissions: Mutex<Vec<String>>,
        wait_failures: AtomicU32,
        empty_hash: std::sync::atomic::AtomicBool,
    }

    impl MemBackend {
        fn insert(&self, key: Fp, record: TradeRecord) {
            self.records.lock().unwrap().insert(key, record);
        }
    }

    #[async_trait]
    impl L1Backend for MemBackend {
        async fn connect(&self) -> Result<(), BarterError> {
            Ok(())
        }

        async fn fetch_record(&self, key: Fp) -> Result<Option<TradeRecord>, BarterError> {
            if self.root_mismatch_keys.lock().unwrap().contains(&key) {
                return Err(BarterError::RootMismatch {
                    key: key.to_dec_string(),
                });
            }
            Ok(self.records.lock().unwrap().get(&key).cloned())
        }

        async fn pool_account(&self) -> Result<PoolAccount, BarterError> {
            Ok(PoolAccount {
                balance: 1_000,
                nonce: 1,
                offchain_root: Fp::ZERO,
                settled_action_state: Fp::ZERO,
                action_state: Fp::ZERO,
            })
        }

        async fn operator_account(&self) -> Result<OperatorAccount, BarterError> {
            Ok(OperatorAccount { nonce: 0, balance: 1_000 })
        }

        async fn fetch_actions(&self, _since: Fp) -> Result<Vec<ActionBlock>, BarterError> {
            Ok(Vec::new())
        }

        async fn submit(&self, op: PoolOperation) -> Result<TxHash, BarterError> {
            self.submissions.lock().unwrap().push(op.name().to_string());
            if self.empty_hash.load(Ordering::SeqCst) {
                return Ok(TxHash::new(""));
            }
            Ok(TxHash::new(format!("tx-{}", op.name())))
        }

        async fn wait(&self, _tx: &TxHash) -> Result<(), BarterError> {
            if self.wait_failures.load(Ordering::SeqCst) > 0 {
                self.wait_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(BarterError::Rpc("inclusion not observed".into()));
            }
            Ok(())
        }
    }

    fn record(completed: bool) -> TradeRecord {
        TradeRecord {
            depositor: field_to_address(Fp::from_u64(11)),
            amount: 500,
            in_transit: false,
            claimant: None,
            refund_address: field_to_address(Fp::from_u64(11)),
            deposit_block_height: 1,
            expiry_block_height: 10,
            completed,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("barter_pool_{}_{name}.json", std::process::id()))
    }

    fn client(name: &str) -> (PoolClient<MemBackend>, PathBuf) {
        let path = scratch(name);
        let _ = std::fs::remove_file(&path);
        (PoolClient::new(MemBackend::default(), &path), path)
    }

    #[tokio::test]
    async fn completed_slots_are_absent_and_unregistered() {
        let (client, path) = client("completed");
        let key = TradeKey::new("11111111-2222-4333-8444-555555555555");
        client.register_trade(&key).await.unwrap();
        client
            .backend
            .insert(trade_key_field(&key).unwrap(), record(true));

        assert!(client.get_trade(&key).await.unwrap().is_none());

        let active = client.get_active_trades().await.unwrap();
        assert!(active.is_empty());
        assert!(client.tracked_keys().is_empty(), "completed key must be unregistered");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn root_mismatch_is_swallowed_per_key() {
        let (client, path) = client("mismatch");
        let good = TradeKey::new("aaaaaaaa-0000-4000-8000-000000000001");
        let bad = TradeKey::new("bbbbbbbb-0000-4000-8000-000000000002");
        client.register_trade(&good).await.unwrap();
        client.register_trade(&bad).await.unwrap();
        client
            .backend
            .insert(trade_key_field(&good).unwrap(), record(false));
        client
            .backend
            .root_mismatch_keys
            .lock()
            .unwrap()
            .push(trade_key_field(&bad).unwrap());

        let active = client.get_active_trades().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].key, good);
        // Key stays tracked — the mismatch is transient.
        assert_eq!(client.tracked_keys().len(), 2);

        assert!(client.get_trade(&bad).await.unwrap().is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn lock_trade_survives_wait_failure() {
        let (client, path) = client("wait");
        client.backend.wait_failures.store(1, Ordering::SeqCst);
        let key = TradeKey::new("cccccccc-0000-4000-8000-000000000003");
        let tx = client
            .lock_trade(&key, &field_to_address(Fp::from_u64(9)))
            .await
            .unwrap();
        assert_eq!(tx.as_str(), "tx-lockTrade");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn empty_tx_hash_is_an_error() {
        let (client, path) = client("empty");
        client.backend.empty_hash.store(true, Ordering::SeqCst);
        let key = TradeKey::new("dddddddd-0000-4000-8000-000000000004");
        let err = client.emergency_unlock(&key).await.unwrap_err();
        assert!(matches!(err, BarterError::EmptyTxHash { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn malformed_record_is_skipped_in_active_list() {
        let (client, path) = client("malformed");
        let key = TradeKey::new("eeeeeeee-0000-4000-8000-000000000005");
        client.register_trade(&key).await.unwrap();
        let mut bad = record(false);
        bad.in_transit = true; // locked without a claimant: decode garbage
        client.backend.insert(trade_key_field(&key).unwrap(), bad);

        let active = client.get_active_trades().await.unwrap();
        assert!(active.is_empty());
        assert!(client.get_trade(&key).await.is_err());
        let _ = std::fs::remove_file(&path);
    }
}
