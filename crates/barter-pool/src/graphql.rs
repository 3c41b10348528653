use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use barter_core::{BarterError, L1Address, TradeRecord, TxHash};
use barter_crypto::{address_to_field, Fp, OperatorKey};

use crate::backend::{
    ActionBlock, ActionEntry, L1Backend, OperatorAccount, PoolAccount, PoolOperation,
};
use crate::offchain::OffchainMap;
use crate::proof::operation_commitment;

/// Operation tags carried in the command argument vector.
const OP_LOCK_TRADE: u64 = 1;
const OP_EMERGENCY_UNLOCK: u64 = 2;
const OP_SETTLE: u64 = 3;

/// Inclusion-wait polling: best effort, bounded.
const WAIT_ATTEMPTS: u32 = 12;
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Ledger identity captured once at connect time. Immutable afterwards, so
/// concurrent readers take it without a lock.
#[derive(Debug, Clone)]
struct LedgerHandle {
    chain_id: String,
}

/// GraphQL implementation of [`L1Backend`].
///
/// Every write follows the proof-carrying submission discipline: fetch the
/// pool account, fetch the operator account, build the operation, prove it
/// against the observed root, sign with the operator key, submit.
pub struct GraphqlBackend {
    endpoint: String,
    pool_address: L1Address,
    operator: Arc<OperatorKey>,
    fee: u64,
    http: reqwest::Client,
    handle: OnceCell<LedgerHandle>,
}

impl GraphqlBackend {
    pub fn new(
        endpoint: impl Into<String>,
        pool_address: L1Address,
        operator: Arc<OperatorKey>,
        fee: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            pool_address,
            operator,
            fee,
            http: reqwest::Client::builder()
                .timeout(Duration::from_millis(barter_core::HTTP_TIMEOUT_MS))
                .build()
                .expect("reqwest client with static config"),
            handle: OnceCell::new(),
        }
    }

    /// POST one GraphQL document and return its `data` payload.
    async fn query(&self, document: &str, variables: Value) -> Result<Value, BarterError> {
        let body = json!({ "query": document, "variables": variables });
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| BarterError::Transport(format!("{}: {e}", self.endpoint)))?;
        let status = resp.status();
        let payload: Value = resp
            .json()
            .await
            .map_err(|e| BarterError::Rpc(format!("non-JSON response ({status}): {e}")))?;
        if let Some(errors) = payload.get("errors").filter(|e| !e.is_null()) {
            return Err(BarterError::Rpc(format!("graphql errors: {errors}")));
        }
        payload
            .get("data")
            .cloned()
            .ok_or_else(|| BarterError::Rpc("response without data".into()))
    }

    async fn account(&self, public_key: &L1Address) -> Result<Value, BarterError> {
        let data = self
            .query(
                r#"query Account($publicKey: String!) {
                    account(publicKey: $publicKey) {
                        balance { total }
                        nonce
                        zkappState
                        actionState
                    }
                }"#,
                json!({ "publicKey": public_key.as_str() }),
            )
            .await?;
        let account = data
            .get("account")
            .filter(|a| !a.is_null())
            .cloned()
            .ok_or_else(|| BarterError::Rpc(format!("no account for {public_key}")))?;
        Ok(account)
    }

    /// Full action stream replayed into the trade map, with the settled
    /// prefix checked against the on-chain commitment.
    async fn replayed_map(&self) -> Result<OffchainMap, BarterError> {
        let pool = self.pool_account().await?;
        let blocks = self.fetch_actions(Fp::ZERO).await?;

        let settled_len = if pool.settled_action_state.is_zero() {
            0
        } else {
            match blocks
                .iter()
                .position(|b| b.action_state == pool.settled_action_state)
            {
                Some(i) => i + 1,
                None => {
                    return Err(BarterError::RootMismatch {
                        key: self.pool_address.to_string(),
                    })
                }
            }
        };

        let mut map = OffchainMap::new();
        map.replay(&blocks[..settled_len])?;
        if map.root() != pool.offchain_root {
            return Err(BarterError::RootMismatch {
                key: self.pool_address.to_string(),
            });
        }
        // Pending suffix: emitted but not yet settled, still visible to reads.
        map.replay(&blocks[settled_len..])?;
        Ok(map)
    }

    fn op_fields(op: &PoolOperation) -> Result<Vec<Fp>, BarterError> {
        Ok(match op {
            PoolOperation::LockTrade { key, claimant } => vec![
                Fp::from_u64(OP_LOCK_TRADE),
                *key,
                address_to_field(claimant)?,
            ],
            PoolOperation::EmergencyUnlock { key } => {
                vec![Fp::from_u64(OP_EMERGENCY_UNLOCK), *key]
            }
            PoolOperation::Settle { proof } => vec![
                Fp::from_u64(OP_SETTLE),
                proof.prior_root,
                proof.new_root,
                proof.prior_action_state,
                proof.new_action_state,
                Fp::from_u64(proof.action_count as u64),
            ],
        })
    }
}

#[async_trait]
impl L1Backend for GraphqlBackend {
    async fn connect(&self) -> Result<(), BarterError> {
        if let Some(handle) = self.handle.get() {
            debug!(chain_id = %handle.chain_id, "ledger endpoint already connected");
            return Ok(());
        }
        let data = self
            .query(
                r#"query Handshake { syncStatus daemonStatus { chainId } }"#,
                json!({}),
            )
            .await?;
        let chain_id = data["daemonStatus"]["chainId"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();
        let sync = data["syncStatus"].as_str().unwrap_or("UNKNOWN");
        if sync != "SYNCED" {
            warn!(%sync, "ledger endpoint is not fully synced");
        }
        info!(endpoint = %self.endpoint, %chain_id, "connected to ledger endpoint");
        let _ = self.handle.set(LedgerHandle { chain_id });
        Ok(())
    }

    async fn fetch_record(&self, key: Fp) -> Result<Option<TradeRecord>, BarterError> {
        let map = self.replayed_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn pool_account(&self) -> Result<PoolAccount, BarterError> {
        let account = self.account(&self.pool_address).await?;
        let app_state = field_list(&account, "zkappState")?;
        if app_state.len() < 2 {
            return Err(BarterError::Rpc(format!(
                "pool app state has {} slots, expected at least 2",
                app_state.len()
            )));
        }
        let action_states = field_list(&account, "actionState")?;
        Ok(PoolAccount {
            balance: u64_field(&account["balance"]["total"], "pool balance")?,
            nonce: u64_field(&account["nonce"], "pool nonce")? as u32,
            offchain_root: app_state[0],
            settled_action_state: app_state[1],
            action_state: action_states.first().copied().unwrap_or(Fp::ZERO),
        })
    }

    async fn operator_account(&self) -> Result<OperatorAccount, BarterError> {
        let account = self.account(&self.operator.address()).await?;
        Ok(OperatorAccount {
            nonce: u64_field(&account["nonce"], "operator nonce")? as u32,
            balance: u64_field(&account["balance"]["total"], "operator balance")?,
        })
    }

    async fn fetch_actions(&self, since: Fp) -> Result<Vec<ActionBlock>, BarterError> {
        let from = if since.is_zero() {
            Value::Null
        } else {
            Value::String(since.to_dec_string())
        };
        let data = self
            .query(
                r#"query Actions($address: String!, $from: String) {
                    actions(input: { address: $address, fromActionState: $from }) {
                        blockInfo { height }
                        actionState { actionStateOne }
                        actionData { accountUpdateId actions }
                    }
                }"#,
                json!({ "address": self.pool_address.as_str(), "from": from }),
            )
            .await?;
        let raw_blocks = data["actions"]
            .as_array()
            .ok_or_else(|| BarterError::Rpc("actions response is not a list".into()))?;

        let mut blocks = Vec::with_capacity(raw_blocks.len());
        for raw in raw_blocks {
            let mut actions = Vec::new();
            for update in raw["actionData"].as_array().unwrap_or(&Vec::new()) {
                let mut entries = Vec::new();
                for entry in update["actions"].as_array().unwrap_or(&Vec::new()) {
                    let fields = entry
                        .as_array()
                        .ok_or_else(|| BarterError::MalformedAction("action entry is not a list".into()))?
                        .iter()
                        .map(|f| parse_field(f, "action field"))
                        .collect::<Result<Vec<_>, _>>()?;
                    entries.push(ActionEntry { fields });
                }
                actions.push(entries);
            }
            blocks.push(ActionBlock {
                block_height: u64_field(&raw["blockInfo"]["height"], "block height")?,
                action_state: parse_field(&raw["actionState"]["actionStateOne"], "action state")?,
                actions,
            });
        }
        Ok(blocks)
    }

    async fn submit(&self, op: PoolOperation) -> Result<TxHash, BarterError> {
        let pool = self.pool_account().await?;
        let operator = self.operator_account().await?;

        let fields = Self::op_fields(&op)?;
        let commitment = operation_commitment(&fields, pool.offchain_root);

        // Canonical signing payload: fixed field order, no JSON ambiguity.
        let payload = format!(
            "{}|{}|{}|{}|{}",
            op.name(),
            self.pool_address,
            operator.nonce,
            self.fee,
            commitment.to_dec_string(),
        );
        let signature = self.operator.sign(payload.as_bytes());

        let arguments: Vec<String> = fields.iter().map(|f| f.to_dec_string()).collect();
        let data = self
            .query(
                r#"mutation SendPoolCommand($input: PoolCommandInput!) {
                    sendPoolCommand(input: $input) { command { hash } }
                }"#,
                json!({
                    "input": {
                        "poolAddress": self.pool_address.as_str(),
                        "operation": op.name(),
                        "arguments": arguments,
                        "nonce": operator.nonce,
                        "fee": self.fee.to_string(),
                        "proof": commitment.to_dec_string(),
                        "signature": signature,
                    }
                }),
            )
            .await
            .map_err(|e| match e {
                BarterError::Rpc(reason) => BarterError::SubmitRejected {
                    operation: op.name().to_string(),
                    reason,
                },
                other => other,
            })?;

        let hash = data["sendPoolCommand"]["command"]["hash"]
            .as_str()
            .unwrap_or_default();
        if hash.is_empty() {
            return Err(BarterError::EmptyTxHash {
                operation: op.name().to_string(),
            });
        }
        debug!(operation = op.name(), tx = %hash, "pool command submitted");
        Ok(TxHash::new(hash))
    }

    async fn wait(&self, tx: &TxHash) -> Result<(), BarterError> {
        for _ in 0..WAIT_ATTEMPTS {
            let data = self
                .query(
                    r#"query TxStatus($hash: String!) {
                        transactionStatus(zkappTransaction: $hash)
                    }"#,
                    json!({ "hash": tx.as_str() }),
                )
                .await?;
            match data["transactionStatus"].as_str() {
                Some("INCLUDED") => return Ok(()),
                Some(other) => debug!(tx = %tx, status = other, "awaiting inclusion"),
                None => debug!(tx = %tx, "transaction status unavailable"),
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
        Err(BarterError::Rpc(format!(
            "transaction {tx} not observed as included"
        )))
    }
}

// ── Response parsing helpers ─────────────────────────────────────────────────

fn parse_field(v: &Value, what: &str) -> Result<Fp, BarterError> {
    let s = v
        .as_str()
        .ok_or_else(|| BarterError::Rpc(format!("{what} is not a string")))?;
    Fp::from_dec_str(s).map_err(|e| BarterError::Rpc(format!("{what}: {e}")))
}

fn field_list(account: &Value, key: &str) -> Result<Vec<Fp>, BarterError> {
    account[key]
        .as_array()
        .ok_or_else(|| BarterError::Rpc(format!("{key} is not a list")))?
        .iter()
        .map(|v| parse_field(v, key))
        .collect()
}

/// Ledger numerics arrive as strings or bare numbers depending on the field.
fn u64_field(v: &Value, what: &str) -> Result<u64, BarterError> {
    if let Some(n) = v.as_u64() {
        return Ok(n);
    }
    v.as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| BarterError::Rpc(format!("{what} is not an integer")))
}
