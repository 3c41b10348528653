//! Bidirectional counterparty address resolution against the external
//! key-value store.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use barter_core::{KeypairRecord, L1Address, L2Address, HTTP_TIMEOUT_MS};

/// Lookup of a known counterparty by either of its addresses.
///
/// Absence and errors both come back as `None`: the caller decides whether
/// a miss downgrades (claimant fallback) or defers (sweep retry). Errors are
/// logged here so that decision stays simple.
#[async_trait]
pub trait AddressDirectory: Send + Sync {
    async fn lookup_by_l1(&self, addr: &L1Address) -> Option<KeypairRecord>;
    async fn lookup_by_l2(&self, addr: &L2Address) -> Option<KeypairRecord>;
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub url: String,
    pub api_key: String,
}

/// REST key-value store client with single-row semantics.
pub struct KvDirectory {
    config: ResolverConfig,
    http: reqwest::Client,
}

impl KvDirectory {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
                .build()
                .expect("reqwest client with static config"),
        }
    }

    async fn lookup(&self, column: &str, value: &str) -> Option<KeypairRecord> {
        let url = format!("{}?{column}=eq.{value}&limit=1", self.config.url);
        let resp = match self
            .http
            .get(&url)
            .header("apikey", &self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%column, error = %e, "resolver unreachable");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(%column, status = %resp.status(), "resolver lookup failed");
            return None;
        }
        let rows: Vec<KeypairRecord> = match resp.json().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%column, error = %e, "resolver returned malformed rows");
                return None;
            }
        };
        if rows.is_empty() {
            debug!(%column, %value, "no keypair row");
        }
        rows.into_iter().next()
    }
}

#[async_trait]
impl AddressDirectory for KvDirectory {
    async fn lookup_by_l1(&self, addr: &L1Address) -> Option<KeypairRecord> {
        self.lookup("l1_address", addr.as_str()).await
    }

    async fn lookup_by_l2(&self, addr: &L2Address) -> Option<KeypairRecord> {
        self.lookup("l2_address", addr.as_str()).await
    }
}
