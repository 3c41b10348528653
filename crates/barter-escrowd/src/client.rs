use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use barter_core::{
    BarterError, L2Address, L2State, OracleSnapshot, TradeKey, TxHash, DAEMON_READY_TIMEOUT_MS,
    HTTP_TIMEOUT_MS, PROBE_TIMEOUT_MS,
};

use crate::allocator::PortAllocator;
use crate::types::{DaemonAddresses, SendTargetBody, SetInTransitBody, StatusWire};

/// What the liveness probe learned about a trade's daemon port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// An escrow daemon answered; safe to talk to.
    OurDaemon,
    /// Something answered HTTP but it is not an escrow daemon.
    Foreign,
    /// Nothing is listening (connection refused or timed out).
    Free,
}

#[derive(Clone, Debug)]
pub struct EscrowdConfig {
    /// Scheme + host; the per-trade port is appended per request.
    pub base_url: String,
    /// Bearer token for the authorized daemon endpoints.
    pub operator_token: String,
}

/// Client face of the per-trade daemon REST surface. All calls are
/// single-attempt; retry policy lives in the coordinator.
#[async_trait]
pub trait LocalEscrow: Send + Sync {
    /// `GET /status`: `None` for 404 and other non-2xx; `Err` only when the
    /// daemon is unreachable at the transport level.
    async fn get_status(&self, key: &TradeKey) -> Result<Option<L2State>, BarterError>;

    /// `POST /set-in-transit`. `false` when the daemon rejects the lock —
    /// including an unreachable daemon, which counts as a failed attempt so
    /// a dead daemon still drives the emergency-unlock path.
    async fn set_in_transit(
        &self,
        key: &TradeKey,
        l1_tx: &TxHash,
        expected_amount: u64,
        oracle: &OracleSnapshot,
    ) -> Result<bool, BarterError>;

    /// `POST /send-target`. `false` on any non-2xx.
    async fn send_to_target(&self, key: &TradeKey, target: &L2Address)
        -> Result<bool, BarterError>;

    /// `GET /address`.
    async fn get_addresses(&self, key: &TradeKey)
        -> Result<Option<DaemonAddresses>, BarterError>;

    /// Short-timeout port liveness probe (see [`ProbeOutcome`]).
    async fn probe(&self, key: &TradeKey) -> ProbeOutcome;
}

pub struct EscrowdClient {
    config: EscrowdConfig,
    allocator: Arc<PortAllocator>,
    http: reqwest::Client,
    probe_http: reqwest::Client,
}

impl EscrowdClient {
    pub fn new(config: EscrowdConfig, allocator: Arc<PortAllocator>) -> Self {
        Self {
            config,
            allocator,
            http: reqwest::Client::builder()
                .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
                .build()
                .expect("reqwest client with static config"),
            probe_http: reqwest::Client::builder()
                .timeout(Duration::from_millis(PROBE_TIMEOUT_MS))
                .build()
                .expect("reqwest client with static config"),
        }
    }

    fn url(&self, key: &TradeKey, path: &str) -> Result<String, BarterError> {
        let port = self.allocator.allocate(key)?;
        Ok(format!("{}:{port}{path}", self.config.base_url))
    }

    /// Wait for a freshly spawned daemon to finish its initial scan and
    /// serve `/address`. Bounded by the (long) readiness timeout.
    pub async fn wait_until_ready(
        &self,
        key: &TradeKey,
        timeout: Option<Duration>,
    ) -> Result<DaemonAddresses, BarterError> {
        let deadline = tokio::time::Instant::now()
            + timeout.unwrap_or(Duration::from_millis(DAEMON_READY_TIMEOUT_MS));
        loop {
            if let Ok(Some(addresses)) = self.get_addresses(key).await {
                if addresses.is_daemon_shaped() {
                    return Ok(addresses);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BarterError::Transport(format!(
                    "daemon for {key} did not become ready in time"
                )));
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
}

#[async_trait]
impl LocalEscrow for EscrowdClient {
    async fn get_status(&self, key: &TradeKey) -> Result<Option<L2State>, BarterError> {
        let url = self.url(key, "/status")?;
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BarterError::Transport(format!("{url}: {e}")))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            debug!(key = %key, %status, "daemon status returned non-2xx");
            return Ok(None);
        }
        let wire: StatusWire = resp
            .json()
            .await
            .map_err(|e| BarterError::Transport(format!("{url}: malformed status body: {e}")))?;
        Ok(Some(wire.into_state()))
    }

    async fn set_in_transit(
        &self,
        key: &TradeKey,
        l1_tx: &TxHash,
        expected_amount: u64,
        oracle: &OracleSnapshot,
    ) -> Result<bool, BarterError> {
        let url = self.url(key, "/set-in-transit")?;
        let body = SetInTransitBody::new(l1_tx, expected_amount, oracle);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.operator_token)
            .json(&body)
            .send()
            .await;
        match resp {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                debug!(key = %key, status = %resp.status(), "daemon rejected set-in-transit");
                Ok(false)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "daemon unreachable for set-in-transit");
                Ok(false)
            }
        }
    }

    async fn send_to_target(
        &self,
        key: &TradeKey,
        target: &L2Address,
    ) -> Result<bool, BarterError> {
        let url = self.url(key, "/send-target")?;
        let body = SendTargetBody {
            target_address: target.as_str(),
        };
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.operator_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BarterError::Transport(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            debug!(key = %key, status = %resp.status(), "daemon rejected send-target");
            return Ok(false);
        }
        Ok(true)
    }

    async fn get_addresses(
        &self,
        key: &TradeKey,
    ) -> Result<Option<DaemonAddresses>, BarterError> {
        let url = self.url(key, "/address")?;
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BarterError::Transport(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let addresses: DaemonAddresses = resp
            .json()
            .await
            .map_err(|e| BarterError::Transport(format!("{url}: malformed address body: {e}")))?;
        Ok(Some(addresses))
    }

    async fn probe(&self, key: &TradeKey) -> ProbeOutcome {
        let url = match self.url(key, "/address") {
            Ok(url) => url,
            Err(e) => {
                warn!(key = %key, error = %e, "no port available for probe");
                return ProbeOutcome::Foreign;
            }
        };
        match self.probe_http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<DaemonAddresses>().await {
                    Ok(addresses) if addresses.is_daemon_shaped() => ProbeOutcome::OurDaemon,
                    _ => ProbeOutcome::Foreign,
                }
            }
            // Something answered, but not with a daemon address book.
            Ok(_) => ProbeOutcome::Foreign,
            // Connection refused / timed out: nobody owns the port.
            Err(_) => ProbeOutcome::Free,
        }
    }
}
