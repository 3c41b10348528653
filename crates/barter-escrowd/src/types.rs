use serde::{Deserialize, Serialize};

use barter_core::{L2State, OracleSnapshot, TxHash};

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct StatusWire {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub in_transit: bool,
    #[serde(default)]
    pub origin_address: Option<String>,
    #[serde(default)]
    pub origin: Option<OriginWire>,
    #[serde(default)]
    pub received_amount: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OriginWire {
    #[serde(default)]
    pub origin_address: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub origin_type: Option<String>,
}

impl StatusWire {
    /// Collapse the wire shape into [`L2State`], preferring the top-level
    /// origin and falling back to the nested object.
    pub fn into_state(self) -> L2State {
        let origin_address = self
            .origin_address
            .filter(|s| !s.is_empty())
            .or(self.origin.and_then(|o| o.origin_address));
        L2State {
            verified: self.verified,
            in_transit: self.in_transit,
            origin_address,
            received_amount: self.received_amount,
            status: self.status,
        }
    }
}

// ── /set-in-transit ──────────────────────────────────────────────────────────

/// Wire-stable request body: the `mina_*` / `zec_*` names are carryovers
/// from the deployed daemon and must not be renamed.
#[derive(Debug, Serialize)]
pub(crate) struct SetInTransitBody<'a> {
    pub mina_tx_hash: &'a str,
    pub expected_mina_amount: String,
    pub mina_usd: String,
    pub zec_usd: String,
    pub decimals: u128,
    #[serde(rename = "aggregationTimestamp")]
    pub aggregation_timestamp: i64,
}

impl<'a> SetInTransitBody<'a> {
    pub fn new(l1_tx: &'a TxHash, expected_amount: u64, oracle: &OracleSnapshot) -> Self {
        Self {
            mina_tx_hash: l1_tx.as_str(),
            expected_mina_amount: expected_amount.to_string(),
            mina_usd: oracle.asset_a_usd.to_string(),
            zec_usd: oracle.asset_b_usd.to_string(),
            decimals: oracle.decimals,
            aggregation_timestamp: oracle.aggregation_timestamp,
        }
    }
}

// ── /send-target ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct SendTargetBody<'a> {
    pub target_address: &'a str,
}

// ── /address ─────────────────────────────────────────────────────────────────

/// The daemon's address book. A fresh daemon serves only the unified
/// address (`ua`); a fully scanned one also serves the split forms.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonAddresses {
    #[serde(default)]
    pub ua: Option<String>,
    #[serde(default)]
    pub transparent: Option<String>,
    #[serde(default)]
    pub shielded: Option<String>,
}

impl DaemonAddresses {
    /// True when the payload identifies a real escrow daemon (used by the
    /// port-collision probe).
    pub fn is_daemon_shaped(&self) -> bool {
        self.ua.is_some() || self.transparent.is_some() || self.shielded.is_some()
    }
}
