use serde::{Deserialize, Serialize};
use std::fmt;

// ── TradeKey ─────────────────────────────────────────────────────────────────

/// Stable cross-chain trade identifier, display form.
///
/// This is the UUID-like string used as the local map key and as the port
/// allocator key. The on-chain scalar form is derived deterministically in
/// `barter-crypto::trade_key_field`; a pure hex string already in field range
/// passes through that mapping unchanged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeKey(String);

impl TradeKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "TradeKey({head}…)")
    }
}

// ── Addresses ────────────────────────────────────────────────────────────────

/// Address on the programmable ledger (base-58 of the 32-byte field repr).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct L1Address(String);

impl L1Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for L1Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for L1Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L1Address({})", self.0)
    }
}

/// Address on the value-transfer ledger, as handed out by the local daemon.
/// Opaque to the operator: transparent, shielded and unified forms all pass
/// through unmodified.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct L2Address(String);

impl L2Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for L2Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for L2Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L2Address({})", self.0)
    }
}

// ── TxHash ───────────────────────────────────────────────────────────────────

/// Ledger transaction id as returned by the submission endpoint. Write paths
/// must never treat an empty hash as success.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.0.get(..12).unwrap_or(&self.0);
        write!(f, "TxHash({head}…)")
    }
}

// ── KeypairRecord ────────────────────────────────────────────────────────────

/// One row of the external address-mapping store: a counterparty known on
/// both ledgers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeypairRecord {
    pub l1_address: L1Address,
    pub l2_address: L2Address,
}
