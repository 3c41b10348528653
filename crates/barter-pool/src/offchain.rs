//! Off-chain map reconstruction.
//!
//! The authoritative root of the trade map is committed on-chain; the values
//! live off-chain and are rebuilt here by replaying the actions the contract
//! emitted. The running root is the same fold settlement commits, so a
//! replayed prefix can be checked against the on-chain commitment.

use std::collections::BTreeMap;

use tracing::debug;

use barter_core::{BarterError, TradeRecord};
use barter_crypto::{
    address::{claimant_to_field, field_to_claimant},
    address_to_field, field_to_address, hash_fields, Fp,
};

use crate::backend::{ActionBlock, ActionEntry};

/// Action tag for a trade-record upsert. Other tags are reserved by the
/// contract and ignored by the reader.
pub const TAG_RECORD_UPSERT: u64 = 1;

/// Field count of a record-upsert entry.
const RECORD_ENTRY_LEN: usize = 10;

// ── Entry codec ──────────────────────────────────────────────────────────────

fn field_u64(f: Fp, what: &str) -> Result<u64, BarterError> {
    f.try_to_u64()
        .ok_or_else(|| BarterError::MalformedAction(format!("{what} out of u64 range")))
}

fn field_bool(f: Fp, what: &str) -> Result<bool, BarterError> {
    match f.try_to_u64() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(BarterError::MalformedAction(format!("{what} is not a flag"))),
    }
}

/// Decode one action entry. `Ok(None)` for entries with a foreign tag.
pub fn decode_record_update(
    entry: &ActionEntry,
) -> Result<Option<(Fp, TradeRecord)>, BarterError> {
    let f = &entry.fields;
    let Some(tag) = f.first().and_then(|t| t.try_to_u64()) else {
        return Err(BarterError::MalformedAction("missing entry tag".into()));
    };
    if tag != TAG_RECORD_UPSERT {
        return Ok(None);
    }
    if f.len() != RECORD_ENTRY_LEN {
        return Err(BarterError::MalformedAction(format!(
            "record entry has {} fields, expected {RECORD_ENTRY_LEN}",
            f.len()
        )));
    }
    let record = TradeRecord {
        depositor: field_to_address(f[2]),
        amount: field_u64(f[3], "amount")?,
        in_transit: field_bool(f[4], "in_transit")?,
        claimant: field_to_claimant(f[5]),
        refund_address: field_to_address(f[6]),
        deposit_block_height: field_u64(f[7], "deposit height")?,
        expiry_block_height: field_u64(f[8], "expiry height")?,
        completed: field_bool(f[9], "completed")?,
    };
    Ok(Some((f[1], record)))
}

/// Encode a record upsert the way the contract emits it.
pub fn encode_record_update(key: Fp, record: &TradeRecord) -> Result<ActionEntry, BarterError> {
    let fields = vec![
        Fp::from_u64(TAG_RECORD_UPSERT),
        key,
        address_to_field(&record.depositor)?,
        Fp::from_u64(record.amount),
        Fp::from_u64(record.in_transit as u64),
        claimant_to_field(record.claimant.as_ref())?,
        address_to_field(&record.refund_address)?,
        Fp::from_u64(record.deposit_block_height),
        Fp::from_u64(record.expiry_block_height),
        Fp::from_u64(record.completed as u64),
    ];
    Ok(ActionEntry { fields })
}

// ── Replayed map ─────────────────────────────────────────────────────────────

/// The trade map as reconstructed from an action stream.
#[derive(Clone, Debug, Default)]
pub struct OffchainMap {
    records: BTreeMap<Fp, TradeRecord>,
    root: Fp,
}

impl OffchainMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running fold over every applied entry (record upserts and foreign
    /// tags alike — the commitment covers the raw stream).
    pub fn root(&self) -> Fp {
        self.root
    }

    pub fn get(&self, key: Fp) -> Option<&TradeRecord> {
        self.records.get(&key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn apply(&mut self, entry: &ActionEntry) -> Result<(), BarterError> {
        self.root = hash_fields(&[self.root, hash_fields(&entry.fields)]);
        match decode_record_update(entry)? {
            Some((key, record)) => {
                self.records.insert(key, record);
            }
            None => debug!("skipping foreign action tag during replay"),
        }
        Ok(())
    }

    pub fn replay(&mut self, blocks: &[ActionBlock]) -> Result<(), BarterError> {
        for block in blocks {
            for per_account in &block.actions {
                for entry in per_account {
                    self.apply(entry)?;
                }
            }
        }
        Ok(())
    }
}
