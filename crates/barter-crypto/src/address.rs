use barter_core::{BarterError, L1Address};

use crate::field::Fp;

/// Encode a field element as a pool-ledger address: base-58 of the 32-byte
/// little-endian representation. The zero element encodes the empty claimant
/// slot and is mapped to `None` by `field_to_claimant`.
pub fn field_to_address(value: Fp) -> L1Address {
    L1Address::new(bs58::encode(value.to_le_bytes()).into_string())
}

/// Decode a pool-ledger address back into its field element.
pub fn address_to_field(addr: &L1Address) -> Result<Fp, BarterError> {
    let invalid = |reason: String| BarterError::InvalidAddress {
        addr: addr.as_str().to_string(),
        reason,
    };

    let bytes = bs58::decode(addr.as_str())
        .into_vec()
        .map_err(|e| invalid(format!("base58: {e}")))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| invalid(format!("expected 32 bytes, got {}", v.len())))?;
    Fp::from_le_bytes(&bytes).map_err(invalid)
}

/// The claimant slot as stored on-chain: zero means "no claimant".
pub fn field_to_claimant(value: Fp) -> Option<L1Address> {
    if value.is_zero() {
        None
    } else {
        Some(field_to_address(value))
    }
}

/// Inverse of `field_to_claimant`.
pub fn claimant_to_field(claimant: Option<&L1Address>) -> Result<Fp, BarterError> {
    match claimant {
        None => Ok(Fp::ZERO),
        Some(addr) => address_to_field(addr),
    }
}
