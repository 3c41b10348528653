use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use barter_core::{BarterError, L1Address};

use crate::address::field_to_address;
use crate::field::Fp;
use primitive_types::U256;

/// The operator identity: signs every pool mutation the coordinator and the
/// settlement worker submit.
///
/// Process-global and read-only after startup; a single operator key owns
/// the pool. The seed is parsed from `OPERATOR_PRIVATE_KEY` in base-58 or
/// hex and wiped from intermediate buffers.
pub struct OperatorKey {
    signing: SigningKey,
}

impl OperatorKey {
    /// Parse a 32-byte signing seed, base-58 or hex encoded.
    pub fn from_encoded(encoded: &str) -> Result<Self, BarterError> {
        let bytes = Zeroizing::new(decode_seed(encoded)?);
        let seed: &[u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| BarterError::Signature(format!(
                "operator seed must be 32 bytes, got {}",
                bytes.len()
            )))?;
        Ok(Self {
            signing: SigningKey::from_bytes(seed),
        })
    }

    /// Generate a fresh operator keypair (used by the `keygen` subcommand).
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// The operator's pool-facing address, derived from the verifying key
    /// reduced into the ledger field.
    pub fn address(&self) -> L1Address {
        let pk = self.signing.verifying_key();
        let reduced = Fp::from_u256(U256::from_little_endian(pk.as_bytes()));
        field_to_address(reduced)
    }

    /// Sign a canonical command payload; hex-encoded detached signature.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.signing.sign(payload).to_bytes())
    }

    /// Base-58 seed export for `keygen` output.
    pub fn seed_base58(&self) -> String {
        bs58::encode(self.signing.to_bytes()).into_string()
    }
}

fn decode_seed(encoded: &str) -> Result<Vec<u8>, BarterError> {
    let trimmed = encoded.trim();
    if let Some(hex_body) = trimmed.strip_prefix("0x") {
        return hex::decode(hex_body).map_err(|e| BarterError::Signature(format!("hex seed: {e}")));
    }
    // Try base-58 first (the printed keygen form), fall back to bare hex.
    if let Ok(bytes) = bs58::decode(trimmed).into_vec() {
        if bytes.len() == 32 {
            return Ok(bytes);
        }
    }
    hex::decode(trimmed).map_err(|e| BarterError::Signature(format!("seed: {e}")))
}

impl std::fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OperatorKey {{ address: {} }}", self.address())
    }
}
