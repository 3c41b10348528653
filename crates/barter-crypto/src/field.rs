use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modulus of the ledger's prime field (255 bits), little-endian limbs.
const MODULUS_LIMBS: [u64; 4] = [
    0x992d30ed00000001,
    0x224698fc094cf91b,
    0x0000000000000000,
    0x4000000000000000,
];

/// An element of the ledger's prime field.
///
/// On-chain storage, action payloads and proofs all speak field elements;
/// this wrapper keeps every value reduced so arithmetic never leaves the
/// field. Serialized as the canonical decimal string the ledger RPC uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Fp(U256);

impl Fp {
    pub const ZERO: Fp = Fp(U256::zero());

    pub fn modulus() -> U256 {
        U256(MODULUS_LIMBS)
    }

    pub fn from_u64(v: u64) -> Self {
        Fp(U256::from(v))
    }

    pub fn from_u128(v: u128) -> Self {
        Fp(U256::from(v))
    }

    /// Reduce an arbitrary 256-bit value into the field.
    pub fn from_u256(v: U256) -> Self {
        Fp(v % Self::modulus())
    }

    /// Parse a decimal field-element string (the ledger RPC wire form).
    pub fn from_dec_str(s: &str) -> Result<Self, String> {
        let v = U256::from_dec_str(s).map_err(|e| format!("not a decimal field element: {e}"))?;
        if v >= Self::modulus() {
            return Err("value exceeds the field modulus".into());
        }
        Ok(Fp(v))
    }

    /// Parse a hex field-element string, with or without a `0x` prefix.
    /// Values at or above the modulus are rejected rather than reduced, so
    /// the mapping stays injective.
    pub fn from_hex_str(s: &str) -> Result<Self, String> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.is_empty() || s.len() > 64 {
            return Err(format!("hex field element must be 1..=64 digits, got {}", s.len()));
        }
        let v = U256::from_str_radix(s, 16).map_err(|e| format!("not hex: {e}"))?;
        if v >= Self::modulus() {
            return Err("value exceeds the field modulus".into());
        }
        Ok(Fp(v))
    }

    pub fn from_le_bytes(bytes: &[u8; 32]) -> Result<Self, String> {
        let v = U256::from_little_endian(bytes);
        if v >= Self::modulus() {
            return Err("value exceeds the field modulus".into());
        }
        Ok(Fp(v))
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (chunk, limb) in out.chunks_exact_mut(8).zip(self.0 .0.iter()) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    /// Canonical decimal wire form.
    pub fn to_dec_string(self) -> String {
        self.0.to_string()
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Narrow back to a machine integer; `None` when the value does not fit.
    pub fn try_to_u64(self) -> Option<u64> {
        if self.0.bits() <= 64 {
            Some(self.0.low_u64())
        } else {
            None
        }
    }

    pub fn add(self, rhs: Fp) -> Fp {
        // Both operands are reduced (< 2^255), so the sum cannot wrap 2^256.
        let sum = self.0 + rhs.0;
        let m = Self::modulus();
        Fp(if sum >= m { sum - m } else { sum })
    }

    pub fn mul(self, rhs: Fp) -> Fp {
        let wide: U512 = self.0.full_mul(rhs.0);
        let reduced = wide % U512::from(Self::modulus());
        // Reduced below a 256-bit modulus: the high limbs are zero.
        let limbs = reduced.0;
        Fp(U256([limbs[0], limbs[1], limbs[2], limbs[3]]))
    }

    /// x^5 — the field's S-box exponent (coprime to the group order).
    pub fn pow5(self) -> Fp {
        let x2 = self.mul(self);
        let x4 = x2.mul(x2);
        x4.mul(self)
    }
}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp({})", self.0)
    }
}

impl Serialize for Fp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dec_string())
    }
}

impl<'de> Deserialize<'de> for Fp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fp::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}
