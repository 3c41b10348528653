use barter_core::{BarterError, TradeKey};

use crate::field::Fp;

/// Absorb rounds of the sponge permutation.
const ROUNDS: usize = 11;

/// Domain tag keeping this sponge instance apart from other users of the
/// same permutation family.
const SPONGE_DOMAIN: u64 = 0x6261727465723a6b; // "barter:k"

/// Width of one display-key hex chunk, in hex digits (32 bits per chunk).
const KEY_CHUNK_HEX: usize = 8;

fn round_constant(round: usize) -> Fp {
    // Weyl sequence on the golden-ratio increment; fixed for all time so
    // every party derives identical roots.
    Fp::from_u64(0x9e37_79b9_7f4a_7c15).mul(Fp::from_u64(round as u64 + 1))
}

fn permute(mut state: Fp) -> Fp {
    for round in 0..ROUNDS {
        state = state.add(round_constant(round)).pow5();
    }
    state
}

/// Fixed algebraic hash over a sequence of field elements.
///
/// Absorb-permute chain: deterministic, order-sensitive, and cheap enough to
/// fold thousands of action entries per settlement round.
pub fn hash_fields(inputs: &[Fp]) -> Fp {
    let mut state = Fp::from_u64(SPONGE_DOMAIN);
    for input in inputs {
        state = permute(state.add(*input));
    }
    state
}

/// Map a display-form trade key to its on-chain scalar.
///
/// Two accepted shapes:
/// - UUID-like (contains `-`): dashes are stripped, the hex body is split
///   into fixed-width chunks and absorbed through the sponge;
/// - pure hex scalar: parsed directly and returned unchanged.
///
/// The mapping is injective modulo the field order; collisions are not a
/// design concern at this keyspace size.
pub fn trade_key_field(key: &TradeKey) -> Result<Fp, BarterError> {
    let display = key.as_str();
    let invalid = |reason: String| BarterError::InvalidKey {
        key: display.to_string(),
        reason,
    };

    if display.contains('-') {
        let hex: String = display.chars().filter(|c| *c != '-').collect();
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("display form must be dashed hex".into()));
        }
        let mut chunks = Vec::with_capacity(hex.len() / KEY_CHUNK_HEX + 1);
        for chunk in hex.as_bytes().chunks(KEY_CHUNK_HEX) {
            let chunk = std::str::from_utf8(chunk).expect("ascii hex slice");
            let v = u64::from_str_radix(chunk, 16)
                .map_err(|e| invalid(format!("bad hex chunk {chunk:?}: {e}")))?;
            chunks.push(Fp::from_u64(v));
        }
        Ok(hash_fields(&chunks))
    } else {
        Fp::from_hex_str(display).map_err(|e| invalid(e))
    }
}
