use serde::{Deserialize, Serialize};

use crate::error::BarterError;

/// Fixed-point USD prices for both assets, taken from one oracle aggregation
/// round. `decimals` is the common scale factor (e.g. `1_000_000_000` for
/// 9-decimal fixed point).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    /// Native pool asset, USD.
    pub asset_a_usd: u128,
    /// Target asset, USD.
    pub asset_b_usd: u128,
    pub decimals: u128,
    #[serde(rename = "aggregationTimestamp")]
    pub aggregation_timestamp: i64,
}

impl OracleSnapshot {
    /// Scaled cross-rate: how much of asset B one unit of asset A buys,
    /// times `decimals`. Integer division; a zero result is rejected.
    pub fn price_a_per_b(&self) -> Result<u128, BarterError> {
        Self::cross(self.asset_a_usd, self.decimals, self.asset_b_usd)
    }

    /// Reciprocal cross-rate, same scaling.
    pub fn price_b_per_a(&self) -> Result<u128, BarterError> {
        Self::cross(self.asset_b_usd, self.decimals, self.asset_a_usd)
    }

    /// Expected L2-side amount for an L1-side `amount`, in smallest units.
    pub fn l2_equivalent(&self, amount: u64) -> Result<u128, BarterError> {
        let rate = self.price_a_per_b()?;
        let value = amount as u128 * rate / self.decimals;
        if value == 0 {
            return Err(BarterError::NonPositivePrice {
                numerator: amount as u128 * rate,
                denominator: self.decimals,
            });
        }
        Ok(value)
    }

    fn cross(numerator: u128, scale: u128, denominator: u128) -> Result<u128, BarterError> {
        if denominator == 0 {
            return Err(BarterError::NonPositivePrice {
                numerator,
                denominator,
            });
        }
        let price = numerator
            .checked_mul(scale)
            .ok_or(BarterError::NonPositivePrice {
                numerator,
                denominator,
            })?
            / denominator;
        if price == 0 {
            return Err(BarterError::NonPositivePrice {
                numerator,
                denominator,
            });
        }
        Ok(price)
    }
}

/// Floor of `value` after allowing `slippage_bps` basis points of movement.
/// Used as the sanity bound on the L2-equivalent before the daemon is asked
/// to lock.
pub fn apply_slippage_floor(value: u128, slippage_bps: u32) -> u128 {
    let bps = slippage_bps.min(10_000) as u128;
    value * (10_000 - bps) / 10_000
}
