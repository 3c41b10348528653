//! Oracle client: USD prices for both swap assets with a TTL cache.

pub mod client;

pub use client::{HttpRateSource, OracleConfig, RateSource};
