//! Environment-variable configuration for the operator process.
//!
//! Required keys fail startup with a precise message; everything else has a
//! documented default. `from_lookup` exists so tests can feed values without
//! mutating process environment.

use std::path::PathBuf;
use std::time::Duration;

use barter_core::{
    BarterError, L1Address, DEFAULT_DAEMON_BASE_URL, DEFAULT_L2_BASE_PORT, DEFAULT_L2_PORT_RANGE,
    DEFAULT_ORACLE_TTL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SETTLEMENT_INTERVAL_MS,
    DEFAULT_SETTLEMENT_MIN_ACTIONS,
};
use barter_escrowd::EscrowdConfig;
use barter_oracle::OracleConfig;
use barter_pool::PoolConfig;
use barter_resolver::ResolverConfig;
use barter_settlement::SettlementConfig;

/// Default per-write transaction fee, smallest units (0.1).
const DEFAULT_TX_FEE: u64 = 100_000_000;

const DEFAULT_TRACKED_KEYS_PATH: &str = "tracked-keys.json";

#[derive(Debug)]
pub struct OperatorConfig {
    pub operator_private_key: String,
    pub pool: PoolConfig,
    pub escrowd: EscrowdConfig,
    pub l2_base_port: u16,
    pub l2_port_range: u16,
    pub oracle: OracleConfig,
    pub resolver: ResolverConfig,
    pub poll_interval: Duration,
    pub settlement: SettlementConfig,
    pub log_level: String,
}

impl OperatorConfig {
    pub fn from_env() -> Result<Self, BarterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BarterError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(BarterError::MissingConfig(key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        Ok(Self {
            operator_private_key: required("OPERATOR_PRIVATE_KEY")?,
            pool: PoolConfig {
                graphql_endpoint: required("L1_GRAPHQL_ENDPOINT")?,
                pool_address: L1Address::new(required("L1_POOL_ADDRESS")?),
                tx_fee: parsed(&lookup, "L1_TX_FEE", DEFAULT_TX_FEE)?,
                tracked_keys_path: PathBuf::from(or_default(
                    "TRACKED_KEYS_PATH",
                    DEFAULT_TRACKED_KEYS_PATH,
                )),
            },
            escrowd: EscrowdConfig {
                base_url: or_default("L2_DAEMON_BASE_URL", DEFAULT_DAEMON_BASE_URL),
                operator_token: required("L2_OPERATOR_TOKEN")?,
            },
            l2_base_port: parsed(&lookup, "L2_BASE_PORT", DEFAULT_L2_BASE_PORT)?,
            l2_port_range: parsed(&lookup, "L2_PORT_RANGE", DEFAULT_L2_PORT_RANGE)?,
            oracle: OracleConfig {
                url: required("ORACLE_URL")?,
                api_key: or_default("ORACLE_KEY", ""),
                ttl: Duration::from_millis(parsed(&lookup, "ORACLE_TTL_MS", DEFAULT_ORACLE_TTL_MS)?),
                slippage_bps: parsed(&lookup, "ORACLE_SLIPPAGE_BPS", 0u32)?,
            },
            resolver: ResolverConfig {
                url: required("RESOLVER_URL")?,
                api_key: required("RESOLVER_KEY")?,
            },
            poll_interval: Duration::from_millis(parsed(
                &lookup,
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            settlement: SettlementConfig {
                interval: Duration::from_millis(parsed(
                    &lookup,
                    "SETTLEMENT_INTERVAL_MS",
                    DEFAULT_SETTLEMENT_INTERVAL_MS,
                )?),
                min_actions: parsed(&lookup, "SETTLEMENT_MIN_ACTIONS", DEFAULT_SETTLEMENT_MIN_ACTIONS)?,
            },
            log_level: validated_log_level(or_default("LOG_LEVEL", "info"))?,
        })
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, BarterError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| BarterError::InvalidConfig {
            key,
            reason: e.to_string(),
        }),
    }
}

fn validated_log_level(level: String) -> Result<String, BarterError> {
    match level.as_str() {
        "debug" | "info" | "warn" | "error" => Ok(level),
        other => Err(BarterError::InvalidConfig {
            key: "LOG_LEVEL",
            reason: format!("unknown level {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("OPERATOR_PRIVATE_KEY", "seed"),
            ("L1_GRAPHQL_ENDPOINT", "http://localhost:3085/graphql"),
            ("L1_POOL_ADDRESS", "B62pool"),
            ("L2_OPERATOR_TOKEN", "token"),
            ("ORACLE_URL", "http://oracle.local/price"),
            ("RESOLVER_URL", "http://kv.local/keypairs"),
            ("RESOLVER_KEY", "kv-key"),
        ])
    }

    fn from_map(map: &HashMap<&'static str, &'static str>) -> Result<OperatorConfig, BarterError> {
        OperatorConfig::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn minimal_env_gets_every_default() {
        let config = from_map(&full_env()).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(15_000));
        assert_eq!(config.settlement.interval, Duration::from_millis(60_000));
        assert_eq!(config.settlement.min_actions, 1);
        assert_eq!(config.oracle.ttl, Duration::from_millis(480_000));
        assert_eq!(config.escrowd.base_url, "http://127.0.0.1");
        assert_eq!(config.l2_base_port, 18_232);
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.pool.tracked_keys_path,
            PathBuf::from("tracked-keys.json")
        );
    }

    #[test]
    fn each_required_key_is_enforced() {
        for missing in [
            "OPERATOR_PRIVATE_KEY",
            "L1_GRAPHQL_ENDPOINT",
            "L1_POOL_ADDRESS",
            "L2_OPERATOR_TOKEN",
            "ORACLE_URL",
            "RESOLVER_URL",
            "RESOLVER_KEY",
        ] {
            let mut env = full_env();
            env.remove(missing);
            let err = from_map(&env).unwrap_err();
            assert!(
                matches!(err, BarterError::MissingConfig(key) if key == missing),
                "expected missing {missing}, got {err}"
            );
        }
    }

    #[test]
    fn overrides_are_parsed() {
        let mut env = full_env();
        env.insert("POLL_INTERVAL_MS", "2500");
        env.insert("SETTLEMENT_MIN_ACTIONS", "4");
        env.insert("L2_BASE_PORT", "20000");
        env.insert("ORACLE_SLIPPAGE_BPS", "75");
        env.insert("LOG_LEVEL", "debug");
        let config = from_map(&env).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(2_500));
        assert_eq!(config.settlement.min_actions, 4);
        assert_eq!(config.l2_base_port, 20_000);
        assert_eq!(config.oracle.slippage_bps, 75);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn garbage_numbers_and_levels_are_rejected() {
        let mut env = full_env();
        env.insert("POLL_INTERVAL_MS", "soon");
        assert!(matches!(
            from_map(&env).unwrap_err(),
            BarterError::InvalidConfig { key: "POLL_INTERVAL_MS", .. }
        ));

        let mut env = full_env();
        env.insert("LOG_LEVEL", "loud");
        assert!(matches!(
            from_map(&env).unwrap_err(),
            BarterError::InvalidConfig { key: "LOG_LEVEL", .. }
        ));
    }
}
