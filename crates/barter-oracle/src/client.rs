use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use barter_core::{BarterError, OracleSnapshot, HTTP_TIMEOUT_MS};

/// Wire-stable asset identifiers on the rate provider.
const NATIVE_ASSET: &str = "mina";
const TARGET_ASSET: &str = "zec";

/// Source of priced snapshots. The coordinator treats any error here as
/// "no lock this cycle" — pricing failures never mutate state.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn snapshot(&self) -> Result<OracleSnapshot, BarterError>;
}

#[derive(Clone, Debug)]
pub struct OracleConfig {
    pub url: String,
    pub api_key: String,
    pub ttl: Duration,
    pub slippage_bps: u32,
}

/// One asset's price from the aggregation endpoint.
#[derive(Debug, Deserialize)]
struct PriceWire {
    price: String,
    /// Fixed-point digit count (scale is `10^decimals`).
    decimals: u32,
    #[serde(rename = "aggregationTimestamp")]
    aggregation_timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct PriceEnvelope {
    data: PriceWire,
}

/// HTTP rate source with a TTL cache. Both prices are fetched concurrently;
/// a snapshot with a missing or zero price is rejected outright.
pub struct HttpRateSource {
    config: OracleConfig,
    http: reqwest::Client,
    cache: Mutex<Option<(Instant, OracleSnapshot)>>,
}

impl HttpRateSource {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
                .build()
                .expect("reqwest client with static config"),
            cache: Mutex::new(None),
        }
    }

    pub fn slippage_bps(&self) -> u32 {
        self.config.slippage_bps
    }

    async fn fetch_price(&self, asset: &str) -> Result<PriceWire, BarterError> {
        let url = format!("{}/{asset}", self.config.url);
        let resp = self
            .http
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| BarterError::Transport(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(BarterError::PriceUnavailable {
                asset: asset.to_string(),
            });
        }
        let envelope: PriceEnvelope = resp.json().await.map_err(|_| {
            BarterError::PriceUnavailable {
                asset: asset.to_string(),
            }
        })?;
        Ok(envelope.data)
    }

    async fn fetch_snapshot(&self) -> Result<OracleSnapshot, BarterError> {
        let (native, target) = tokio::join!(
            self.fetch_price(NATIVE_ASSET),
            self.fetch_price(TARGET_ASSET)
        );
        let (native, target) = (native?, target?);

        // Normalize both prices to the larger scale.
        let digits = native.decimals.max(target.decimals);
        let asset_a_usd = scaled_price(&native, digits, NATIVE_ASSET)?;
        let asset_b_usd = scaled_price(&target, digits, TARGET_ASSET)?;
        let snapshot = OracleSnapshot {
            asset_a_usd,
            asset_b_usd,
            decimals: 10u128.pow(digits),
            aggregation_timestamp: native
                .aggregation_timestamp
                .min(target.aggregation_timestamp),
        };
        // Reject degenerate cross-rates before anyone prices a lock on them.
        snapshot.price_a_per_b()?;
        snapshot.price_b_per_a()?;

        let age_secs = chrono::Utc::now().timestamp() - snapshot.aggregation_timestamp;
        if age_secs > 3_600 {
            warn!(age_secs, "oracle aggregation round is stale");
        }
        Ok(snapshot)
    }
}

fn scaled_price(wire: &PriceWire, digits: u32, asset: &str) -> Result<u128, BarterError> {
    let unavailable = || BarterError::PriceUnavailable {
        asset: asset.to_string(),
    };
    let raw: u128 = wire.price.parse().map_err(|_| unavailable())?;
    if raw == 0 {
        return Err(unavailable());
    }
    let shift = digits - wire.decimals;
    raw.checked_mul(10u128.pow(shift)).ok_or_else(unavailable)
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn snapshot(&self) -> Result<OracleSnapshot, BarterError> {
        let mut cache = self.cache.lock().await;
        if let Some((fetched_at, snapshot)) = cache.as_ref() {
            if fetched_at.elapsed() < self.config.ttl {
                debug!("serving cached oracle snapshot");
                return Ok(snapshot.clone());
            }
        }
        let snapshot = self.fetch_snapshot().await?;
        *cache = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }
}
