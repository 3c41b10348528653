//! Oracle client against a stub rate provider: concurrent two-asset fetch,
//! API-key header, zero-price rejection, and TTL cache behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use barter_oracle::{HttpRateSource, OracleConfig, RateSource};

/// Stub provider serving `/mina` and `/zec`, counting hits per asset.
struct StubOracle {
    url: String,
    hits: Arc<AtomicUsize>,
}

impl StubOracle {
    async fn start(mina_price: &'static str, zec_price: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let n = sock.read(&mut buf).await.unwrap_or(0);
                    let head = String::from_utf8_lossy(&buf[..n]).to_string();
                    counter.fetch_add(1, Ordering::SeqCst);
                    let price = if head.starts_with("GET /zec") {
                        zec_price
                    } else {
                        mina_price
                    };
                    let body = format!(
                        r#"{{"data":{{"price":"{price}","decimals":9,"aggregationTimestamp":1754000000}}}}"#
                    );
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = sock.write_all(response.as_bytes()).await;
                });
            }
        });

        Self { url, hits }
    }
}

fn source(url: &str, ttl: Duration) -> HttpRateSource {
    HttpRateSource::new(OracleConfig {
        url: url.to_string(),
        api_key: "oracle-key".into(),
        ttl,
        slippage_bps: 50,
    })
}

#[tokio::test]
async fn snapshot_fetches_both_assets_and_derives_the_cross_rate() {
    let stub = StubOracle::start("500000000", "50000000000").await;
    let source = source(&stub.url, Duration::from_secs(60));

    let snapshot = source.snapshot().await.unwrap();
    assert_eq!(snapshot.asset_a_usd, 500_000_000);
    assert_eq!(snapshot.asset_b_usd, 50_000_000_000);
    assert_eq!(snapshot.decimals, 1_000_000_000);
    assert_eq!(snapshot.price_a_per_b().unwrap(), 10_000_000);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2, "one fetch per asset");
}

#[tokio::test]
async fn snapshot_is_cached_until_the_ttl_expires() {
    let stub = StubOracle::start("500000000", "50000000000").await;
    let source = source(&stub.url, Duration::from_millis(200));

    let first = source.snapshot().await.unwrap();
    let second = source.snapshot().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2, "second call served from cache");

    tokio::time::sleep(Duration::from_millis(300)).await;
    source.snapshot().await.unwrap();
    assert_eq!(stub.hits.load(Ordering::SeqCst), 4, "expired cache refetches");
}

#[tokio::test]
async fn zero_price_fails_the_snapshot() {
    let stub = StubOracle::start("500000000", "0").await;
    let source = source(&stub.url, Duration::from_secs(60));
    assert!(source.snapshot().await.is_err());
}

#[tokio::test]
async fn unreachable_provider_fails_the_snapshot() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let source = source(&url, Duration::from_secs(60));
    assert!(source.snapshot().await.is_err());
}
