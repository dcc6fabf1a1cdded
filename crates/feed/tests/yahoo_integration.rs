use chrono::{Duration, Utc};
use plotin_core::common::{Stock, TimeFrame};
use plotin_core::market::port::MarketDataProvider;
use plotin_feed::yahoo::YahooProvider;

fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// # Summary
/// 雅虎财经日线抓取的集成测试 (需要网络)。
///
/// # Logic
/// 1. 初始化 YahooProvider。
/// 2. 抓取 AAPL 过去 30 天的日线数据。
/// 3. 断言数据非空且按时间升序。
#[tokio::test]
#[ignore]
async fn test_yahoo_real_fetch_daily() {
    install_crypto_provider();
    let provider = YahooProvider::new().unwrap();
    let end = Utc::now();
    let start = end - Duration::days(30);

    let candles = provider
        .fetch_candles(&Stock::new("AAPL"), TimeFrame::Day1, start, end)
        .await
        .unwrap();

    assert!(!candles.is_empty(), "Candles list should not be empty");
    assert!(candles.windows(2).all(|w| w[0].time < w[1].time));
}

/// # Summary
/// 4 小时周期由小时线聚合，所有 K 线起点都落在 4 小时边界上 (需要网络)。
#[tokio::test]
#[ignore]
async fn test_yahoo_real_fetch_four_hour() {
    install_crypto_provider();
    let provider = YahooProvider::new().unwrap();
    let end = Utc::now();
    let start = end - Duration::days(20);

    let candles = provider
        .fetch_candles(&Stock::new("MSFT"), TimeFrame::Hour4, start, end)
        .await
        .unwrap();

    assert!(!candles.is_empty());
    assert!(candles.iter().all(|c| c.time.timestamp() % 14_400 == 0));
}
