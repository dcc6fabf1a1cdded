use crate::resample::resample;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use plotin_core::common::{Stock, TimeFrame};
use plotin_core::market::entity::Candle;
use plotin_core::market::error::MarketError;
use plotin_core::market::port::MarketDataProvider;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// # Summary
/// Yahoo Finance 行情提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - Yahoo 没有原生 4 小时周期，4h 由 60m 数据聚合得到。
#[derive(Clone)]
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 配置 10 秒超时。
    /// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Returns
    /// 成功返回 YahooProvider，客户端构建失败返回 `MarketError::Network`。
    pub fn new() -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Yahoo 请求所用的 interval，以及是否需要聚合到目标周期。
fn yahoo_interval(timeframe: TimeFrame) -> (&'static str, bool) {
    match timeframe {
        TimeFrame::Minute1 => ("1m", false),
        TimeFrame::Minute5 => ("5m", false),
        TimeFrame::Hour1 => ("60m", false),
        TimeFrame::Hour4 => ("60m", true),
        TimeFrame::Day1 => ("1d", false),
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

/// # Summary
/// Yahoo API 图表数据部分。
#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

/// # Summary
/// Yahoo API 错误详情。
#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

/// # Summary
/// Yahoo API 单个时间序列结果。
#[derive(Deserialize, Debug)]
struct YahooResult {
    // 无成交的区间 Yahoo 会省略 timestamp 字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

/// # Summary
/// Yahoo API 指标容器。
#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// # Summary
/// Yahoo API 原始报价数据。
#[derive(Deserialize, Debug)]
struct YahooQuote {
    /// 开盘价列表
    #[serde(default)]
    open: Vec<Option<f64>>,
    /// 最高价列表
    #[serde(default)]
    high: Vec<Option<f64>>,
    /// 最低价列表
    #[serde(default)]
    low: Vec<Option<f64>>,
    /// 收盘价列表
    #[serde(default)]
    close: Vec<Option<f64>>,
    /// 成交量列表
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 将 Yahoo 图表响应转换为 K 线列表。
///
/// # Logic
/// 1. 优先返回接口携带的错误描述。
/// 2. 按下标对齐 timestamp 与 OHLC，跳过任一价格缺失的 K 线；成交量缺失按 0 计。
fn parse_chart(json: YahooResponse) -> Result<Vec<Candle>, MarketError> {
    if let Some(err) = json.chart.error {
        return Err(MarketError::Unknown(err.description));
    }

    let result = json
        .chart
        .result
        .ok_or(MarketError::NotFound)?
        .pop()
        .ok_or(MarketError::NotFound)?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or(MarketError::Parse("No quote data".into()))?;

    let mut candles = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(o), Some(h), Some(l), Some(c)) = (
            quote.open.get(i).and_then(|x| *x),
            quote.high.get(i).and_then(|x| *x),
            quote.low.get(i).and_then(|x| *x),
            quote.close.get(i).and_then(|x| *x),
        ) else {
            continue;
        };
        let Some(time) = Utc.timestamp_opt(ts, 0).single() else {
            continue;
        };

        candles.push(Candle {
            time,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: quote.volume.get(i).and_then(|x| *x).unwrap_or(0.0),
        });
    }

    Ok(candles)
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取 K 线历史数据。
    ///
    /// # Logic
    /// 1. 映射 TimeFrame 周期为 Yahoo 识别的 interval。
    /// 2. 构建包含 period1, period2 的 API URL。
    /// 3. 发起异步请求并解析嵌套的 JSON 数据。
    /// 4. 4h 周期将 60m 数据按 UTC 4 小时桶聚合。
    ///
    /// # Arguments
    /// * `stock`: 证券实体。
    /// * `timeframe`: 周期。
    /// * `start`: 开始时间。
    /// * `end`: 结束时间。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_candles(
        &self,
        stock: &Stock,
        timeframe: TimeFrame,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketError> {
        let symbol = &stock.symbol;
        let (interval, needs_resample) = yahoo_interval(timeframe);
        info!(
            "Retrieving {} data for {} from {} to {}",
            timeframe,
            symbol,
            start.date_naive(),
            end.date_naive()
        );

        let resp = self
            .client
            .get(format!("{}/{}", CHART_URL, symbol))
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", interval.to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        let json: YahooResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let candles = parse_chart(json)?;
        let candles = if needs_resample {
            resample(&candles, timeframe.seconds())
        } else {
            candles
        };
        debug!("Retrieved {} {} candles for {}", candles.len(), timeframe, symbol);
        Ok(candles)
    }
}
