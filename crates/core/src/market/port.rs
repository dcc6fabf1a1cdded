use crate::common::{Stock, TimeFrame};
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 返回的 K 线必须按时间升序排列。
/// - 实现必须是 `Send` 和 `Sync`，以便多个标的并发抓取。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取特定证券在指定时间范围内的 K 线数据。
    ///
    /// # Logic
    /// 1. 将 TimeFrame 映射为数据源支持的周期。
    /// 2. 执行网络请求并解析响应数据。
    /// 3. 丢弃字段不完整的 K 线。
    ///
    /// # Arguments
    /// * `stock`: 证券身份。
    /// * `timeframe`: K 线周期。
    /// * `start`: 开始时间。
    /// * `end`: 结束时间。
    ///
    /// # Returns
    /// 成功返回 K 线列表。
    async fn fetch_candles(
        &self,
        stock: &Stock,
        timeframe: TimeFrame,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketError>;
}
