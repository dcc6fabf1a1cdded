use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
}

/// # Summary
/// 附带快慢均线的单根 K 线，是信号分类器的输入。
///
/// # Invariants
/// - 仅在慢均线窗口填满之后才会生成，三个数值字段均应为有限值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBar {
    // K 线时间索引
    pub time: DateTime<Utc>,
    // 收盘价
    pub close: f64,
    // 快均线 (SMA50)
    pub fast_avg: f64,
    // 慢均线 (SMA128)
    pub slow_avg: f64,
}
