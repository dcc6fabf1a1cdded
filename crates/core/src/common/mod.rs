pub mod time;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// # Summary
/// 证券标的实体，代表系统关注的特定股票或资产。
///
/// # Invariants
/// - `symbol` 必须是合法的交易代码。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    // 股票代码 (例如: AAPL, MSFT)
    pub symbol: String,
}

impl Stock {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

/// # Summary
/// K 线时间周期枚举。
///
/// # Invariants
/// - 序列化形式与 `Display` 一致 (如 `"4h"`, `"1d"`)，状态文件与配置文件均使用该形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrame {
    // 1分钟
    Minute1,
    // 5分钟
    Minute5,
    // 1小时
    Hour1,
    // 4小时
    Hour4,
    // 1日
    Day1,
}

impl TimeFrame {
    /// # Summary
    /// 周期跨度 (秒)。
    pub fn seconds(&self) -> i64 {
        match self {
            TimeFrame::Minute1 => 60,
            TimeFrame::Minute5 => 300,
            TimeFrame::Hour1 => 3_600,
            TimeFrame::Hour4 => 14_400,
            TimeFrame::Day1 => 86_400,
        }
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "minute1" => Ok(TimeFrame::Minute1),
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "1h" | "60m" | "hour1" => Ok(TimeFrame::Hour1),
            "4h" | "hour4" => Ok(TimeFrame::Hour4),
            "1d" | "day1" => Ok(TimeFrame::Day1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute1 => write!(f, "1m"),
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Hour1 => write!(f, "1h"),
            TimeFrame::Hour4 => write!(f, "4h"),
            TimeFrame::Day1 => write!(f, "1d"),
        }
    }
}

impl Serialize for TimeFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeFrame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
