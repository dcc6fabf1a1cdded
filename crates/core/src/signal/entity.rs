use crate::common::TimeFrame;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 状态存储中跨周期共振记录使用的键名。
pub const ALIGNMENT_KEY: &str = "alignment";

/// # Summary
/// 信号状态分类。
///
/// # Invariants
/// - `Alignment` 只出现在跨周期共振记录中。
/// - `Neutral` 永远不会触发通知。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    // 快均线位于慢均线之上或持平
    Golden,
    // 快均线在慢均线之下，但差距在阈值内且仍在上行
    Near,
    // 其余情况
    Neutral,
    // 快慢两个周期同时处于积极状态
    Alignment,
}

impl SignalState {
    /// 积极状态：金叉或接近金叉。
    pub fn is_positive(&self) -> bool {
        matches!(self, SignalState::Golden | SignalState::Near)
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalState::Golden => "golden",
            SignalState::Near => "near",
            SignalState::Neutral => "neutral",
            SignalState::Alignment => "alignment",
        };
        f.write_str(label)
    }
}

/// # Summary
/// 慢均线相对上一根 K 线的方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlowSlope {
    Rising,
    Falling,
    #[default]
    Flat,
}

impl fmt::Display for SlowSlope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SlowSlope::Rising => "rising",
            SlowSlope::Falling => "falling",
            SlowSlope::Flat => "flat",
        };
        f.write_str(label)
    }
}

/// # Summary
/// 单个标的在单个周期 (或共振键) 上某一时刻的分类结果，也是状态文件中的持久化单元。
///
/// # Invariants
/// - `spread_pct >= 0`；慢均线为 0 时为正无穷，序列化为 `null`。
/// - `last_notified_at` 只在真正发出告警时更新，否则沿用上一条记录的值。
/// - `fast_state` / `slow_state` 仅在 `state == Alignment` 时存在。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub state: SignalState,
    #[serde(default)]
    pub is_fresh_cross: bool,
    #[serde(default, with = "spread_pct_serde")]
    pub spread_pct: f64,
    #[serde(default)]
    pub close: f64,
    #[serde(default)]
    pub fast_avg: f64,
    #[serde(default)]
    pub slow_avg: f64,
    #[serde(default)]
    pub slow_slope: SlowSlope,
    // 最新 K 线时间 (ISO-8601，带 UTC 偏移)
    pub timestamp: String,
    #[serde(default)]
    pub last_notified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_state: Option<SignalState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_state: Option<SignalState>,
}

impl SignalRecord {
    /// # Summary
    /// 基于快周期与慢周期的本轮记录构造共振记录。
    ///
    /// # Logic
    /// 1. 状态固定为 `Alignment`，并记录两个周期当时的状态快照。
    /// 2. 时间戳、新鲜金叉标记与价格字段取自快周期记录。
    /// 3. `last_notified_at` 留空，由调用方根据通知决策补齐。
    pub fn alignment(fast: &SignalRecord, slow: &SignalRecord) -> Self {
        Self {
            state: SignalState::Alignment,
            is_fresh_cross: fast.is_fresh_cross,
            spread_pct: fast.spread_pct,
            close: fast.close,
            fast_avg: fast.fast_avg,
            slow_avg: fast.slow_avg,
            slow_slope: fast.slow_slope,
            timestamp: fast.timestamp.clone(),
            last_notified_at: None,
            fast_state: Some(fast.state),
            slow_state: Some(slow.state),
        }
    }
}

/// 正无穷的价差无法用 JSON 数字表示，落盘为 `null`，读回时还原。
mod spread_pct_serde {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// # Summary
/// 状态存储中的二级键：具体周期或跨周期共振。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Timeframe(TimeFrame),
    Alignment,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Timeframe(tf) => write!(f, "{}", tf),
            StateKey::Alignment => f.write_str(ALIGNMENT_KEY),
        }
    }
}

impl From<TimeFrame> for StateKey {
    fn from(tf: TimeFrame) -> Self {
        StateKey::Timeframe(tf)
    }
}

/// # Summary
/// 信号状态存储：标的 -> (周期键 -> 最近一次记录)。
///
/// # Invariants
/// - 每次运行由编排器独占，内存中修改，运行结束时最多落盘一次。
/// - `dirty` 不参与序列化与相等比较。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalStateMap {
    symbols: BTreeMap<String, BTreeMap<String, SignalRecord>>,
    #[serde(skip)]
    dirty: bool,
}

impl SignalStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取某标的某键下的上一条记录。
    pub fn get(&self, symbol: &str, key: StateKey) -> Option<&SignalRecord> {
        self.symbols
            .get(symbol)
            .and_then(|entries| entries.get(&key.to_string()))
    }

    /// # Summary
    /// 写入记录并标记存储已变更。
    ///
    /// # Returns
    /// 返回被覆盖的旧记录 (若有)。
    pub fn set(&mut self, symbol: &str, key: StateKey, record: SignalRecord) -> Option<SignalRecord> {
        self.dirty = true;
        self.symbols
            .entry(symbol.to_string())
            .or_default()
            .insert(key.to_string(), record)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 落盘成功后清除变更标记。
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl PartialEq for SignalStateMap {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: SignalState, spread_pct: f64) -> SignalRecord {
        SignalRecord {
            state,
            is_fresh_cross: false,
            spread_pct,
            close: 101.0,
            fast_avg: 100.0,
            slow_avg: 99.0,
            slow_slope: SlowSlope::Rising,
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            last_notified_at: None,
            fast_state: None,
            slow_state: None,
        }
    }

    #[test]
    fn test_set_marks_dirty_and_get_reads_back() {
        let mut map = SignalStateMap::new();
        assert!(!map.is_dirty());

        map.set("AAPL", StateKey::Timeframe(TimeFrame::Day1), record(SignalState::Golden, 1.0));
        assert!(map.is_dirty());
        assert_eq!(
            map.get("AAPL", TimeFrame::Day1.into()).map(|r| r.state),
            Some(SignalState::Golden)
        );
        assert!(map.get("AAPL", StateKey::Alignment).is_none());
        assert!(map.get("MSFT", TimeFrame::Day1.into()).is_none());

        map.mark_clean();
        assert!(!map.is_dirty());
    }

    #[test]
    fn test_json_shape_uses_timeframe_and_alignment_keys() {
        let mut map = SignalStateMap::new();
        map.set("AAPL", TimeFrame::Hour4.into(), record(SignalState::Near, 0.5));
        let fast = record(SignalState::Golden, 1.0);
        let slow = record(SignalState::Near, 0.4);
        map.set("AAPL", StateKey::Alignment, SignalRecord::alignment(&fast, &slow));

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value["AAPL"]["4h"]["state"], "near");
        assert_eq!(value["AAPL"]["4h"]["slow_slope"], "rising");
        assert!(value["AAPL"]["4h"]["last_notified_at"].is_null());
        assert!(value["AAPL"]["4h"].get("fast_state").is_none());
        assert_eq!(value["AAPL"]["alignment"]["state"], "alignment");
        assert_eq!(value["AAPL"]["alignment"]["fast_state"], "golden");
        assert_eq!(value["AAPL"]["alignment"]["slow_state"], "near");
    }

    #[test]
    fn test_infinite_spread_survives_round_trip() {
        let mut map = SignalStateMap::new();
        map.set("ZERO", TimeFrame::Day1.into(), record(SignalState::Neutral, f64::INFINITY));

        let text = serde_json::to_string(&map).unwrap();
        assert!(text.contains("\"spread_pct\":null"));

        let back: SignalStateMap = serde_json::from_str(&text).unwrap();
        let spread = back.get("ZERO", TimeFrame::Day1.into()).unwrap().spread_pct;
        assert!(spread.is_infinite() && spread > 0.0);
        assert_eq!(back, map);
        assert!(!back.is_dirty());
    }

    #[test]
    fn test_positive_states() {
        assert!(SignalState::Golden.is_positive());
        assert!(SignalState::Near.is_positive());
        assert!(!SignalState::Neutral.is_positive());
        assert!(!SignalState::Alignment.is_positive());
    }
}
