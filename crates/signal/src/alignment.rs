use crate::policy::should_notify;
use chrono::{DateTime, Utc};
use plotin_core::common::TimeFrame;
use plotin_core::signal::entity::SignalRecord;
use std::collections::BTreeMap;

/// # Summary
/// 跨周期共振的评估结果。
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentDecision {
    // 待写入 `alignment` 键的记录 (尚未补齐 `last_notified_at`)
    pub record: SignalRecord,
    // 是否应发出共振告警
    pub notify: bool,
}

/// # Summary
/// 跨周期共振检测器：快周期确认慢周期趋势时产生独立的告警类别。
///
/// # Invariants
/// - 只使用本轮计算出的记录，不读取存储中的周期记录。
/// - 仅当快周期的普通告警在本轮确实发出时才会打开闸门。
#[derive(Debug, Clone, Copy)]
pub struct AlignmentDetector {
    fast: TimeFrame,
    slow: TimeFrame,
    cooldown_hours: f64,
}

impl AlignmentDetector {
    pub fn new(fast: TimeFrame, slow: TimeFrame, cooldown_hours: f64) -> Self {
        Self {
            fast,
            slow,
            cooldown_hours,
        }
    }

    pub fn fast(&self) -> TimeFrame {
        self.fast
    }

    pub fn slow(&self) -> TimeFrame {
        self.slow
    }

    /// # Summary
    /// 评估某个标的本轮是否形成共振。
    ///
    /// # Logic
    /// 1. 快慢两个周期的本轮记录必须同时存在，否则不评估。
    /// 2. 两者都处于积极状态 (golden/near) 且快周期本轮已通知，闸门才打开。
    /// 3. 构造共振记录，再用与普通信号相同的决策规则对比上一条共振记录。
    ///
    /// # Arguments
    /// * `signals`: 本轮计算出的 周期 -> 记录。
    /// * `fast_notified`: 快周期普通告警本轮是否已发出。
    /// * `previous`: 存储中上一条共振记录。
    /// * `now`: 评估时刻。
    ///
    /// # Returns
    /// 闸门关闭或数据不全时返回 `None`，此时不写入任何记录。
    pub fn evaluate(
        &self,
        signals: &BTreeMap<TimeFrame, SignalRecord>,
        fast_notified: bool,
        previous: Option<&SignalRecord>,
        now: DateTime<Utc>,
    ) -> Option<AlignmentDecision> {
        let fast = signals.get(&self.fast)?;
        let slow = signals.get(&self.slow)?;

        if !(fast.state.is_positive() && slow.state.is_positive() && fast_notified) {
            return None;
        }

        let record = SignalRecord::alignment(fast, slow);
        let notify = should_notify(previous, Some(&record), self.cooldown_hours, now);
        Some(AlignmentDecision { record, notify })
    }
}
