use chrono::{DateTime, Utc};
use plotin_core::signal::entity::{SignalRecord, SignalState};
use tracing::warn;

/// # Summary
/// 判断当前记录是否值得发出一条新告警。纯函数，`now` 由调用方的时钟提供。
///
/// # Logic
/// 按顺序短路求值：
/// 1. 当前记录缺失或为 `neutral`：不通知。
/// 2. 没有上一条记录：通知 (首次观察到非中性状态)。
/// 3. 状态发生变化：通知。
/// 4. 当前为新鲜金叉而上一条不是：通知。
/// 5. 冷却时长 > 0：上次通知时间缺失、无法解析或已超过冷却时长时通知。
/// 6. 其余情况不通知。
///
/// # Arguments
/// * `previous`: 状态存储中的上一条记录。
/// * `current`: 本轮分类结果。
/// * `cooldown_hours`: 冷却时长 (小时)，<= 0 表示不做冷却重发。
/// * `now`: 评估时刻。
pub fn should_notify(
    previous: Option<&SignalRecord>,
    current: Option<&SignalRecord>,
    cooldown_hours: f64,
    now: DateTime<Utc>,
) -> bool {
    let Some(current) = current else {
        return false;
    };
    if current.state == SignalState::Neutral {
        return false;
    }
    let Some(previous) = previous else {
        return true;
    };
    if previous.state != current.state {
        return true;
    }
    if current.is_fresh_cross && !previous.is_fresh_cross {
        return true;
    }
    if cooldown_hours > 0.0 {
        return match previous.last_notified_at.as_deref().and_then(parse_timestamp) {
            Some(last) => cooldown_elapsed(last, now, cooldown_hours),
            None => true,
        };
    }
    false
}

/// # Summary
/// 根据通知决策补齐待写回的记录。
///
/// # Logic
/// - 已通知：`last_notified_at` 设为通知时刻。
/// - 未通知：沿用上一条记录的 `last_notified_at`，从不清空。
pub fn settle_record(
    mut current: SignalRecord,
    previous: Option<&SignalRecord>,
    notified: bool,
    now: DateTime<Utc>,
) -> SignalRecord {
    current.last_notified_at = if notified {
        Some(now.to_rfc3339())
    } else {
        previous.and_then(|p| p.last_notified_at.clone())
    };
    current
}

/// 解析带时区偏移的 ISO-8601 时间戳，失败返回 `None`。
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!("Unable to parse timestamp {:?}: {}", value, e);
            None
        }
    }
}

// 上次通知时间在未来时视为刚刚通知过
fn cooldown_elapsed(last: DateTime<Utc>, now: DateTime<Utc>, cooldown_hours: f64) -> bool {
    match (now - last).to_std() {
        Ok(elapsed) => elapsed.as_secs_f64() / 3_600.0 >= cooldown_hours,
        Err(_) => false,
    }
}
