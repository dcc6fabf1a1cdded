use plotin_core::common::TimeFrame;
use plotin_core::signal::entity::{SignalRecord, SignalState};

/// 周期的可读标签。
pub fn timeframe_label(timeframe: TimeFrame) -> String {
    match timeframe {
        TimeFrame::Day1 => "Daily".to_string(),
        TimeFrame::Hour4 => "4-Hour".to_string(),
        other => other.to_string(),
    }
}

/// # Summary
/// 构造单周期信号告警正文 (三行纯文本)。
///
/// # Logic
/// 标题优先级：新鲜金叉 > 接近金叉 > 金叉持续。
pub fn build_signal_message(
    symbol: &str,
    timeframe: TimeFrame,
    record: &SignalRecord,
    near_threshold_pct: f64,
) -> String {
    let headline = if record.is_fresh_cross {
        "Fresh golden cross 🔔".to_string()
    } else if record.state == SignalState::Near {
        format!("SMAs within {:.2}%", record.spread_pct)
    } else {
        "Golden cross active".to_string()
    };

    [
        format!("{} {}: {}", symbol, timeframe_label(timeframe), headline),
        format!(
            "Close {:.2} | SMA50 {:.2} vs SMA128 {:.2}",
            record.close, record.fast_avg, record.slow_avg
        ),
        format!(
            "Spread {:.2}% (near ≤ {:.2}%) | 128 SMA {}",
            record.spread_pct, near_threshold_pct, record.slow_slope
        ),
    ]
    .join("\n")
}

/// 构造跨周期共振告警正文。
pub fn build_alignment_message(
    symbol: &str,
    fast_timeframe: TimeFrame,
    fast: &SignalRecord,
    slow_timeframe: TimeFrame,
    slow: &SignalRecord,
) -> String {
    let fast_label = timeframe_label(fast_timeframe);
    let slow_label = timeframe_label(slow_timeframe);
    format!(
        "{symbol}: {fast_label} signal aligns with {slow_label} trend.\n{fast_label}: {} | {slow_label}: {}",
        fast.state, slow.state
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotin_core::signal::entity::SlowSlope;

    fn record(state: SignalState, fresh: bool) -> SignalRecord {
        SignalRecord {
            state,
            is_fresh_cross: fresh,
            spread_pct: 0.984,
            close: 102.0,
            fast_avg: 101.0,
            slow_avg: 102.0,
            slow_slope: SlowSlope::Flat,
            timestamp: "2024-01-01T01:00:00+00:00".to_string(),
            last_notified_at: None,
            fast_state: None,
            slow_state: None,
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(timeframe_label(TimeFrame::Day1), "Daily");
        assert_eq!(timeframe_label(TimeFrame::Hour4), "4-Hour");
        assert_eq!(timeframe_label(TimeFrame::Hour1), "1h");
    }

    #[test]
    fn test_near_message() {
        let text = build_signal_message("AAPL", TimeFrame::Hour4, &record(SignalState::Near, false), 1.5);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "AAPL 4-Hour: SMAs within 0.98%");
        assert_eq!(lines[1], "Close 102.00 | SMA50 101.00 vs SMA128 102.00");
        assert_eq!(lines[2], "Spread 0.98% (near ≤ 1.50%) | 128 SMA flat");
    }

    #[test]
    fn test_fresh_cross_headline_wins() {
        let text = build_signal_message("MSFT", TimeFrame::Day1, &record(SignalState::Golden, true), 0.75);
        assert!(text.starts_with("MSFT Daily: Fresh golden cross 🔔"));

        let text = build_signal_message("MSFT", TimeFrame::Day1, &record(SignalState::Golden, false), 0.75);
        assert!(text.starts_with("MSFT Daily: Golden cross active"));
    }

    #[test]
    fn test_alignment_message() {
        let text = build_alignment_message(
            "AAPL",
            TimeFrame::Hour4,
            &record(SignalState::Golden, true),
            TimeFrame::Day1,
            &record(SignalState::Near, false),
        );
        assert_eq!(
            text,
            "AAPL: 4-Hour signal aligns with Daily trend.\n4-Hour: golden | Daily: near"
        );
    }
}
