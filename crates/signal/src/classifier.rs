use plotin_core::market::entity::IndicatorBar;
use plotin_core::signal::entity::{SignalRecord, SignalState, SlowSlope};
use plotin_core::signal::error::SignalError;

/// # Summary
/// 快慢均线之间的相对价差 (百分比)。
///
/// # Invariants
/// - 结果非负；慢均线为 0 时返回正无穷，使 `near` 状态不可达。
pub fn spread_pct(fast_avg: f64, slow_avg: f64) -> f64 {
    if slow_avg == 0.0 {
        return f64::INFINITY;
    }
    (fast_avg - slow_avg).abs() / slow_avg.abs() * 100.0
}

/// # Summary
/// 将最近两根带均线的 K 线分类为信号记录。纯函数，不读取任何历史状态。
///
/// # Logic
/// 1. 取序列末尾两根 K 线，不足两根返回 `InsufficientData`。
/// 2. 任一必需数值非有限视为字段缺失。
/// 3. 计算价差、慢均线斜率与新鲜金叉标记。
/// 4. 快 >= 慢 为 `golden`；否则价差不超过阈值且快均线未下行为 `near`；其余为 `neutral`。
///
/// # Arguments
/// * `bars`: 按时间升序排列的 K 线，至少两根。
/// * `near_threshold_pct`: 接近金叉阈值。
///
/// # Returns
/// 成功返回 `last_notified_at` 为空的 `SignalRecord`。
pub fn classify(bars: &[IndicatorBar], near_threshold_pct: f64) -> Result<SignalRecord, SignalError> {
    let [.., previous, current] = bars else {
        return Err(SignalError::InsufficientData {
            required: 2,
            available: bars.len(),
        });
    };
    ensure_complete(previous)?;
    ensure_complete(current)?;

    let spread = spread_pct(current.fast_avg, current.slow_avg);
    let is_golden = current.fast_avg >= current.slow_avg;
    let was_golden = previous.fast_avg >= previous.slow_avg;

    let slow_slope = if current.slow_avg > previous.slow_avg {
        SlowSlope::Rising
    } else if current.slow_avg < previous.slow_avg {
        SlowSlope::Falling
    } else {
        SlowSlope::Flat
    };

    let state = if is_golden {
        SignalState::Golden
    } else if spread <= near_threshold_pct && current.fast_avg >= previous.fast_avg {
        SignalState::Near
    } else {
        SignalState::Neutral
    };

    Ok(SignalRecord {
        state,
        is_fresh_cross: is_golden && !was_golden,
        spread_pct: spread,
        close: current.close,
        fast_avg: current.fast_avg,
        slow_avg: current.slow_avg,
        slow_slope,
        timestamp: current.time.to_rfc3339(),
        last_notified_at: None,
        fast_state: None,
        slow_state: None,
    })
}

fn ensure_complete(bar: &IndicatorBar) -> Result<(), SignalError> {
    if !bar.close.is_finite() {
        return Err(SignalError::MissingField("close"));
    }
    if !bar.fast_avg.is_finite() {
        return Err(SignalError::MissingField("fast_avg"));
    }
    if !bar.slow_avg.is_finite() {
        return Err(SignalError::MissingField("slow_avg"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(fast: [f64; 2], slow: [f64; 2], close: [f64; 2]) -> Vec<IndicatorBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..2)
            .map(|i| IndicatorBar {
                time: start + Duration::hours(i64::from(u8::try_from(i).unwrap())),
                close: close[i],
                fast_avg: fast[i],
                slow_avg: slow[i],
            })
            .collect()
    }

    #[test]
    fn test_detects_fresh_golden_cross() {
        let record = classify(&bars([95.0, 105.0], [100.0, 100.0], [100.0, 106.0]), 0.8).unwrap();
        assert_eq!(record.state, SignalState::Golden);
        assert!(record.is_fresh_cross);
        assert_eq!(record.spread_pct, 5.0);
        assert_eq!(record.close, 106.0);
        assert_eq!(record.slow_slope, SlowSlope::Flat);
        assert_eq!(record.timestamp, "2024-01-01T01:00:00+00:00");
        assert!(record.last_notified_at.is_none());
    }

    #[test]
    fn test_identifies_near_cross_when_spread_tight() {
        let record = classify(&bars([100.0, 101.0], [102.0, 102.0], [101.0, 102.0]), 1.5).unwrap();
        assert_eq!(record.state, SignalState::Near);
        assert!(!record.is_fresh_cross);
        assert!((record.spread_pct - 0.980_392).abs() < 1e-5);
    }

    #[test]
    fn test_near_at_exact_threshold() {
        let record = classify(&bars([98.0, 99.0], [100.0, 100.0], [98.0, 99.0]), 1.0).unwrap();
        assert_eq!(record.spread_pct, 1.0);
        assert_eq!(record.state, SignalState::Near);

        let record = classify(&bars([98.0, 99.0], [100.0, 100.0], [98.0, 99.0]), 0.99).unwrap();
        assert_eq!(record.state, SignalState::Neutral);
    }

    #[test]
    fn test_near_when_fast_flat() {
        let record = classify(&bars([99.5, 99.5], [100.0, 100.0], [99.0, 99.5]), 0.75).unwrap();
        assert_eq!(record.state, SignalState::Near);
        assert!(!record.is_fresh_cross);
    }

    #[test]
    fn test_sustained_golden_is_not_fresh() {
        let record = classify(&bars([105.0, 106.0], [100.0, 101.0], [107.0, 108.0]), 0.75).unwrap();
        assert_eq!(record.state, SignalState::Golden);
        assert!(!record.is_fresh_cross);
        assert_eq!(record.slow_slope, SlowSlope::Rising);
    }

    #[test]
    fn test_touching_average_counts_as_golden() {
        let record = classify(&bars([99.0, 100.0], [100.0, 100.0], [99.0, 100.0]), 0.75).unwrap();
        assert_eq!(record.state, SignalState::Golden);
        assert!(record.is_fresh_cross);
        assert_eq!(record.spread_pct, 0.0);
    }

    #[test]
    fn test_neutral_when_fast_average_falls() {
        let record = classify(&bars([101.8, 101.7], [102.0, 101.9], [101.0, 101.0]), 1.5).unwrap();
        assert_eq!(record.state, SignalState::Neutral);
        assert_eq!(record.slow_slope, SlowSlope::Falling);
    }

    #[test]
    fn test_neutral_when_spread_too_wide() {
        let record = classify(&bars([90.0, 91.0], [100.0, 100.0], [90.0, 91.0]), 1.5).unwrap();
        assert_eq!(record.state, SignalState::Neutral);
    }

    #[test]
    fn test_zero_slow_average_yields_infinite_spread() {
        let below = classify(&bars([-2.0, -1.0], [0.0, 0.0], [1.0, 1.0]), 100.0).unwrap();
        assert!(below.spread_pct.is_infinite());
        assert_eq!(below.state, SignalState::Neutral);

        let above = classify(&bars([-1.0, 1.0], [0.0, 0.0], [1.0, 1.0]), 100.0).unwrap();
        assert_eq!(above.state, SignalState::Golden);
        assert!(above.is_fresh_cross);
    }

    #[test]
    fn test_requires_two_bars() {
        let mut data = bars([1.0, 2.0], [1.0, 2.0], [1.0, 2.0]);
        data.truncate(1);
        assert_eq!(
            classify(&data, 0.75),
            Err(SignalError::InsufficientData {
                required: 2,
                available: 1
            })
        );
    }

    #[test]
    fn test_nan_average_is_missing_field() {
        let data = bars([f64::NAN, 2.0], [1.0, 2.0], [1.0, 2.0]);
        assert_eq!(classify(&data, 0.75), Err(SignalError::MissingField("fast_avg")));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let data = bars([100.0, 101.0], [102.0, 102.0], [101.0, 102.0]);
        assert_eq!(classify(&data, 1.5).unwrap(), classify(&data, 1.5).unwrap());
    }
}
