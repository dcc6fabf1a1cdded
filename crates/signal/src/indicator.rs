use plotin_core::market::entity::{Candle, IndicatorBar};
use plotin_core::signal::error::SignalError;

/// # Summary
/// 计算收盘价的简单移动平均序列。
///
/// # Logic
/// 1. 维护窗口内收盘价之和，每前进一根加入新值、移出最旧值。
/// 2. 窗口未填满的位置输出 `None`。
///
/// # Arguments
/// * `closes`: 按时间升序排列的收盘价。
/// * `period`: 窗口长度，必须大于 0。
///
/// # Returns
/// 与输入等长的均值序列。
pub fn simple_moving_average(closes: &[f64], period: u32) -> Result<Vec<Option<f64>>, SignalError> {
    if period == 0 {
        return Err(SignalError::InvalidParameter("period must be positive".into()));
    }
    let window = usize::try_from(period)
        .map_err(|_| SignalError::InvalidParameter(format!("period {} too large", period)))?;
    let divisor = f64::from(period);

    let mut sums = Vec::with_capacity(closes.len());
    let mut running = 0.0;
    for (i, close) in closes.iter().enumerate() {
        running += close;
        if i >= window {
            running -= closes[i - window];
        }
        sums.push((i + 1 >= window).then_some(running / divisor));
    }
    Ok(sums)
}

/// # Summary
/// 为 K 线附加快慢均线，丢弃慢均线窗口尚未填满的前缀。
///
/// # Logic
/// 1. 校验 K 线数量不少于慢均线窗口。
/// 2. 分别计算快慢 SMA。
/// 3. 仅保留两条均线都有值的 K 线。
///
/// # Arguments
/// * `candles`: 按时间升序排列的 K 线。
/// * `fast_period`: 快均线窗口 (默认 50)。
/// * `slow_period`: 慢均线窗口 (默认 128)。
///
/// # Returns
/// 成功返回 `IndicatorBar` 列表；数据不足返回 `SignalError::InsufficientData`。
pub fn attach_indicators(
    candles: &[Candle],
    fast_period: u32,
    slow_period: u32,
) -> Result<Vec<IndicatorBar>, SignalError> {
    let required = usize::try_from(slow_period).unwrap_or(usize::MAX);
    if candles.len() < required {
        return Err(SignalError::InsufficientData {
            required,
            available: candles.len(),
        });
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = simple_moving_average(&closes, fast_period)?;
    let slow = simple_moving_average(&closes, slow_period)?;

    Ok(candles
        .iter()
        .zip(fast.into_iter().zip(slow))
        .filter_map(|(candle, averages)| match averages {
            (Some(fast_avg), Some(slow_avg)) => Some(IndicatorBar {
                time: candle.time,
                close: candle.close,
                fast_avg,
                slow_avg,
            }),
            _ => None,
        })
        .collect())
}
