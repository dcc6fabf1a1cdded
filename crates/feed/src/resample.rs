use chrono::DateTime;
use plotin_core::market::entity::Candle;

/// # Summary
/// 将较小周期的 K 线聚合为固定跨度的 K 线。
///
/// # Invariants
/// - 桶边界按 UTC 纪元对齐 (如 4 小时桶起点为 00:00, 04:00, ...)。
/// - 输入须按时间升序；输出同样升序。
///
/// # Logic
/// 1. 以 `time - time mod bucket_secs` 作为桶起点。
/// 2. 同一桶内：开盘取首根，收盘取末根，最高/最低取极值，成交量求和。
///
/// # Arguments
/// * `candles`: 原始 K 线。
/// * `bucket_secs`: 目标周期跨度 (秒)，必须大于 0。
///
/// # Returns
/// 聚合后的 K 线列表。
pub fn resample(candles: &[Candle], bucket_secs: i64) -> Vec<Candle> {
    if bucket_secs <= 0 {
        return candles.to_vec();
    }

    let mut out: Vec<Candle> = Vec::new();
    for candle in candles {
        let ts = candle.time.timestamp();
        let Some(bucket) = DateTime::from_timestamp(ts - ts.rem_euclid(bucket_secs), 0) else {
            continue;
        };

        match out.last_mut() {
            Some(current) if current.time == bucket => {
                current.high = current.high.max(candle.high);
                current.low = current.low.min(candle.low);
                current.close = candle.close;
                current.volume += candle.volume;
            }
            _ => out.push(Candle {
                time: bucket,
                ..candle.clone()
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn hourly(hour: u32, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 2, 5, hour, 30, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_groups_into_four_hour_buckets() {
        let candles = vec![
            hourly(13, 10.0, 11.0, 9.5, 10.5),
            hourly(14, 10.5, 12.0, 10.0, 11.8),
            hourly(15, 11.8, 11.9, 10.9, 11.0),
            hourly(16, 11.0, 11.5, 10.8, 11.2),
        ];
        let bars = resample(&candles, 14_400);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, Utc.with_ymd_and_hms(2024, 2, 5, 12, 0, 0).unwrap());
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].high, 12.0);
        assert_eq!(bars[0].low, 9.5);
        assert_eq!(bars[0].close, 11.0);
        assert_eq!(bars[0].volume, 300.0);
        assert_eq!(bars[1].time, Utc.with_ymd_and_hms(2024, 2, 5, 16, 0, 0).unwrap());
        assert_eq!(bars[1].close, 11.2);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 14_400).is_empty());
    }
}
