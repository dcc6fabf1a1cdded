use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use plotin_core::config::ScheduleConfig;
use thiserror::Error;

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
// 一周的分钟数，向后搜索的上限
const SEARCH_LIMIT_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Schedule '{id}': invalid day_of_week '{value}'")]
    DayOfWeek { id: String, value: String },
    #[error("Schedule '{id}': {field} {value} out of range")]
    OutOfRange {
        id: String,
        field: &'static str,
        value: u32,
    },
}

/// # Summary
/// 一条 cron 风格的定时规则，按 UTC 解释。
///
/// # Invariants
/// - `days[i]` 对应周一为 0 的星期序号。
/// - `hour`/`minute` 为 `None` 表示每小时 / 每分钟。
#[derive(Debug, Clone, PartialEq)]
pub struct CronSchedule {
    id: String,
    days: [bool; 7],
    hour: Option<u32>,
    minute: Option<u32>,
}

impl CronSchedule {
    /// # Summary
    /// 由配置项构造定时规则。
    ///
    /// # Logic
    /// 未填写的字段：比最低已填写字段更粗的取"任意"，更细的取最小值。
    /// 例如只给 `day_of_week` 表示当天 00:00；只给 `minute` 表示每小时该分钟。
    ///
    /// # Arguments
    /// * `config` - 配置中的一条 schedule。
    /// * `index` - 序号，缺少 `id` 时用于生成名称。
    pub fn from_config(config: &ScheduleConfig, index: usize) -> Result<Self, ScheduleError> {
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| format!("schedule_{}", index));

        let days = match config.day_of_week.as_deref() {
            Some(days) => parse_days(days).ok_or_else(|| ScheduleError::DayOfWeek {
                id: id.clone(),
                value: days.to_string(),
            })?,
            None => [true; 7],
        };

        if let Some(hour) = config.hour.filter(|h| *h > 23) {
            return Err(ScheduleError::OutOfRange {
                id,
                field: "hour",
                value: hour,
            });
        }
        if let Some(minute) = config.minute.filter(|m| *m > 59) {
            return Err(ScheduleError::OutOfRange {
                id,
                field: "minute",
                value: minute,
            });
        }

        let hour = match (config.hour, config.minute, config.day_of_week.is_some()) {
            (Some(h), _, _) => Some(h),
            (None, None, true) => Some(0),
            _ => None,
        };
        let minute = match config.minute {
            Some(m) => Some(m),
            None if config.hour.is_some() || config.day_of_week.is_some() => Some(0),
            None => None,
        };

        Ok(Self {
            id,
            days,
            hour,
            minute,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 判断给定时刻 (精确到分钟) 是否命中规则。
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        let day = usize::try_from(at.weekday().num_days_from_monday()).unwrap_or(usize::MAX);
        self.days.get(day).copied().unwrap_or(false)
            && self.hour.is_none_or(|h| h == at.hour())
            && self.minute.is_none_or(|m| m == at.minute())
    }

    /// # Summary
    /// 计算严格晚于 `after` 的下一次触发时刻。
    ///
    /// # Returns
    /// 一周内无命中 (星期集合为空) 时返回 `None`。
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ts = after.timestamp();
        let mut candidate = DateTime::from_timestamp(ts - ts.rem_euclid(60) + 60, 0)?;
        for _ in 0..=SEARCH_LIMIT_MINUTES {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

fn parse_day(token: &str) -> Option<usize> {
    let token = token.trim().to_ascii_lowercase();
    if let Some(pos) = WEEKDAYS.iter().position(|d| *d == token) {
        return Some(pos);
    }
    token.parse::<usize>().ok().filter(|d| *d < 7)
}

/// 解析 `mon-fri`、`sat,sun`、`0-4`、`*` 等星期表达式。
fn parse_days(spec: &str) -> Option<[bool; 7]> {
    let mut days = [false; 7];
    for part in spec.split(',') {
        let part = part.trim();
        if part == "*" {
            return Some([true; 7]);
        }
        match part.split_once('-') {
            Some((from, to)) => {
                let (from, to) = (parse_day(from)?, parse_day(to)?);
                if from > to {
                    return None;
                }
                days.get_mut(from..=to)?.iter_mut().for_each(|d| *d = true);
            }
            None => *days.get_mut(parse_day(part)?)? = true,
        }
    }
    Some(days)
}

/// 解析全部定时配置，任一条非法即报错。
pub fn parse_schedules(configs: &[ScheduleConfig]) -> Result<Vec<CronSchedule>, ScheduleError> {
    configs
        .iter()
        .enumerate()
        .map(|(i, c)| CronSchedule::from_config(c, i))
        .collect()
}

/// 所有规则中最早的下一次触发。
pub fn next_fire(
    schedules: &[CronSchedule],
    after: DateTime<Utc>,
) -> Option<(DateTime<Utc>, &CronSchedule)> {
    schedules
        .iter()
        .filter_map(|s| s.next_after(after).map(|at| (at, s)))
        .min_by_key(|(at, _)| *at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg(day_of_week: Option<&str>, hour: Option<u32>, minute: Option<u32>) -> ScheduleConfig {
        ScheduleConfig {
            id: Some("job".into()),
            day_of_week: day_of_week.map(str::to_string),
            hour,
            minute,
        }
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        // 2024-06-03 是周一
        Utc.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days("mon-fri"), Some([true, true, true, true, true, false, false]));
        assert_eq!(parse_days("sat, SUN"), Some([false, false, false, false, false, true, true]));
        assert_eq!(parse_days("0,2-3"), Some([true, false, true, true, false, false, false]));
        assert_eq!(parse_days("*"), Some([true; 7]));
        assert_eq!(parse_days("fri-mon"), None);
        assert_eq!(parse_days("7"), None);
        assert_eq!(parse_days("someday"), None);
    }

    #[test]
    fn test_weekday_schedule_skips_weekend() {
        let schedule = CronSchedule::from_config(&cfg(Some("mon-fri"), Some(14), Some(35)), 0).unwrap();
        // 周五 15:00 之后下一次是周一 14:35
        assert_eq!(schedule.next_after(at(7, 15, 0)), Some(at(10, 14, 35)));
        // 触发时刻本身不算
        assert_eq!(schedule.next_after(at(3, 14, 35)), Some(at(4, 14, 35)));
        assert_eq!(schedule.next_after(at(3, 14, 34)), Some(at(3, 14, 35)));
    }

    #[test]
    fn test_omitted_fields() {
        let day_only = CronSchedule::from_config(&cfg(Some("wed"), None, None), 0).unwrap();
        assert_eq!(day_only.next_after(at(3, 9, 0)), Some(at(5, 0, 0)));

        let hour_only = CronSchedule::from_config(&cfg(None, Some(9), None), 0).unwrap();
        assert_eq!(hour_only.next_after(at(3, 9, 0)), Some(at(4, 9, 0)));

        let minute_only = CronSchedule::from_config(&cfg(None, None, Some(15)), 0).unwrap();
        assert_eq!(minute_only.next_after(at(3, 9, 20)), Some(at(3, 10, 15)));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            CronSchedule::from_config(&cfg(Some("funday"), None, None), 0),
            Err(ScheduleError::DayOfWeek { .. })
        ));
        assert!(matches!(
            CronSchedule::from_config(&cfg(None, Some(24), None), 0),
            Err(ScheduleError::OutOfRange { field: "hour", .. })
        ));
        let unnamed = ScheduleConfig {
            minute: Some(5),
            ..Default::default()
        };
        assert_eq!(CronSchedule::from_config(&unnamed, 3).unwrap().id(), "schedule_3");
    }

    #[test]
    fn test_next_fire_picks_earliest() {
        let schedules = parse_schedules(&[
            cfg(Some("mon-fri"), Some(20), Some(0)),
            cfg(Some("mon-fri"), Some(14), Some(35)),
        ])
        .unwrap();
        let (when, _) = next_fire(&schedules, at(3, 12, 0)).unwrap();
        assert_eq!(when, at(3, 14, 35));
        assert!(next_fire(&[], at(3, 12, 0)).is_none());
    }
}
