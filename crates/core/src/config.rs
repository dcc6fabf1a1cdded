use crate::common::TimeFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// 默认状态文件名，位于输出目录下。
pub const DEFAULT_STATE_FILENAME: &str = "signal_state.json";

/// 视为"未配置"的 Telegram 占位值。
const TOKEN_PLACEHOLDERS: [&str; 2] = ["YOUR_BOT_TOKEN", "YOUR_BOT_TOKEN_HERE"];
const CHAT_ID_PLACEHOLDERS: [&str; 2] = ["YOUR_CHAT_ID", "YOUR_CHAT_ID_HERE"];

/// # Summary
/// 配置错误枚举。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置源读取或反序列化失败
    #[error("Load error: {0}")]
    Load(String),
    /// 配置值不合法
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // 关注的标的列表
    pub stocks: Vec<String>,
    // 回看天数 (抓取时另加缓冲天数以填满慢均线窗口)
    pub time_period: u32,
    pub output: OutputConfig,
    pub telegram: TelegramConfig,
    pub notifications: NotificationConfig,
    pub schedules: Vec<ScheduleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    // 接近金叉的价差阈值 (百分比)
    pub near_cross_threshold_pct: f64,
    // 同一状态重复告警的最小间隔，0 表示关闭冷却重发
    pub cooldown_hours: f64,
    pub alignment_enabled: bool,
    // 为空时落在 `output.directory/signal_state.json`
    pub state_file: Option<String>,
    pub fast_timeframe: TimeFrame,
    pub slow_timeframe: TimeFrame,
    // 快均线窗口
    pub fast_period: u32,
    // 慢均线窗口
    pub slow_period: u32,
}

/// # Summary
/// 定时任务条目，字段语义同 cron (UTC)。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub id: Option<String>,
    pub day_of_week: Option<String>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stocks: vec!["AAPL".to_string()],
            time_period: 30,
            output: OutputConfig::default(),
            telegram: TelegramConfig::default(),
            notifications: NotificationConfig::default(),
            schedules: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            near_cross_threshold_pct: 0.75,
            cooldown_hours: 6.0,
            alignment_enabled: true,
            state_file: None,
            fast_timeframe: TimeFrame::Hour4,
            slow_timeframe: TimeFrame::Day1,
            fast_period: 50,
            slow_period: 128,
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 清洗并校验配置。
    ///
    /// # Logic
    /// 1. 标的列表为空时回落到默认值 `AAPL`。
    /// 2. Telegram 占位值或空串视为未配置。
    /// 3. 校验阈值、快慢周期与均线窗口。
    ///
    /// # Returns
    /// * 合法返回清洗后的配置，否则返回 `ConfigError::Invalid`。
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.stocks = self
            .stocks
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if self.stocks.is_empty() {
            warn!("No stocks defined in config. Using default: AAPL");
            self.stocks = vec!["AAPL".to_string()];
        }

        self.telegram.token = scrub_placeholder(self.telegram.token.take(), &TOKEN_PLACEHOLDERS);
        if self.telegram.token.is_none() {
            warn!("Telegram token is not configured");
        }
        self.telegram.chat_id =
            scrub_placeholder(self.telegram.chat_id.take(), &CHAT_ID_PLACEHOLDERS);
        if self.telegram.chat_id.is_none() {
            warn!("Telegram chat ID is not configured");
        }

        let n = &self.notifications;
        if !n.near_cross_threshold_pct.is_finite() || n.near_cross_threshold_pct < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "near_cross_threshold_pct must be >= 0, got {}",
                n.near_cross_threshold_pct
            )));
        }
        if n.cooldown_hours.is_nan() {
            return Err(ConfigError::Invalid("cooldown_hours must be a number".into()));
        }
        if n.fast_timeframe == n.slow_timeframe {
            return Err(ConfigError::Invalid(format!(
                "fast_timeframe and slow_timeframe must differ (both {})",
                n.fast_timeframe
            )));
        }
        if n.fast_period == 0 || n.fast_period >= n.slow_period {
            return Err(ConfigError::Invalid(format!(
                "fast_period ({}) must be positive and below slow_period ({})",
                n.fast_period, n.slow_period
            )));
        }

        Ok(self)
    }

    /// 状态文件路径，未显式配置时位于输出目录下。
    pub fn state_file(&self) -> PathBuf {
        match &self.notifications.state_file {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => PathBuf::from(&self.output.directory).join(DEFAULT_STATE_FILENAME),
        }
    }

    /// Token 与 Chat ID 均可用时返回二者。
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (&self.telegram.token, &self.telegram.chat_id) {
            (Some(token), Some(chat_id)) => Some((token.as_str(), chat_id.as_str())),
            _ => None,
        }
    }
}

fn scrub_placeholder(value: Option<String>, placeholders: &[&str]) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !placeholders.contains(&v.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.stocks, vec!["AAPL".to_string()]);
        assert_eq!(config.time_period, 30);
        assert_eq!(config.notifications.fast_timeframe, TimeFrame::Hour4);
        assert_eq!(config.notifications.slow_timeframe, TimeFrame::Day1);
        assert_eq!(config.output.directory, "./output");
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.near_cross_threshold_pct, 0.75);
        assert_eq!(config.notifications.cooldown_hours, 6.0);
        assert!(config.notifications.alignment_enabled);
        assert_eq!(config.notifications.fast_period, 50);
        assert_eq!(config.notifications.slow_period, 128);
        assert_eq!(
            config.state_file(),
            PathBuf::from("./output").join("signal_state.json")
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"stocks": ["msft"], "notifications": {"cooldown_hours": 0, "state_file": "/tmp/s.json"}}"#,
        )
        .unwrap();
        let config = config.validated().unwrap();
        assert_eq!(config.stocks, vec!["MSFT".to_string()]);
        assert_eq!(config.notifications.cooldown_hours, 0.0);
        assert_eq!(config.notifications.near_cross_threshold_pct, 0.75);
        assert_eq!(config.state_file(), PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn test_placeholders_are_treated_as_unset() {
        let mut config = AppConfig::default();
        config.telegram.token = Some("YOUR_BOT_TOKEN_HERE".into());
        config.telegram.chat_id = Some("12345".into());
        let config = config.validated().unwrap();
        assert!(config.telegram.token.is_none());
        assert_eq!(config.telegram.chat_id.as_deref(), Some("12345"));
        assert!(config.telegram_credentials().is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.notifications.near_cross_threshold_pct = -1.0;
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.notifications.slow_timeframe = TimeFrame::Hour4;
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.notifications.fast_period = 200;
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_stock_list_falls_back_to_default() {
        let mut config = AppConfig::default();
        config.stocks = vec!["  ".into()];
        let config = config.validated().unwrap();
        assert_eq!(config.stocks, vec!["AAPL".to_string()]);
    }
}
