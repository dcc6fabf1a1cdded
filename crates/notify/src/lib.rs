//! # `plotin-notify` - 告警推送通道
//!
//! `Notifier` 的 Telegram 实现，以及未开启推送时使用的日志实现。

pub mod log;
pub mod telegram;
