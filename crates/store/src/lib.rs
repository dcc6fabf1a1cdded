//! # `plotin-store` - 信号状态持久化
//!
//! `SignalStateRepository` 的 JSON 文件实现。

pub mod json;
