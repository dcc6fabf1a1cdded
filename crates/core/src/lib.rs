//! # `plotin-core` - 领域核心
//!
//! 定义均线交叉告警系统的实体、错误类型与端口 (Trait)。
//! 具体实现 (行情源、状态文件、消息推送) 由各自的适配器 crate 提供，
//! 本 crate 不依赖任何 I/O 实现。

pub mod common;
pub mod config;
pub mod market;
pub mod notify;
pub mod signal;
pub mod store;
