//! # `plotin-signal` - 信号与告警引擎
//!
//! 均线数据 -> 信号分类 -> 告警决策 (含冷却) -> 跨周期共振 -> 状态写回。
//! 只依赖 `plotin-core` 中的端口，行情、推送与持久化实现由 App 层注入。

pub mod alignment;
pub mod classifier;
pub mod indicator;
pub mod message;
pub mod orchestrator;
pub mod policy;
pub mod runner;
