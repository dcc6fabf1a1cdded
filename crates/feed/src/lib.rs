//! # `plotin-feed` - 行情数据源
//!
//! `MarketDataProvider` 的 Yahoo Finance 实现。

pub mod resample;
pub mod yahoo;
