use thiserror::Error;

/// # Summary
/// 信号计算错误：历史数据不足或字段缺失。
///
/// # Invariants
/// - 只影响单个 (标的, 周期)，调用方跳过该组合后继续运行。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    /// K 线数量不足以完成计算
    #[error("Insufficient data: need {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// K 线缺少必需字段 (非有限数值视为缺失)
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// 参数非法 (如均线周期为 0)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
