use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理状态文件读写与解析失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件读写失败
    #[error("I/O error: {0}")]
    Io(String),
    /// 状态文件存在但无法解析
    #[error("Corrupted state file: {0}")]
    Corrupted(String),
    /// 序列化失败
    #[error("Serialization error: {0}")]
    Serialize(String),
}
