use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 发送告警文本到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持并发调用。
/// - 失败只通过返回值报告，调用方自行决定是否记录。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 发送一条纯文本告警。
    ///
    /// # Arguments
    /// * `message` - 已格式化好的告警正文。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`。
    /// * 失败返回 `Err(NotifyError)`。
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}
