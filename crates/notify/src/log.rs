use async_trait::async_trait;
use plotin_core::notify::error::NotifyError;
use plotin_core::notify::port::Notifier;
use tracing::info;

/// # Summary
/// 只写日志的通知器，未开启推送或 Telegram 未配置时使用。
///
/// # Invariants
/// * 总是返回成功。
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!("[Notification] {}", message);
        Ok(())
    }
}
