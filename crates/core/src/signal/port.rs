use crate::signal::entity::SignalStateMap;
use crate::store::error::StoreError;
use async_trait::async_trait;

/// # Summary
/// 信号状态的持久化接口。
///
/// # Invariants
/// - `load` 在存储不存在时返回空映射，而不是错误。
/// - 存储存在但无法解析时返回 `StoreError::Corrupted`，由调用方降级为空映射。
/// - `save` 总是整体覆盖写入。
#[async_trait]
pub trait SignalStateRepository: Send + Sync {
    /// # Summary
    /// 读取上一次成功落盘的状态快照。
    async fn load(&self) -> Result<SignalStateMap, StoreError>;

    /// # Summary
    /// 将整个状态映射写回持久层。
    async fn save(&self, state: &SignalStateMap) -> Result<(), StoreError>;
}
