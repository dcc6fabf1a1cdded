use async_trait::async_trait;
use plotin_core::signal::entity::SignalStateMap;
use plotin_core::signal::port::SignalStateRepository;
use plotin_core::store::error::StoreError;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

/// SignalStateRepository 的 JSON 文件实现。
///
/// # Summary
/// 整个状态映射保存在单个 JSON 文件中，按标的 -> 周期键 -> 记录组织。
///
/// # Invariants
/// * 文件不存在等价于空映射。
/// * 每次保存都整体重写：先写同目录临时文件再原子重命名。
pub struct JsonSignalStore {
    path: PathBuf,
}

impl JsonSignalStore {
    /// 创建指向指定状态文件的存储实例，不触碰文件系统。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SignalStateRepository for JsonSignalStore {
    /// # Summary
    /// 读取状态文件。
    ///
    /// # Logic
    /// 1. 文件不存在返回空映射。
    /// 2. 读取失败返回 `StoreError::Io`。
    /// 3. JSON 解析失败返回 `StoreError::Corrupted`，由调用方决定降级。
    ///
    /// # Returns
    /// * `Result<SignalStateMap, StoreError>` - 状态映射或错误。
    async fn load(&self) -> Result<SignalStateMap, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("State file {} not found, starting empty", self.path.display());
                return Ok(SignalStateMap::new());
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", self.path.display(), e)))
    }

    /// # Summary
    /// 将状态整体写回文件。
    ///
    /// # Logic
    /// 1. 确保父目录存在。
    /// 2. 序列化为带缩进的 JSON。
    /// 3. 写入临时文件后重命名覆盖目标文件。
    ///
    /// # Returns
    /// * `Result<(), StoreError>` - 成功或 I/O 错误。
    async fn save(&self, state: &SignalStateMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let body =
            serde_json::to_string_pretty(state).map_err(|e| StoreError::Serialize(e.to_string()))?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        info!(
            "Signal state for {} symbols saved to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }
}
