use config::{Config, File, FileFormat};
use plotin_core::config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};
use tracing::info;

/// 主配置缺失时回退使用的模板文件名 (与主配置同目录)。
pub const TEMPLATE_FILE: &str = "config.yaml.template";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 优先读取 `path`；不存在时回退到同目录下的 `config.yaml.template`；两者都不存在则报错。
/// 2. 通过 `config` crate 以 YAML 解析并反序列化为 `AppConfig`，缺失字段取默认值。
/// 3. 应用环境变量覆盖 (`STOCKS`, `TELEGRAM_TOKEN`, `TELEGRAM_CHAT_ID`)。
/// 4. 清洗并校验。
///
/// # Arguments
/// * `path` - 主配置文件路径。
///
/// # Returns
/// * `Result<AppConfig, ConfigError>` - 校验后的配置。
pub fn load_app_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let source = resolve_source(path)?;
    let mut app_config: AppConfig = Config::builder()
        .add_source(File::new(&source.to_string_lossy(), FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Load(format!("{}: {}", source.display(), e)))?;

    apply_env_overrides(&mut app_config, |key| std::env::var(key).ok());
    app_config.validated()
}

fn resolve_source(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    let template = path
        .parent()
        .map(|dir| dir.join(TEMPLATE_FILE))
        .unwrap_or_else(|| PathBuf::from(TEMPLATE_FILE));
    if template.exists() {
        info!("{} not found, using {}", path.display(), template.display());
        return Ok(template);
    }
    Err(ConfigError::Load(format!(
        "Neither {} nor {} found",
        path.display(),
        template.display()
    )))
}

/// # Summary
/// 用环境变量覆盖配置文件中的值。
///
/// # Arguments
/// * `lookup` - 变量读取函数，生产环境传入 `std::env::var`，测试中传入固定映射。
pub fn apply_env_overrides<F>(app_config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(stocks) = lookup("STOCKS") {
        app_config.stocks = stocks
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        info!("Overriding stocks from environment: {:?}", app_config.stocks);
    }
    if let Some(token) = lookup("TELEGRAM_TOKEN") {
        app_config.telegram.token = Some(token);
        info!("Telegram token loaded from environment variable");
    }
    if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
        info!("Telegram chat ID loaded from environment: {}", chat_id);
        app_config.telegram.chat_id = Some(chat_id);
    }
}
