//! # Config Loader
//!
//! 读取 `rom.toml`（或 JSON），规范化角度名称并校验，得到交给每个会话的 [`AppConfig`]。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("rom.toml")).unwrap();
//! println!("model: {}", config.session.model_type);
//! ```

mod parser;
mod validator;

pub use contracts::AppConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// 配置加载入口（无状态）
pub struct ConfigLoader;

impl ConfigLoader {
    /// 按扩展名选择格式，解析并校验
    ///
    /// # Errors
    /// 扩展名不支持或缺失时为 `ConfigParse`；读取失败为 `Io`；
    /// 其余同 [`ConfigLoader::load_from_str`]。
    pub fn load_from_path(path: &Path) -> Result<AppConfig, ContractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "cannot tell the format of '{}' without a .toml or .json extension",
                    path.display()
                ))
            })
            .and_then(|ext| {
                ConfigFormat::from_extension(ext).ok_or_else(|| {
                    ContractError::config_parse(format!("unsupported config format: .{ext}"))
                })
            })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// # Errors
    /// 语法或类型错误为 `ConfigParse`，规则不满足为 `ConfigValidation`
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AppConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// 对已构造的配置单独执行校验
    pub fn validate(config: &AppConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &AppConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("cannot write TOML: {e}")))
    }

    pub fn to_json(config: &AppConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("cannot write JSON: {e}")))
    }
}
