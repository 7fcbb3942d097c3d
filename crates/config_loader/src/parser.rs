//! 配置解析
//!
//! TOML 为主，JSON 可选。解析后对角度名称做规范化：去掉首尾空白、
//! 合并连续空白、转小写，并按首次出现顺序去重，使输出列名与角度表一致。

use contracts::{AppConfig, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.toml` / `.json`，不区分大小写
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// 1-based (line, column) of a byte offset
fn position(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

pub fn parse_toml(content: &str) -> Result<AppConfig, ContractError> {
    let config: AppConfig = toml::from_str(content).map_err(|e| {
        let at = e
            .span()
            .map(|span| {
                let (line, column) = position(content, span.start);
                format!(" at line {line}, column {column}")
            })
            .unwrap_or_default();
        ContractError::ConfigParse {
            message: format!("TOML{at}: {}", e.message()),
            source: Some(Box::new(e)),
        }
    })?;
    Ok(normalize(config))
}

pub fn parse_json(content: &str) -> Result<AppConfig, ContractError> {
    let config: AppConfig = serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON at line {}, column {}: {e}", e.line(), e.column()),
        source: Some(Box::new(e)),
    })?;
    Ok(normalize(config))
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<AppConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

/// "  Right   Knee " -> "right knee"
fn canonical_angle(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn canonical_list(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| canonical_angle(n)) {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn normalize(mut config: AppConfig) -> AppConfig {
    let session = &mut config.session;
    session.joint_angles = canonical_list(std::mem::take(&mut session.joint_angles));
    session.segment_angles = canonical_list(std::mem::take(&mut session.segment_angles));
    session.model_type = session.model_type.trim().to_string();
    config.rom.reference_angle = canonical_angle(&config.rom.reference_angle);
    for sink in &mut config.sinks {
        sink.name = sink.name.trim().to_string();
    }
    config
}
