//! 配置校验模块
//!
//! 校验规则：
//! - 字段取值范围 (validator derive)：置信度阈值、时间窗口、通道容量
//! - model_type 必须是已知姿态模型
//! - sink 名称非空且唯一
//! - queue_capacity > 0
//! - file sink 的 base_path 不能为空

use std::collections::HashSet;

use contracts::{AppConfig, BodyModel, ContractError, SinkType};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 AppConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &AppConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_model_type(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// 字段级校验，错误映射为带路径的 ConfigValidation
fn validate_ranges(config: &AppConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// 取出第一条字段错误及其完整路径 (e.g. `session.confidence_threshold`)
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return Some((path, err.to_string()));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// 校验姿态模型名称
fn validate_model_type(config: &AppConfig) -> Result<(), ContractError> {
    BodyModel::from_name(&config.session.model_type)
        .map(|_| ())
        .map_err(|e| ContractError::config_validation("session.model_type", e.to_string()))
}

/// 校验 sink 配置
fn validate_sinks(config: &AppConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::File {
            if let Some(path) = sink.params.get("base_path") {
                if path.trim().is_empty() {
                    return Err(ContractError::config_validation(
                        format!("sinks[{}].params.base_path", sink.name),
                        "base_path cannot be empty",
                    ));
                }
            }
        }
    }
    Ok(())
}
