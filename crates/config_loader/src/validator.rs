//! 配置校验模块
//!
//! 校验规则：
//! - queue_capacity > 0
//! - sink type 非空且唯一
//! - sink config 为 JSON 对象
//! - file sink 必须配置 filename

use std::collections::HashSet;

use contracts::{ContractError, LoggerConfig, FILE_SINK};

/// 校验 LoggerConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &LoggerConfig) -> Result<(), ContractError> {
    validate_queue(config)?;
    validate_sink_types(config)?;
    validate_sink_configs(config)?;
    Ok(())
}

fn validate_queue(config: &LoggerConfig) -> Result<(), ContractError> {
    if config.queue_capacity == 0 {
        return Err(ContractError::invalid_value(
            "queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

/// 校验 sink type 唯一性
fn validate_sink_types(config: &LoggerConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (index, sink) in config.sinks.iter().enumerate() {
        if sink.sink_type.trim().is_empty() {
            return Err(ContractError::missing_field(format!("sinks[{index}].type")));
        }
        if !seen.insert(sink.sink_type.as_str()) {
            return Err(ContractError::invalid_value(
                format!("sinks[type={}]", sink.sink_type),
                "duplicate sink type",
            ));
        }
    }
    Ok(())
}

fn validate_sink_configs(config: &LoggerConfig) -> Result<(), ContractError> {
    for sink in &config.sinks {
        if !(sink.config.is_object() || sink.config.is_null()) {
            return Err(ContractError::invalid_value(
                format!("sinks[type={}].config", sink.sink_type),
                "config must be a table/object",
            ));
        }

        if sink.sink_type == FILE_SINK {
            let filename = sink.config.get("filename").and_then(|v| v.as_str());
            if filename.is_none_or(|f| f.trim().is_empty()) {
                return Err(ContractError::missing_field(format!(
                    "sinks[type={}].config.filename",
                    sink.sink_type
                )));
            }
        }
    }
    Ok(())
}
