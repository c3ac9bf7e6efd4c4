// crates/erf_config/src/error.rs

//! 配置层错误类型

use erf_foundation::EfError;
use std::path::PathBuf;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件不存在
    #[error("配置文件不存在: {}", .0.display())]
    FileNotFound(PathBuf),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),
}

impl ConfigError {
    /// 无效值
    pub fn invalid(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for EfError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(source) => EfError::from(source),
            ConfigError::FileNotFound(path) => EfError::file_not_found(path),
            ConfigError::Parse(message) => EfError::serialization(message),
            ConfigError::InvalidValue { key, value, reason } => {
                EfError::invalid_config(key, value, reason)
            }
            ConfigError::Missing(key) => EfError::missing_config(key),
        }
    }
}
