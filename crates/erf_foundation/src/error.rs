// crates/erf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `EfError` 枚举和 `EfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! 1. **前置条件违例** ([`ErrorKind::Precondition`]): 调用方输入有误，例如
//!    扁平索引越界、持续时间非正、权重未归一化。
//! 2. **内部一致性违例** ([`ErrorKind::Internal`]): 索引/合成逻辑本身的缺陷，
//!    例如偏移表首项非零、标记为非有限的破裂却不是点面。
//! 3. **不支持的操作** ([`ErrorKind::Unsupported`]): 明确拒绝而非返回退化结果。
//!
//! 本层从不重试、从不把错误降级为警告，由直接调用方决定如何处理。
//!
//! # 示例
//!
//! ```
//! use erf_foundation::error::{EfError, EfResult, ErrorKind};
//!
//! fn check_duration(duration: f64) -> EfResult<()> {
//!     EfError::check_positive("duration", duration)
//! }
//!
//! let err = check_duration(-1.0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Precondition);
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type EfResult<T> = Result<T, EfError>;

/// 错误大类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 前置条件违例（调用方输入错误）
    Precondition,
    /// 内部一致性违例（实现缺陷）
    Internal,
    /// 不支持的操作
    Unsupported,
}

/// 破裂预测错误类型
#[derive(Error, Debug)]
pub enum EfError {
    // ========================================================================
    // 前置条件
    // ========================================================================
    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    /// 权重未归一化
    #[error("权重未归一化: {what} 权重和为 {sum}")]
    NotNormalized {
        /// 权重所属对象
        what: String,
        /// 实际权重和
        sum: f64,
    },

    /// 缺少配置项
    #[error("缺少必需的配置项: {key}")]
    MissingConfig {
        /// 配置键名
        key: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        /// 可选的底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    // ========================================================================
    // 内部一致性
    // ========================================================================
    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },

    // ========================================================================
    // 不支持
    // ========================================================================
    /// 不支持的操作
    #[error("不支持的操作: {operation}")]
    Unsupported {
        /// 被拒绝的操作描述
        operation: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl EfError {
    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 权重未归一化
    pub fn not_normalized(what: impl Into<String>, sum: f64) -> Self {
        Self::NotNormalized {
            what: what.into(),
            sum,
        }
    }

    /// 缺少配置
    pub fn missing_config(key: impl Into<String>) -> Self {
        Self::MissingConfig { key: key.into() }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 不支持的操作
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// 错误大类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Internal { .. } => ErrorKind::Internal,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            _ => ErrorKind::Precondition,
        }
    }

    /// 是否为内部一致性错误
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl EfError {
    /// 检查值是否在闭区间内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> EfResult<()> {
        // NaN 不满足任何比较，单独拦截
        if value.is_nan() || value < min || value > max {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> EfResult<()> {
        if expected != actual {
            Err(Self::invalid_input(format!(
                "数组大小不匹配: {name} 期望{expected}, 实际{actual}"
            )))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> EfResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }

    /// 检查值是否有限
    #[inline]
    pub fn check_finite(field: &'static str, value: f64) -> EfResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Self::invalid_input(format!("{field} 必须为有限值, 实际为 {value}")))
        }
    }

    /// 检查值是否有限且严格为正
    #[inline]
    pub fn check_positive(field: &'static str, value: f64) -> EfResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(Self::invalid_input(format!("{field} 必须为有限正数, 实际为 {value}")))
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for EfError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
