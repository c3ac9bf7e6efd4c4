// crates/erf_config/src/param.rs

//! 可调参数值与震源机制种类

use serde::{Deserialize, Serialize};
use std::fmt;

/// 可调参数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// 布尔
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点
    Float(f64),
    /// 文本
    Text(String),
}

impl ParamValue {
    /// 以浮点读取（整数自动转换）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// 以布尔读取
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// 以文本读取
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// 震源机制种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocalMechKind {
    /// 走滑
    StrikeSlip,
    /// 逆冲
    Reverse,
    /// 正断
    Normal,
}

impl FocalMechKind {
    /// 全部机制
    pub const ALL: [FocalMechKind; 3] = [Self::StrikeSlip, Self::Reverse, Self::Normal];

    /// 代表性滑动角（度）
    pub fn rake(self) -> f64 {
        match self {
            Self::StrikeSlip => 0.0,
            Self::Reverse => 90.0,
            Self::Normal => -90.0,
        }
    }

    /// 代表性倾角（度）
    pub fn dip(self) -> f64 {
        match self {
            Self::StrikeSlip => 90.0,
            Self::Reverse | Self::Normal => 50.0,
        }
    }
}

impl fmt::Display for FocalMechKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StrikeSlip => "strike_slip",
            Self::Reverse => "reverse",
            Self::Normal => "normal",
        };
        f.write_str(name)
    }
}
