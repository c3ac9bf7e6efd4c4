// crates/erf_config/src/lib.rs

//! ERF Config Layer (Layer 3)
//!
//! 配置层，提供网格点源预测的 JSON 配置、可调参数值与校验。
//!
//! # 模块概览
//!
//! - [`forecast_config`]: ForecastConfig 及其子配置
//! - [`param`]: 可调参数值 `ParamValue` 与震源机制 `FocalMechKind`
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: erf_core       ─> GriddedPointForecast::from_config
//! Layer 3: erf_config     ─> ForecastConfig, ParamValue (本层)
//! Layer 2: erf_surface
//! Layer 1: erf_geo
//! Layer 0: erf_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod forecast_config;
pub mod param;

/// 层级标识
pub const LAYER: u8 = 3;

// 重导出核心类型
pub use error::ConfigError;
pub use forecast_config::{
    CorrectionConfig, CorrectionKind, ForecastConfig, GridConfig, MechanismWeight, MfdConfig,
    SurfaceModelConfig,
};
pub use param::{FocalMechKind, ParamValue};
