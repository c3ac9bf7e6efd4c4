// crates/erf_core/src/lib.rs

//! ERF Core Layer (Layer 4)
//!
//! 地震破裂预测核心：预测与震源契约、全局破裂编号、点源破裂合成、
//! 场点自适应、距离缓存包装以及汇总计算。
//!
//! # 模块概览
//!
//! - [`rupture`]: 不可变破裂记录、率与概率换算
//! - [`mfd`]: 震级-频度分布
//! - [`source`]: 震源契约与两种现成震源
//! - [`forecast`]: 预测契约、代际与参数状态、震源列表预测
//! - [`nth`]: 全局第 n 个破裂的偏移表
//! - [`point`]: 点源数据、点源引擎、场点自适应点源
//! - [`gridded`]: 由配置构建的网格点源预测
//! - [`dist_cache`]: 距离缓存包装预测
//! - [`calc`]: 总概率、矩率、随机抽样与并行汇总
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: erf_core       ─> Forecast, Source, PointSource, DistCachedForecast (本层)
//! Layer 3: erf_config     ─> ForecastConfig, ParamValue
//! Layer 2: erf_surface    ─> RuptureSurface, CachedSurface
//! Layer 1: erf_geo        ─> Location, Region
//! Layer 0: erf_foundation ─> EfError, WeightedList, GenerationCell
//! ```
//!
//! # 示例
//!
//! ```
//! use erf_core::prelude::*;
//!
//! let mut config = ForecastConfig::default();
//! config.mfd.min_mag = 5.0;
//! config.mfd.max_mag = 6.0;
//! config.mfd.delta_mag = 0.5;
//!
//! let mut forecast = GriddedPointForecast::from_config(config).unwrap();
//! forecast.update_forecast().unwrap();
//!
//! let total = forecast.total_num_ruptures().unwrap();
//! let last = forecast.nth_rupture(total - 1).unwrap();
//! assert!(last.magnitude() >= 5.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calc;
pub mod dist_cache;
pub mod forecast;
pub mod gridded;
pub mod mfd;
pub mod nth;
pub mod point;
pub mod rupture;
pub mod source;

/// 层级标识
pub const LAYER: u8 = 4;

pub use dist_cache::DistCachedForecast;
pub use forecast::{Forecast, ForecastState, ParameterList, SourceListForecast, TimeSpan};
pub use gridded::GriddedPointForecast;
pub use mfd::MagFreqDist;
pub use nth::{NthRuptureForecast, NthRuptureIndex, OffsetTable};
pub use point::{PointSource, SiteAdaptivePointSource};
pub use rupture::{prob_to_rate, rate_to_prob, Occurrence, Rupture};
pub use source::{
    FaultRuptureSource, RuptureListSource, SiteAdaptiveSource, SiteSpecific, Source,
    SourceCacheKind, SourceRef, TectonicRegion,
};

pub use erf_config::{FocalMechKind, ForecastConfig, ParamValue};

/// 预导入模块
pub mod prelude {
    pub use crate::calc::{
        for_each_source_par, forecast_total_rates, forecast_total_rates_par, total_probability,
    };
    pub use crate::dist_cache::DistCachedForecast;
    pub use crate::forecast::{Forecast, SourceListForecast, TimeSpan};
    pub use crate::gridded::GriddedPointForecast;
    pub use crate::mfd::MagFreqDist;
    pub use crate::nth::NthRuptureForecast;
    pub use crate::point::{
        data_for_mfd, FocalMechanism, PointSource, SiteAdaptivePointSource,
        TruePointSurfaceBuilder,
    };
    pub use crate::rupture::{prob_to_rate, rate_to_prob, Rupture};
    pub use crate::source::{
        FaultRuptureSource, RuptureListSource, SiteAdaptiveSource, SiteSpecific, Source,
        SourceRef,
    };
    pub use erf_config::{FocalMechKind, ForecastConfig, ParamValue};
    pub use erf_foundation::{EfError, EfResult};
}
