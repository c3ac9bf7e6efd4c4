// crates/erf_core/src/point/mod.rs

//! 点源破裂合成
//!
//! - [`data`]: 点源数据接口、破裂面构造器与数据装配
//! - [`engine`]: 点源引擎，按距离校正展开破裂
//! - [`adaptive`]: 场点自适应点源

pub mod adaptive;
pub mod data;
pub mod engine;

pub use adaptive::{DistanceTieredData, SiteAdaptiveData, SiteAdaptivePointSource};
pub use data::{
    data_for_mag_rate, data_for_mfd, data_for_mfd_weighted, data_for_mfds,
    data_for_rupture_list, FiniteSurfaceBuilder, FocalMechanism, MfdPointSourceData,
    PointSourceData, ProbabilityPointSourceData, RatePointSourceData,
    RuptureListPointSourceData, RuptureSurfaceBuilder, SurfaceBuilderRef,
    TruePointSurfaceBuilder,
};
pub use engine::PointSource;
