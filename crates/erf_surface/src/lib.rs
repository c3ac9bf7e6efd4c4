// crates/erf_surface/src/lib.rs

//! ERF 破裂面层
//!
//! 破裂面在核心层中是不透明能力，本 crate 提供能力定义与几种具体实现。
//!
//! # 模块概览
//!
//! - [`surface`]: `RuptureSurface` 能力、`SurfaceDistances`、`SurfaceKind`
//! - [`point`]: 未解析点面（可携带已应用的距离校正）
//! - [`line`]: 迹线 + 倾角的有限线面
//! - [`compound`]: 有序子面组成的复合面
//! - [`cached`]: 记忆最近一次查询的距离缓存代理
//! - [`correction`]: 点源距离校正与归一化校正集合
//!
//! # 示例
//!
//! ```
//! use erf_surface::prelude::*;
//! use erf_geo::Location;
//! use std::sync::Arc;
//!
//! let center = Location::new(34.0, -118.0, 0.0).unwrap();
//! let surface: SurfaceRef = Arc::new(LineSurface::centered(&center, 0.0, 20.0, 90.0).unwrap());
//! let cached = CachedSurface::new(surface.clone());
//!
//! let site = Location::new(34.1, -117.9, 0.0).unwrap();
//! assert_eq!(cached.distances(&site), surface.distances(&site));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cached;
pub mod compound;
pub mod correction;
pub mod line;
pub mod point;
pub mod surface;

/// 预导入模块
pub mod prelude {
    pub use crate::cached::CachedSurface;
    pub use crate::compound::CompoundSurface;
    pub use crate::correction::{
        fractile_corrections, single_correction, CorrectionList, CorrectionRef,
        DistanceCorrection, FractileCorrection, NoCorrection,
    };
    pub use crate::line::LineSurface;
    pub use crate::point::PointSurface;
    pub use crate::surface::{
        same_surface, surface_id, RuptureSurface, SurfaceDistances, SurfaceKind, SurfaceRef,
    };
}

// 重导出常用类型
pub use cached::CachedSurface;
pub use compound::CompoundSurface;
pub use correction::{CorrectionList, CorrectionRef, DistanceCorrection};
pub use line::LineSurface;
pub use point::PointSurface;
pub use surface::{RuptureSurface, SurfaceDistances, SurfaceKind, SurfaceRef};
