// crates/erf_geo/src/lib.rs

//! ERF 地理层
//!
//! 提供位置、场点、区域与球面距离工具。
//!
//! # 模块
//!
//! - `location`: `Location`、`LocationList`、`Site` 与距离/方位函数
//! - `region`: `Region` 包含判断及矩形、圆形区域
//!
//! # 示例
//!
//! ```
//! use erf_geo::prelude::*;
//!
//! let center = Location::new(34.0, -118.0, 0.0).unwrap();
//! let region = CircularRegion::new(center, 50.0).unwrap();
//! let p = location_at(&center, 90.0, 30.0, 0.0);
//! assert!(region.contains(&p));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod location;
pub mod region;

/// 预导入模块
pub mod prelude {
    pub use crate::location::{
        are_similar, azimuth, horz_distance, horz_distance_fast, linear_distance, location_at,
        Location, LocationList, Site, EARTH_RADIUS_MEAN,
    };
    pub use crate::region::{CircularRegion, RectangularRegion, Region};
}

// 重导出常用类型
pub use location::{Location, LocationList, Site};
pub use region::{CircularRegion, RectangularRegion, Region};
