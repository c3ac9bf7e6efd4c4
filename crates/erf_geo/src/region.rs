// crates/erf_geo/src/region.rs

//! 区域包含判断
//!
//! 区域只负责点包含查询，用于按区域过滤的概率计算。

use crate::location::{horz_distance, Location};
use erf_foundation::{EfError, EfResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// 地理区域
pub trait Region: Send + Sync + Debug {
    /// 位置是否在区域内
    fn contains(&self, loc: &Location) -> bool;

    /// 区域名称
    fn name(&self) -> &str {
        ""
    }
}

/// 经纬度矩形区域（含边界）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectangularRegion {
    /// 名称
    pub name: String,
    /// 最小纬度
    pub min_lat: f64,
    /// 最大纬度
    pub max_lat: f64,
    /// 最小经度
    pub min_lon: f64,
    /// 最大经度
    pub max_lon: f64,
}

impl RectangularRegion {
    /// 创建矩形区域
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> EfResult<Self> {
        EfError::check_range("min_lat", min_lat, -90.0, 90.0)?;
        EfError::check_range("max_lat", max_lat, min_lat, 90.0)?;
        EfError::check_range("min_lon", min_lon, -360.0, 360.0)?;
        EfError::check_range("max_lon", max_lon, min_lon, 360.0)?;
        Ok(Self {
            name: String::new(),
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// 设置名称
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Region for RectangularRegion {
    fn contains(&self, loc: &Location) -> bool {
        loc.lat >= self.min_lat
            && loc.lat <= self.max_lat
            && loc.lon >= self.min_lon
            && loc.lon <= self.max_lon
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 圆形区域（大圆距离半径，含边界）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircularRegion {
    /// 名称
    pub name: String,
    /// 中心
    pub center: Location,
    /// 半径 (km)
    pub radius_km: f64,
}

impl CircularRegion {
    /// 创建圆形区域
    pub fn new(center: Location, radius_km: f64) -> EfResult<Self> {
        EfError::check_positive("radius_km", radius_km)?;
        Ok(Self {
            name: String::new(),
            center,
            radius_km,
        })
    }
}

impl Region for CircularRegion {
    fn contains(&self, loc: &Location) -> bool {
        horz_distance(&self.center, loc) <= self.radius_km
    }

    fn name(&self) -> &str {
        &self.name
    }
}
