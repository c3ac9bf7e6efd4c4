// crates/erf_surface/src/surface.rs

//! 破裂面能力抽象
//!
//! 核心层把破裂面视为不透明能力：点距离查询、可选的子面分解、
//! 粗略距离估计以及保持具体类型的浅拷贝。

use crate::point::PointSurface;
use erf_geo::{Location, LocationList, Region};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// 地震发生层顶部深度 (km)，用于 seis 距离
pub const SEIS_DEPTH: f64 = 3.0;

/// 共享破裂面引用
pub type SurfaceRef = Arc<dyn RuptureSurface>;

/// 场点到破裂面的三种距离 (km)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDistances {
    /// 到破裂面的最短距离
    pub rupture: f64,
    /// Joyner-Boore 距离（到地表投影的最短水平距离）
    pub jb: f64,
    /// 到发震深度以下破裂面的最短距离
    pub seis: f64,
}

impl SurfaceDistances {
    /// 由水平距离与深度构造
    pub fn from_jb_and_depth(jb: f64, depth: f64) -> Self {
        let seis_depth = depth.max(SEIS_DEPTH);
        Self {
            rupture: jb.hypot(depth),
            jb,
            seis: jb.hypot(seis_depth),
        }
    }

    /// 逐分量取最小值
    pub fn min(self, other: Self) -> Self {
        Self {
            rupture: self.rupture.min(other.rupture),
            jb: self.jb.min(other.jb),
            seis: self.seis.min(other.seis),
        }
    }
}

/// 破裂面种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// 未解析的点表示
    Point,
    /// 几何已解析的有限面
    Finite,
    /// 由若干子面组成
    Compound,
    /// 距离缓存代理
    Cached,
}

/// 破裂面能力
pub trait RuptureSurface: Send + Sync + Debug {
    /// 三种距离
    fn distances(&self, site: &Location) -> SurfaceDistances;

    /// 沿走向法向的有符号水平距离 (km)，上盘为正
    fn distance_x(&self, site: &Location) -> f64;

    /// 粗略距离估计，用于快速筛选
    fn quick_distance(&self, site: &Location) -> f64;

    /// 破裂面种类
    fn kind(&self) -> SurfaceKind;

    /// 是否可由距离缓存代理包装
    fn is_cache_eligible(&self) -> bool;

    /// 子面分解
    fn components(&self) -> Option<&[SurfaceRef]> {
        None
    }

    /// 点面视图
    fn as_point(&self) -> Option<&PointSurface> {
        None
    }

    /// 可变点面视图
    fn as_point_mut(&mut self) -> Option<&mut PointSurface> {
        None
    }

    /// 保持具体类型的浅拷贝，共享不可变的几何数据
    fn copy_shallow(&self) -> SurfaceRef;

    /// 面上近似均匀分布的位置
    fn evenly_discretized_locations(&self) -> LocationList;

    /// 上边缘首尾两点
    fn upper_edge_endpoints(&self) -> (Location, Location);

    /// 平均倾角（度）
    fn ave_dip(&self) -> f64;

    /// 是否为有限面（非点表示）
    fn is_finite(&self) -> bool {
        self.kind() != SurfaceKind::Point
    }

    /// 区域内离散点所占比例
    fn fraction_in_region(&self, region: &dyn Region) -> f64 {
        let locs = self.evenly_discretized_locations();
        if locs.is_empty() {
            return 0.0;
        }
        let inside = locs.iter().filter(|loc| region.contains(loc)).count();
        inside as f64 / locs.len() as f64
    }
}

/// 两个共享引用是否指向同一破裂面实例
#[inline]
pub fn same_surface(a: &SurfaceRef, b: &SurfaceRef) -> bool {
    surface_id(a) == surface_id(b)
}

/// 破裂面实例的身份键（数据指针地址）
#[inline]
pub fn surface_id(surface: &SurfaceRef) -> usize {
    Arc::as_ptr(surface) as *const () as usize
}
