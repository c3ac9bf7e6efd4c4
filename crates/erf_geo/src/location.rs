// crates/erf_geo/src/location.rs

//! 地理位置与球面距离
//!
//! `Location` 以 (纬度, 经度, 深度) 存储，角度单位为度，深度单位为 km（向下为正）。
//!
//! # 距离计算
//!
//! - [`horz_distance`]: Haversine 公式（大圆距离）
//! - [`horz_distance_fast`]: 等距矩形近似，快约两个数量级，远距离不精确
//! - [`linear_distance`]: 考虑深度的三维直线距离
//!
//! 所有距离结果单位为 km。

use erf_foundation::{EfError, EfResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

// ============================================================================
// 地球物理常量
// ============================================================================

/// 地球平均半径 (km)
pub const EARTH_RADIUS_MEAN: f64 = 6_371.0088;

/// 位置比较容差（弧度与 km 共用）
pub const LOCATION_TOLERANCE: f64 = 1e-12;

/// 角度转弧度
#[inline]
pub(crate) fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// 弧度转角度
#[inline]
pub(crate) fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

// ============================================================================
// Location
// ============================================================================

/// 地理位置
///
/// # 示例
///
/// ```
/// use erf_geo::location::{horz_distance, Location};
///
/// let a = Location::new(34.0, -118.0, 0.0).unwrap();
/// let b = Location::new(35.0, -118.0, 0.0).unwrap();
/// let d = horz_distance(&a, &b);
/// assert!((d - 111.19).abs() < 0.1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// 纬度（度）
    pub lat: f64,
    /// 经度（度）
    pub lon: f64,
    /// 深度（km，向下为正）
    pub depth: f64,
}

impl Location {
    /// 创建位置，校验坐标范围
    pub fn new(lat: f64, lon: f64, depth: f64) -> EfResult<Self> {
        EfError::check_range("latitude", lat, -90.0, 90.0)?;
        EfError::check_range("longitude", lon, -360.0, 360.0)?;
        EfError::check_finite("depth", depth)?;
        Ok(Self { lat, lon, depth })
    }

    /// 地表位置
    pub fn surface(lat: f64, lon: f64) -> EfResult<Self> {
        Self::new(lat, lon, 0.0)
    }

    /// 以新深度返回副本
    #[inline]
    #[must_use]
    pub fn with_depth(self, depth: f64) -> Self {
        Self { depth, ..self }
    }

    /// 纬度（弧度）
    #[inline]
    pub fn lat_rad(&self) -> f64 {
        deg_to_rad(self.lat)
    }

    /// 经度（弧度）
    #[inline]
    pub fn lon_rad(&self) -> f64 {
        deg_to_rad(self.lon)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5},{:.3}", self.lat, self.lon, self.depth)
    }
}

// ============================================================================
// 距离与方位
// ============================================================================

/// 两点间的大圆夹角（弧度），Haversine 公式
#[inline]
pub fn angle(p1: &Location, p2: &Location) -> f64 {
    let lat1 = p1.lat_rad();
    let lat2 = p2.lat_rad();
    let dlat = lat2 - lat1;
    let dlon = p2.lon_rad() - p1.lon_rad();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// 水平大圆距离 (km)
#[inline]
pub fn horz_distance(p1: &Location, p2: &Location) -> f64 {
    EARTH_RADIUS_MEAN * angle(p1, p2)
}

/// 水平距离快速近似 (km)
///
/// 以纬度差和按平均纬度余弦缩放的经度差作为直角边。
/// 不支持跨越 ±180° 的输入。
#[inline]
pub fn horz_distance_fast(p1: &Location, p2: &Location) -> f64 {
    let lat1 = p1.lat_rad();
    let lat2 = p2.lat_rad();
    let dlat = lat1 - lat2;
    let dlon = (p1.lon_rad() - p2.lon_rad()) * ((lat1 + lat2) * 0.5).cos();
    EARTH_RADIUS_MEAN * (dlat * dlat + dlon * dlon).sqrt()
}

/// 垂直距离 (km)，保留符号
#[inline]
pub fn vert_distance(p1: &Location, p2: &Location) -> f64 {
    p2.depth - p1.depth
}

/// 三维直线距离 (km)
pub fn linear_distance(p1: &Location, p2: &Location) -> f64 {
    let alpha = angle(p1, p2);
    let r1 = EARTH_RADIUS_MEAN - p1.depth;
    let r2 = EARTH_RADIUS_MEAN - p2.depth;
    let b = r1 * alpha.sin();
    let c = r2 - r1 * alpha.cos();
    (b * b + c * c).sqrt()
}

/// 初始方位角（度，正北顺时针，[0, 360)）
pub fn azimuth(p1: &Location, p2: &Location) -> f64 {
    let lat1 = p1.lat_rad();
    let lat2 = p2.lat_rad();
    let dlon = p2.lon_rad() - p1.lon_rad();

    let x = lat2.cos() * dlon.sin();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    (rad_to_deg(x.atan2(y)) + 360.0) % 360.0
}

/// 由起点、方位角（度）、水平距离与垂直距离 (km) 计算终点
pub fn location_at(origin: &Location, azimuth_deg: f64, horz_km: f64, vert_km: f64) -> Location {
    let lat1 = origin.lat_rad();
    let lon1 = origin.lon_rad();
    let az = deg_to_rad(azimuth_deg);
    let delta = horz_km / EARTH_RADIUS_MEAN;
    let (sin_d, cos_d) = delta.sin_cos();

    let lat2 = (lat1.sin() * cos_d + lat1.cos() * sin_d * az.cos()).asin();
    let lon2 = lon1 + (az.sin() * sin_d * lat1.cos()).atan2(cos_d - lat1.sin() * lat2.sin());

    Location {
        lat: rad_to_deg(lat2),
        lon: rad_to_deg(lon2),
        depth: origin.depth + vert_km,
    }
}

/// 两位置在容差内是否相同
pub fn are_similar(p1: &Location, p2: &Location) -> bool {
    (p1.lat_rad() - p2.lat_rad()).abs() <= LOCATION_TOLERANCE
        && (p1.lon_rad() - p2.lon_rad()).abs() <= LOCATION_TOLERANCE
        && (p1.depth - p2.depth).abs() <= LOCATION_TOLERANCE
}

/// 点到线段的水平距离近似 (km)
///
/// 在线段起点处做局部等距投影后计算平面距离，适用于数百 km 以内。
pub fn distance_to_segment_fast(p1: &Location, p2: &Location, site: &Location) -> f64 {
    let cos_lat = p1.lat_rad().cos();
    let project = |loc: &Location| {
        (
            (loc.lon_rad() - p1.lon_rad()) * cos_lat * EARTH_RADIUS_MEAN,
            (loc.lat_rad() - p1.lat_rad()) * EARTH_RADIUS_MEAN,
        )
    };
    let (bx, by) = project(p2);
    let (px, py) = project(site);
    let len2 = bx * bx + by * by;
    let t = if len2 > 0.0 {
        ((px * bx + py * by) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = px - t * bx;
    let dy = py - t * by;
    (dx * dx + dy * dy).sqrt()
}

// ============================================================================
// LocationList
// ============================================================================

/// 有序位置列表
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationList(Vec<Location>);

impl LocationList {
    /// 空列表
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 追加位置
    pub fn push(&mut self, loc: Location) {
        self.0.push(loc);
    }

    /// 位置数量
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 第一个位置
    pub fn first(&self) -> Option<&Location> {
        self.0.first()
    }

    /// 最后一个位置
    pub fn last(&self) -> Option<&Location> {
        self.0.last()
    }

    /// 遍历
    pub fn iter(&self) -> std::slice::Iter<'_, Location> {
        self.0.iter()
    }

    /// 切片视图
    pub fn as_slice(&self) -> &[Location] {
        &self.0
    }

    /// 到列表中最近位置的水平距离 (km)，空列表返回正无穷
    pub fn min_horz_distance(&self, site: &Location) -> f64 {
        self.0
            .iter()
            .map(|loc| horz_distance(loc, site))
            .fold(f64::INFINITY, f64::min)
    }
}

impl From<Vec<Location>> for LocationList {
    fn from(locs: Vec<Location>) -> Self {
        Self(locs)
    }
}

impl FromIterator<Location> for LocationList {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LocationList {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for LocationList {
    type Output = Location;

    fn index(&self, index: usize) -> &Location {
        &self.0[index]
    }
}

// ============================================================================
// Site
// ============================================================================

/// 计算场点
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// 场点名称
    pub name: String,
    /// 场点位置
    pub location: Location,
}

impl Site {
    /// 创建场点
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    /// 匿名场点
    pub fn at(location: Location) -> Self {
        Self::new("", location)
    }
}
