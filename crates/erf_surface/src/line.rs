// crates/erf_surface/src/line.rs

//! 线破裂面
//!
//! 由断层迹线（至少两点）与倾角定义的有限面。距离按迹线的地表投影计算：
//! jb 为到迹线各段的最短水平距离，破裂距离与 seis 距离再叠加迹线平均深度。

use crate::surface::{RuptureSurface, SurfaceDistances, SurfaceKind, SurfaceRef};
use erf_foundation::{EfError, EfResult};
use erf_geo::location::{azimuth, distance_to_segment_fast, horz_distance, location_at};
use erf_geo::{Location, LocationList};
use std::sync::Arc;

/// 离散化间距 (km)
const DISCR_KM: f64 = 1.0;

/// 线破裂面
#[derive(Clone, Debug)]
pub struct LineSurface {
    trace: Arc<LocationList>,
    dip: f64,
    depth: f64,
}

impl LineSurface {
    /// 创建线面
    pub fn new(trace: LocationList, dip: f64) -> EfResult<Self> {
        if trace.len() < 2 {
            return Err(EfError::invalid_input(format!(
                "线面迹线至少需要 2 个点, 实际 {}",
                trace.len()
            )));
        }
        EfError::check_range("dip", dip, 0.0, 90.0)?;

        let mut sum_len = 0.0;
        let mut sum_len_depth = 0.0;
        for pair in trace.as_slice().windows(2) {
            let len = horz_distance(&pair[0], &pair[1]);
            sum_len += len;
            sum_len_depth += len * 0.5 * (pair[0].depth + pair[1].depth);
        }
        let depth = if sum_len > 0.0 {
            sum_len_depth / sum_len
        } else {
            trace[0].depth
        };

        Ok(Self {
            trace: Arc::new(trace),
            dip,
            depth,
        })
    }

    /// 以中心点、走向和长度创建直线面
    pub fn centered(center: &Location, strike: f64, length_km: f64, dip: f64) -> EfResult<Self> {
        EfError::check_positive("length_km", length_km)?;
        let half = 0.5 * length_km;
        let start = location_at(center, strike + 180.0, half, 0.0);
        let end = location_at(center, strike, half, 0.0);
        Self::new(vec![start, end].into(), dip)
    }

    /// 迹线
    pub fn trace(&self) -> &LocationList {
        &self.trace
    }

    /// 长度加权平均深度 (km)
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// 迹线总长 (km)
    pub fn length(&self) -> f64 {
        self.trace
            .as_slice()
            .windows(2)
            .map(|pair| horz_distance(&pair[0], &pair[1]))
            .sum()
    }

    fn jb(&self, site: &Location) -> f64 {
        self.trace
            .as_slice()
            .windows(2)
            .map(|pair| distance_to_segment_fast(&pair[0], &pair[1], site))
            .fold(f64::INFINITY, f64::min)
    }
}

impl RuptureSurface for LineSurface {
    fn distances(&self, site: &Location) -> SurfaceDistances {
        SurfaceDistances::from_jb_and_depth(self.jb(site), self.depth)
    }

    fn distance_x(&self, site: &Location) -> f64 {
        let (first, last) = self.upper_edge_endpoints();
        let strike = azimuth(&first, &last);
        let to_site = azimuth(&first, site);
        let r = horz_distance(&first, site);
        r * (to_site - strike).to_radians().sin()
    }

    fn quick_distance(&self, site: &Location) -> f64 {
        self.distances(site).rupture
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Finite
    }

    fn is_cache_eligible(&self) -> bool {
        true
    }

    fn copy_shallow(&self) -> SurfaceRef {
        Arc::new(self.clone())
    }

    fn evenly_discretized_locations(&self) -> LocationList {
        let mut locs = LocationList::new();
        for pair in self.trace.as_slice().windows(2) {
            let len = horz_distance(&pair[0], &pair[1]);
            let az = azimuth(&pair[0], &pair[1]);
            let n = (len / DISCR_KM).ceil().max(1.0) as usize;
            let step = len / n as f64;
            let dz = (pair[1].depth - pair[0].depth) / n as f64;
            locs.push(pair[0]);
            for i in 1..n {
                locs.push(location_at(&pair[0], az, step * i as f64, dz * i as f64));
            }
        }
        if let Some(last) = self.trace.last() {
            locs.push(*last);
        }
        locs
    }

    fn upper_edge_endpoints(&self) -> (Location, Location) {
        // 构造保证至少两点
        (self.trace[0], self.trace[self.trace.len() - 1])
    }

    fn ave_dip(&self) -> f64 {
        self.dip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns_line() -> LineSurface {
        let trace: LocationList = vec![
            Location::new(34.0, -118.0, 0.0).unwrap(),
            Location::new(34.5, -118.0, 0.0).unwrap(),
        ]
        .into();
        LineSurface::new(trace, 90.0).unwrap()
    }

    #[test]
    fn test_requires_two_points() {
        let trace: LocationList = vec![Location::new(0.0, 0.0, 0.0).unwrap()].into();
        assert!(LineSurface::new(trace, 90.0).is_err());
    }

    #[test]
    fn test_site_on_trace_has_zero_jb() {
        let s = ns_line();
        let d = s.distances(&Location::new(34.25, -118.0, 0.0).unwrap());
        assert!(d.jb < 1e-6);
        assert!((d.seis - crate::surface::SEIS_DEPTH).abs() < 1e-6);
    }

    #[test]
    fn test_distance_x_sign() {
        let s = ns_line();
        // 向北走向，东侧为正
        assert!(s.distance_x(&Location::new(34.25, -117.9, 0.0).unwrap()) > 0.0);
        assert!(s.distance_x(&Location::new(34.25, -118.1, 0.0).unwrap()) < 0.0);
    }

    #[test]
    fn test_discretization_covers_length() {
        let s = ns_line();
        let locs = s.evenly_discretized_locations();
        assert!(locs.len() as f64 >= s.length() / DISCR_KM);
        assert_eq!(*locs.first().unwrap(), s.trace()[0]);
    }

    #[test]
    fn test_centered_length() {
        let c = Location::new(36.0, -120.0, 0.0).unwrap();
        let s = LineSurface::centered(&c, 45.0, 20.0, 90.0).unwrap();
        assert!((s.length() - 20.0).abs() < 1e-6);
    }
}
