// crates/erf_surface/src/point.rs

//! 点破裂面

use crate::correction::{AppliedCorrection, CorrectionRef};
use crate::surface::{RuptureSurface, SurfaceDistances, SurfaceKind, SurfaceRef};
use erf_foundation::{EfError, EfResult};
use erf_geo::location::{horz_distance, horz_distance_fast};
use erf_geo::{Location, LocationList};
use std::sync::Arc;

/// 未解析的点破裂面
///
/// 可携带一个已应用的距离校正，此时 jb 距离按校正后的值计算。
#[derive(Clone, Debug)]
pub struct PointSurface {
    location: Location,
    dip: f64,
    correction: Option<AppliedCorrection>,
}

impl PointSurface {
    /// 在给定位置创建点面（倾角 90°）
    pub fn new(location: Location) -> Self {
        Self {
            location,
            dip: 90.0,
            correction: None,
        }
    }

    /// 指定倾角
    pub fn with_dip(location: Location, dip: f64) -> EfResult<Self> {
        EfError::check_range("dip", dip, 0.0, 90.0)?;
        Ok(Self {
            location,
            dip,
            correction: None,
        })
    }

    /// 点面位置
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// 深度 (km)
    pub fn depth(&self) -> f64 {
        self.location.depth
    }

    /// 应用距离校正（覆盖已有校正）
    pub fn set_distance_correction(&mut self, correction: CorrectionRef, magnitude: f64) {
        self.correction = Some(AppliedCorrection {
            correction,
            magnitude,
        });
    }

    /// 清除距离校正
    pub fn clear_distance_correction(&mut self) {
        self.correction = None;
    }

    /// 已应用的距离校正
    pub fn distance_correction(&self) -> Option<&AppliedCorrection> {
        self.correction.as_ref()
    }

    fn corrected_jb(&self, horz_km: f64) -> f64 {
        match &self.correction {
            Some(applied) => applied
                .correction
                .corrected_jb(applied.magnitude, horz_km),
            None => horz_km,
        }
    }
}

impl RuptureSurface for PointSurface {
    fn distances(&self, site: &Location) -> SurfaceDistances {
        let jb = self.corrected_jb(horz_distance(&self.location, site));
        SurfaceDistances::from_jb_and_depth(jb, self.location.depth)
    }

    fn distance_x(&self, _site: &Location) -> f64 {
        // 点面没有走向
        0.0
    }

    fn quick_distance(&self, site: &Location) -> f64 {
        horz_distance_fast(&self.location, site)
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Point
    }

    fn is_cache_eligible(&self) -> bool {
        false
    }

    fn as_point(&self) -> Option<&PointSurface> {
        Some(self)
    }

    fn as_point_mut(&mut self) -> Option<&mut PointSurface> {
        Some(self)
    }

    fn copy_shallow(&self) -> SurfaceRef {
        Arc::new(self.clone())
    }

    fn evenly_discretized_locations(&self) -> LocationList {
        vec![self.location].into()
    }

    fn upper_edge_endpoints(&self) -> (Location, Location) {
        (self.location, self.location)
    }

    fn ave_dip(&self) -> f64 {
        self.dip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::FractileCorrection;

    fn surface() -> PointSurface {
        PointSurface::new(Location::new(34.0, -118.0, 5.0).unwrap())
    }

    #[test]
    fn test_point_distances() {
        let s = surface();
        let site = Location::new(34.0, -118.0, 0.0).unwrap();
        let d = s.distances(&site);
        assert!(d.jb.abs() < 1e-9);
        assert!((d.rupture - 5.0).abs() < 1e-9);
        assert!((d.seis - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_shallow_point_uses_seis_depth() {
        let s = PointSurface::new(Location::new(0.0, 0.0, 1.0).unwrap());
        let d = s.distances(&Location::new(0.0, 0.0, 0.0).unwrap());
        assert!((d.seis - crate::surface::SEIS_DEPTH).abs() < 1e-9);
    }

    #[test]
    fn test_correction_shortens_jb() {
        let mut s = surface();
        let site = Location::new(34.5, -118.0, 0.0).unwrap();
        let raw = s.distances(&site).jb;
        s.set_distance_correction(Arc::new(FractileCorrection::new(0.5).unwrap()), 7.0);
        let corrected = s.distances(&site).jb;
        assert!(corrected < raw);
        s.clear_distance_correction();
        assert_eq!(s.distances(&site).jb, raw);
    }

    #[test]
    fn test_copy_shallow_is_independent() {
        let s: SurfaceRef = Arc::new(surface());
        let mut copy = s.copy_shallow();
        Arc::get_mut(&mut copy)
            .and_then(|c| c.as_point_mut())
            .unwrap()
            .set_distance_correction(Arc::new(FractileCorrection::new(1.0).unwrap()), 7.0);
        assert!(s.as_point().unwrap().distance_correction().is_none());
        assert!(copy.as_point().unwrap().distance_correction().is_some());
    }
}
