// crates/erf_surface/src/compound.rs

//! 复合破裂面

use crate::surface::{RuptureSurface, SurfaceDistances, SurfaceKind, SurfaceRef};
use erf_foundation::{EfError, EfResult};
use erf_geo::{Location, LocationList};
use std::sync::Arc;

/// 由有序子面组成的破裂面
///
/// 各距离取所有子面的最小值；distance_x 取破裂距离最小的子面。
#[derive(Clone, Debug)]
pub struct CompoundSurface {
    parts: Vec<SurfaceRef>,
}

impl CompoundSurface {
    /// 创建复合面，至少一个子面
    pub fn new(parts: Vec<SurfaceRef>) -> EfResult<Self> {
        if parts.is_empty() {
            return Err(EfError::invalid_input("复合面至少需要一个子面"));
        }
        Ok(Self { parts })
    }

    /// 子面列表
    pub fn parts(&self) -> &[SurfaceRef] {
        &self.parts
    }

    fn closest_part(&self, site: &Location) -> &SurfaceRef {
        let mut best = &self.parts[0];
        let mut best_dist = f64::INFINITY;
        for part in &self.parts {
            let d = part.distances(site).rupture;
            if d < best_dist {
                best_dist = d;
                best = part;
            }
        }
        best
    }
}

impl RuptureSurface for CompoundSurface {
    fn distances(&self, site: &Location) -> SurfaceDistances {
        self.parts
            .iter()
            .map(|part| part.distances(site))
            .reduce(SurfaceDistances::min)
            .unwrap_or(SurfaceDistances {
                rupture: f64::INFINITY,
                jb: f64::INFINITY,
                seis: f64::INFINITY,
            })
    }

    fn distance_x(&self, site: &Location) -> f64 {
        self.closest_part(site).distance_x(site)
    }

    fn quick_distance(&self, site: &Location) -> f64 {
        self.parts
            .iter()
            .map(|part| part.quick_distance(site))
            .fold(f64::INFINITY, f64::min)
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Compound
    }

    fn is_cache_eligible(&self) -> bool {
        self.parts.iter().all(|part| part.is_cache_eligible())
    }

    fn components(&self) -> Option<&[SurfaceRef]> {
        Some(&self.parts)
    }

    fn copy_shallow(&self) -> SurfaceRef {
        Arc::new(self.clone())
    }

    fn evenly_discretized_locations(&self) -> LocationList {
        self.parts
            .iter()
            .flat_map(|part| part.evenly_discretized_locations().as_slice().to_vec())
            .collect()
    }

    fn upper_edge_endpoints(&self) -> (Location, Location) {
        let (first, _) = self.parts[0].upper_edge_endpoints();
        let (_, last) = self.parts[self.parts.len() - 1].upper_edge_endpoints();
        (first, last)
    }

    fn ave_dip(&self) -> f64 {
        self.parts.iter().map(|part| part.ave_dip()).sum::<f64>() / self.parts.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineSurface;
    use crate::point::PointSurface;

    fn line(lat0: f64, lat1: f64) -> SurfaceRef {
        Arc::new(
            LineSurface::new(
                vec![
                    Location::new(lat0, -118.0, 0.0).unwrap(),
                    Location::new(lat1, -118.0, 0.0).unwrap(),
                ]
                .into(),
                90.0,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_min_over_parts() {
        let a = line(34.0, 34.2);
        let b = line(34.2, 34.4);
        let compound = CompoundSurface::new(vec![a.clone(), b.clone()]).unwrap();
        let site = Location::new(34.35, -117.95, 0.0).unwrap();
        let d = compound.distances(&site);
        assert!((d.jb - b.distances(&site).jb).abs() < 1e-12);
        assert!((compound.distance_x(&site) - b.distance_x(&site)).abs() < 1e-12);
    }

    #[test]
    fn test_eligibility_requires_all_parts() {
        let point: SurfaceRef = Arc::new(PointSurface::new(Location::new(34.0, -118.0, 5.0).unwrap()));
        let mixed = CompoundSurface::new(vec![line(34.0, 34.2), point]).unwrap();
        assert!(!mixed.is_cache_eligible());
        let all_lines = CompoundSurface::new(vec![line(34.0, 34.2), line(34.2, 34.4)]).unwrap();
        assert!(all_lines.is_cache_eligible());
        assert!(CompoundSurface::new(vec![]).is_err());
    }

    #[test]
    fn test_endpoints_span_parts() {
        let compound = CompoundSurface::new(vec![line(34.0, 34.2), line(34.2, 34.4)]).unwrap();
        let (first, last) = compound.upper_edge_endpoints();
        assert_eq!(first.lat, 34.0);
        assert_eq!(last.lat, 34.4);
    }
}
