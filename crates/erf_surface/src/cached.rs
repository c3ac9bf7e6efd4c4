// crates/erf_surface/src/cached.rs

//! 单值距离缓存代理
//!
//! `CachedSurface` 持有一个底层破裂面，只记忆最近一次查询的场点及其结果。
//! 这不是完整缓存：不同场点交替查询同一代理时每次都会重新计算，
//! 适用于单线程按场点逐个扫描的常见情形。

use crate::surface::{RuptureSurface, SurfaceDistances, SurfaceKind, SurfaceRef};
use erf_geo::{Location, LocationList};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct LastQuery {
    site: Location,
    distances: Option<SurfaceDistances>,
    distance_x: Option<f64>,
    quick: Option<f64>,
}

impl LastQuery {
    fn empty(site: Location) -> Self {
        Self {
            site,
            distances: None,
            distance_x: None,
            quick: None,
        }
    }
}

/// 记忆最近一次距离查询的破裂面代理
#[derive(Debug)]
pub struct CachedSurface {
    inner: SurfaceRef,
    last: Mutex<Option<LastQuery>>,
    computations: AtomicUsize,
}

impl CachedSurface {
    /// 包装底层破裂面
    pub fn new(inner: SurfaceRef) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
            computations: AtomicUsize::new(0),
        }
    }

    /// 底层破裂面
    pub fn inner(&self) -> &SurfaceRef {
        &self.inner
    }

    /// 实际委托给底层破裂面的计算次数
    pub fn computation_count(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    fn memoized<T: Copy>(
        &self,
        site: &Location,
        get: impl Fn(&LastQuery) -> Option<T>,
        set: impl Fn(&mut LastQuery, T),
        compute: impl FnOnce() -> T,
    ) -> T {
        {
            let last = self.last.lock();
            if let Some(query) = last.as_ref().filter(|q| q.site == *site) {
                if let Some(value) = get(query) {
                    return value;
                }
            }
        }

        // 计算期间不持锁
        let value = compute();
        self.computations.fetch_add(1, Ordering::Relaxed);

        let mut last = self.last.lock();
        match last.as_mut() {
            Some(query) if query.site == *site => set(query, value),
            _ => {
                let mut query = LastQuery::empty(*site);
                set(&mut query, value);
                *last = Some(query);
            }
        }
        value
    }
}

impl RuptureSurface for CachedSurface {
    fn distances(&self, site: &Location) -> SurfaceDistances {
        self.memoized(
            site,
            |q| q.distances,
            |q, v| q.distances = Some(v),
            || self.inner.distances(site),
        )
    }

    fn distance_x(&self, site: &Location) -> f64 {
        self.memoized(
            site,
            |q| q.distance_x,
            |q, v| q.distance_x = Some(v),
            || self.inner.distance_x(site),
        )
    }

    fn quick_distance(&self, site: &Location) -> f64 {
        self.memoized(
            site,
            |q| q.quick,
            |q, v| q.quick = Some(v),
            || self.inner.quick_distance(site),
        )
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Cached
    }

    fn is_cache_eligible(&self) -> bool {
        // 已包装，不再重复包装
        false
    }

    fn components(&self) -> Option<&[SurfaceRef]> {
        self.inner.components()
    }

    fn copy_shallow(&self) -> SurfaceRef {
        Arc::new(Self::new(Arc::clone(&self.inner)))
    }

    fn evenly_discretized_locations(&self) -> LocationList {
        self.inner.evenly_discretized_locations()
    }

    fn upper_edge_endpoints(&self) -> (Location, Location) {
        self.inner.upper_edge_endpoints()
    }

    fn ave_dip(&self) -> f64 {
        self.inner.ave_dip()
    }

    fn is_finite(&self) -> bool {
        self.inner.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineSurface;

    fn cached() -> CachedSurface {
        let line = LineSurface::new(
            vec![
                Location::new(34.0, -118.0, 2.0).unwrap(),
                Location::new(34.3, -118.0, 2.0).unwrap(),
            ]
            .into(),
            90.0,
        )
        .unwrap();
        CachedSurface::new(Arc::new(line))
    }

    #[test]
    fn test_repeated_site_hits_memo() {
        let s = cached();
        let site = Location::new(34.1, -117.8, 0.0).unwrap();
        let a = s.distances(&site);
        let b = s.distances(&site);
        assert_eq!(a, b);
        assert_eq!(s.computation_count(), 1);
        assert_eq!(a, s.inner().distances(&site));
    }

    #[test]
    fn test_new_site_replaces_memo() {
        let s = cached();
        let a = Location::new(34.1, -117.8, 0.0).unwrap();
        let b = Location::new(34.2, -117.7, 0.0).unwrap();
        s.distances(&a);
        s.distances(&b);
        s.distances(&a);
        assert_eq!(s.computation_count(), 3);
    }

    #[test]
    fn test_metrics_share_site_slot() {
        let s = cached();
        let site = Location::new(34.1, -117.8, 0.0).unwrap();
        s.distances(&site);
        s.distance_x(&site);
        s.distance_x(&site);
        s.distances(&site);
        assert_eq!(s.computation_count(), 2);
    }

    #[test]
    fn test_not_rewrapped() {
        let s = cached();
        assert!(!s.is_cache_eligible());
        assert_eq!(s.kind(), SurfaceKind::Cached);
        assert!(s.is_finite());
    }
}
