// crates/erf_core/src/dist_cache.rs

//! 距离缓存包装预测
//!
//! 把整个预测包装成同形视图：可缓存的震源被替换为合成震源，
//! 其破裂面换成单值距离缓存代理 [`CachedSurface`]，
//! 同一物理破裂面（按实例身份）只包装一次。
//! 不可缓存的震源记为“延迟”，查询直接转给原预测；
//! 场点自适应震源的破裂随场点变化，同样延迟。
//!
//! 包装列表按原预测的代际懒构建；更新或参数变更使其整体作废，
//! 下次访问时完整重建，不做增量修补。
//!
//! 代理只记忆最近一次查询：同一包装面上不同场点的查询不应跨线程交错，
//! 每个工作线程宜持有自己的包装实例。

use crate::forecast::{Forecast, TimeSpan};
use crate::nth::{NthRuptureForecast, NthRuptureIndex};
use crate::rupture::Rupture;
use crate::source::{Source, SourceCacheKind, SourceRef, TectonicRegion};
use erf_config::ParamValue;
use erf_foundation::{EfError, EfResult, GenerationCell};
use erf_geo::LocationList;
use erf_surface::surface::surface_id;
use erf_surface::{CachedSurface, CompoundSurface, SurfaceKind, SurfaceRef};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// 包装面登记
// ============================================================================

/// 单次构建内的包装面登记表（实例身份 -> 包装面）
///
/// 登记表同时持有原始面，保证构建期间身份键对应的地址不被复用。
#[derive(Default)]
pub struct SurfaceCacheArena {
    ids: HashMap<usize, usize>,
    originals: Vec<SurfaceRef>,
    wrapped: Vec<SurfaceRef>,
}

impl SurfaceCacheArena {
    /// 空登记表
    pub fn new() -> Self {
        Self::default()
    }

    /// 已包装的不同破裂面数
    pub fn len(&self) -> usize {
        self.wrapped.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.wrapped.is_empty()
    }

    /// 取或创建破裂面的包装
    ///
    /// 复合面先逐个包装子面（已登记的直接复用），再以包装后的子面重建复合面并包装。
    /// 已是缓存代理的面原样返回。
    pub fn wrap(&mut self, surface: &SurfaceRef) -> EfResult<SurfaceRef> {
        if surface.kind() == SurfaceKind::Cached {
            return Ok(Arc::clone(surface));
        }
        let key = surface_id(surface);
        if let Some(&id) = self.ids.get(&key) {
            return Ok(Arc::clone(&self.wrapped[id]));
        }

        let inner: SurfaceRef = match surface.components() {
            Some(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| self.wrap(part))
                    .collect::<EfResult<Vec<_>>>()?;
                Arc::new(CompoundSurface::new(parts)?)
            }
            None => Arc::clone(surface),
        };
        let wrapped: SurfaceRef = Arc::new(CachedSurface::new(inner));

        self.ids.insert(key, self.wrapped.len());
        self.originals.push(Arc::clone(surface));
        self.wrapped.push(Arc::clone(&wrapped));
        Ok(wrapped)
    }
}

// ============================================================================
// 合成震源
// ============================================================================

/// 在包装面上重新暴露原破裂属性的震源
#[derive(Debug, Clone)]
pub struct CachedSurfaceSource {
    name: String,
    region: TectonicRegion,
    poisson: bool,
    cache_kind: SourceCacheKind,
    ruptures: Vec<Rupture>,
    surface: SurfaceRef,
    locations: LocationList,
}

impl CachedSurfaceSource {
    /// 包装一个震源的全部破裂
    ///
    /// 任一破裂面不可缓存，或震源具备场点自适应能力时返回 `None`。
    pub fn wrap(source: &dyn Source, arena: &mut SurfaceCacheArena) -> EfResult<Option<Self>> {
        if source.as_site_adaptive().is_some() {
            log::debug!("震源 '{}' 为场点自适应震源, 延迟到原预测", source.name());
            return Ok(None);
        }
        let ruptures = source.ruptures().collect::<EfResult<Vec<_>>>()?;
        if let Some(pos) = ruptures.iter().position(|r| !r.surface().is_cache_eligible()) {
            log::debug!(
                "震源 '{}' 第 {} 个破裂面不可缓存, 延迟到原预测",
                source.name(),
                pos
            );
            return Ok(None);
        }

        let source_surface = source.source_surface();
        let surface = if source_surface.is_cache_eligible() {
            arena.wrap(&source_surface)?
        } else {
            source_surface
        };
        let ruptures = ruptures
            .into_iter()
            .map(|rup| Ok(rup.with_surface(arena.wrap(rup.surface())?)))
            .collect::<EfResult<Vec<_>>>()?;

        Ok(Some(Self {
            name: source.name().to_string(),
            region: source.tectonic_region(),
            poisson: source.is_poisson(),
            cache_kind: source.cache_kind(),
            ruptures,
            surface,
            locations: source.source_locations(),
        }))
    }
}

impl Source for CachedSurfaceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_ruptures(&self) -> usize {
        self.ruptures.len()
    }

    fn rupture(&self, index: usize) -> EfResult<Rupture> {
        self.ruptures
            .get(index)
            .cloned()
            .ok_or_else(|| EfError::index_out_of_bounds("rupture", index, self.ruptures.len()))
    }

    fn tectonic_region(&self) -> TectonicRegion {
        self.region
    }

    fn is_poisson(&self) -> bool {
        self.poisson
    }

    fn source_surface(&self) -> SurfaceRef {
        Arc::clone(&self.surface)
    }

    fn source_locations(&self) -> LocationList {
        self.locations.clone()
    }

    fn cache_kind(&self) -> SourceCacheKind {
        self.cache_kind
    }
}

// ============================================================================
// 包装预测
// ============================================================================

struct WrappedSources {
    // None 表示延迟到原预测
    sources: Vec<Option<SourceRef>>,
    surfaces: usize,
}

impl WrappedSources {
    fn build<F: Forecast + ?Sized>(forecast: &F) -> Self {
        let mut arena = SurfaceCacheArena::new();
        let sources: Vec<Option<SourceRef>> = (0..forecast.num_sources())
            .map(|i| Self::wrap_one(forecast, i, &mut arena))
            .collect();
        let this = Self {
            sources,
            surfaces: arena.len(),
        };
        log::debug!(
            "距离缓存包装 '{}' 已构建: 代际 {}, 包装 {} 个震源, 延迟 {} 个, {} 个不同破裂面",
            forecast.name(),
            forecast.generation(),
            this.wrapped_count(),
            this.sources.len() - this.wrapped_count(),
            this.surfaces
        );
        this
    }

    fn wrap_one<F: Forecast + ?Sized>(
        forecast: &F,
        index: usize,
        arena: &mut SurfaceCacheArena,
    ) -> Option<SourceRef> {
        let source = match forecast.source(index) {
            Ok(source) => source,
            Err(err) => {
                log::debug!("距离缓存包装: 取第 {index} 个震源失败, 延迟: {err}");
                return None;
            }
        };
        if source.cache_kind() == SourceCacheKind::Opaque {
            return None;
        }
        match CachedSurfaceSource::wrap(source.as_ref(), arena) {
            Ok(wrapped) => wrapped.map(|s| Arc::new(s) as SourceRef),
            Err(err) => {
                log::debug!(
                    "距离缓存包装: 探测震源 '{}' 失败, 延迟: {err}",
                    source.name()
                );
                None
            }
        }
    }

    fn wrapped_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }
}

/// 距离缓存包装预测
pub struct DistCachedForecast<F> {
    original: F,
    wrapped: GenerationCell<WrappedSources>,
    nth: NthRuptureIndex,
}

impl<F: Forecast> DistCachedForecast<F> {
    /// 包装预测
    pub fn new(original: F) -> Self {
        Self {
            original,
            wrapped: GenerationCell::new(),
            nth: NthRuptureIndex::new(),
        }
    }

    /// 原预测
    pub fn original_forecast(&self) -> &F {
        &self.original
    }

    /// 原预测的可变引用；包装列表随之作废
    pub fn original_forecast_mut(&mut self) -> &mut F {
        self.invalidate();
        &mut self.original
    }

    /// 解除包装
    pub fn into_inner(self) -> F {
        self.original
    }

    /// 已包装的震源数
    pub fn wrapped_source_count(&self) -> EfResult<usize> {
        Ok(self.wrapped_sources()?.wrapped_count())
    }

    /// 延迟到原预测的震源数
    pub fn deferred_source_count(&self) -> EfResult<usize> {
        let wrapped = self.wrapped_sources()?;
        Ok(wrapped.sources.len() - wrapped.wrapped_count())
    }

    /// 包装列表是否已构建
    pub fn is_built(&self) -> bool {
        self.wrapped.is_ready()
    }

    fn wrapped_sources(&self) -> EfResult<Arc<WrappedSources>> {
        self.wrapped
            .get_or_build(self.original.generation(), || {
                Ok(WrappedSources::build(&self.original))
            })
    }

    fn invalidate(&self) {
        self.wrapped.invalidate();
        self.nth.invalidate();
    }
}

impl<F: Forecast> Forecast for DistCachedForecast<F> {
    fn name(&self) -> &str {
        self.original.name()
    }

    fn update_forecast(&mut self) -> EfResult<()> {
        self.original.update_forecast()?;
        self.invalidate();
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.original.generation()
    }

    fn time_span(&self) -> TimeSpan {
        self.original.time_span()
    }

    fn set_time_span(&mut self, duration_years: f64) -> EfResult<()> {
        self.original.set_time_span(duration_years)?;
        self.invalidate();
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> EfResult<()> {
        self.original.set_parameter(name, value)?;
        self.invalidate();
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<ParamValue> {
        self.original.parameter(name)
    }

    fn num_sources(&self) -> usize {
        self.original.num_sources()
    }

    fn source(&self, index: usize) -> EfResult<SourceRef> {
        let wrapped = self.wrapped_sources()?;
        match wrapped.sources.get(index) {
            Some(Some(source)) => Ok(Arc::clone(source)),
            _ => self.original.source(index),
        }
    }
}

impl<F: Forecast> NthRuptureForecast for DistCachedForecast<F> {
    fn nth_index(&self) -> &NthRuptureIndex {
        &self.nth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::SourceListForecast;
    use crate::mfd::MagFreqDist;
    use crate::source::{FaultRuptureSource, RuptureListSource};
    use erf_geo::Location;
    use erf_surface::surface::same_surface;
    use erf_surface::{LineSurface, PointSurface};

    fn line(lat: f64) -> SurfaceRef {
        let center = Location::new(lat, -118.0, 5.0).unwrap();
        Arc::new(LineSurface::centered(&center, 0.0, 20.0, 90.0).unwrap())
    }

    fn point() -> SurfaceRef {
        Arc::new(PointSurface::new(Location::new(34.0, -118.0, 5.0).unwrap()))
    }

    fn fault(surface: SurfaceRef) -> SourceRef {
        let mfd = MagFreqDist::new(vec![(6.5, 0.01), (7.0, 0.005)]).unwrap();
        Arc::new(FaultRuptureSource::new("fault", surface, mfd, 0.0, 1.0).unwrap())
    }

    fn list_forecast(sources: Vec<SourceRef>) -> SourceListForecast {
        let mut f = SourceListForecast::new("test", sources);
        f.update_forecast().unwrap();
        f
    }

    #[test]
    fn test_shared_surface_wrapped_once() {
        let wrapped = DistCachedForecast::new(list_forecast(vec![fault(line(34.0))]));
        let source = wrapped.source(0).unwrap();
        let r0 = source.rupture(0).unwrap();
        let r1 = source.rupture(1).unwrap();
        assert_eq!(r0.surface().kind(), SurfaceKind::Cached);
        assert!(same_surface(r0.surface(), r1.surface()));
        assert!(same_surface(r0.surface(), &source.source_surface()));
        assert_eq!(wrapped.wrapped_source_count().unwrap(), 1);
    }

    #[test]
    fn test_point_rupture_defers() {
        let rup = Rupture::with_probability(5.0, 0.0, 0.1, point(), None).unwrap();
        let src: SourceRef = Arc::new(RuptureListSource::from_ruptures("pt", vec![rup]).unwrap());
        let wrapped = DistCachedForecast::new(list_forecast(vec![Arc::clone(&src)]));
        assert_eq!(wrapped.deferred_source_count().unwrap(), 1);
        // 延迟的震源就是原实例
        let got = wrapped.source(0).unwrap();
        assert!(Arc::ptr_eq(&got, &src));
    }

    #[test]
    fn test_arena_reuses_compound_parts() {
        let a = line(34.0);
        let b = line(34.5);
        let compound: SurfaceRef =
            Arc::new(CompoundSurface::new(vec![Arc::clone(&a), Arc::clone(&b)]).unwrap());
        let mut arena = SurfaceCacheArena::new();
        let wa = arena.wrap(&a).unwrap();
        let wc = arena.wrap(&compound).unwrap();
        assert_eq!(arena.len(), 3);

        let parts = wc.components().unwrap();
        assert_eq!(parts.len(), 2);
        assert!(same_surface(&parts[0], &wa));
        assert!(same_surface(&parts[1], &arena.wrap(&b).unwrap()));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_wrapped_source_keeps_locations_and_kind() {
        let src = fault(line(34.0));
        let wrapped = CachedSurfaceSource::wrap(src.as_ref(), &mut SurfaceCacheArena::new())
            .unwrap()
            .unwrap();
        assert_eq!(wrapped.source_locations(), src.source_locations());
        assert_eq!(wrapped.cache_kind(), SourceCacheKind::FiniteSurface);

        // 代表面为点（不包装），破裂为有限面
        let rup = Rupture::with_probability(6.5, 0.0, 0.01, line(34.2), None).unwrap();
        let list = RuptureListSource::new("mixed", vec![rup], point());
        let got = CachedSurfaceSource::wrap(&list, &mut SurfaceCacheArena::new())
            .unwrap()
            .unwrap();
        assert_eq!(got.source_surface().kind(), SurfaceKind::Point);
        assert_eq!(got.source_locations(), list.source_locations());
        assert_eq!(got.cache_kind(), SourceCacheKind::CacheEligible);
    }

    #[test]
    fn test_update_invalidates() {
        let mut wrapped = DistCachedForecast::new(list_forecast(vec![fault(line(34.0))]));
        let before = wrapped.source(0).unwrap();
        assert!(wrapped.is_built());
        wrapped.set_time_span(30.0).unwrap();
        assert!(!wrapped.is_built());
        wrapped.update_forecast().unwrap();
        let after = wrapped.source(0).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.num_ruptures(), after.num_ruptures());
    }

    #[test]
    fn test_mutable_access_rebuilds_with_new_source() {
        let fault = fault(line(34.0));
        let mut f = SourceListForecast::new("test", vec![]);
        f.push_source(fault);
        f.update_forecast().unwrap();
        let mut wrapped = DistCachedForecast::new(f);
        assert_eq!(wrapped.wrapped_source_count().unwrap(), 1);
        let grid_point = Rupture::with_probability(5.0, 0.0, 0.1, point(), None).unwrap();
        wrapped.original_forecast_mut().push_source(Arc::new(
            RuptureListSource::from_ruptures("pt", vec![grid_point]).unwrap(),
        ));
        wrapped.update_forecast().unwrap();
        assert_eq!(wrapped.wrapped_source_count().unwrap(), 1);
        assert_eq!(wrapped.deferred_source_count().unwrap(), 1);
    }
}
