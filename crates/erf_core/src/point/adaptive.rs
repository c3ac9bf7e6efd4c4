// crates/erf_core/src/point/adaptive.rs

//! 场点自适应点源
//!
//! 适配器按场点返回特化数据；返回的数据与原数据为同一实例时不做特化。
//! 离散适配器（只会产生少数几种特化）的结果按特化数据的实例身份记忆，
//! 相同特化复用已合成的点源。
//! 未命中时在锁外合成，并发未命中可能重复合成，最终只保留先写入记忆的一个。

use crate::point::data::PointSourceData;
use crate::point::engine::PointSource;
use crate::rupture::Rupture;
use crate::source::{SiteAdaptiveSource, SiteSpecific, Source, SourceCacheKind, SourceRef, TectonicRegion};
use erf_foundation::{EfError, EfResult};
use erf_geo::location::horz_distance;
use erf_geo::{Location, LocationList, Site};
use erf_surface::{CorrectionList, SurfaceRef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 场点自适应数据适配器
pub trait SiteAdaptiveData<D>: Send + Sync {
    /// 返回场点对应的数据，无需特化时返回 `base` 本身
    fn data_for_site(&self, base: &Arc<D>, site: &Site) -> EfResult<Arc<D>>;

    /// 是否只会产生有限几种特化
    fn is_discrete(&self) -> bool;
}

type Memo<D> = HashMap<usize, (Arc<D>, Arc<PointSource<D>>)>;

#[inline]
fn data_key<D>(data: &Arc<D>) -> usize {
    Arc::as_ptr(data) as usize
}

/// 场点自适应点源
pub struct SiteAdaptivePointSource<D> {
    base: PointSource<D>,
    adaptor: Arc<dyn SiteAdaptiveData<D>>,
    // 值中保留特化数据，保证键地址在记忆期间不被复用
    memo: RwLock<Memo<D>>,
}

impl<D: PointSourceData + 'static> SiteAdaptivePointSource<D> {
    /// 包装基础点源
    pub fn new(base: PointSource<D>, adaptor: Arc<dyn SiteAdaptiveData<D>>) -> Self {
        Self {
            base,
            adaptor,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// 基础点源
    pub fn base(&self) -> &PointSource<D> {
        &self.base
    }

    /// 已记忆的特化数
    pub fn memoized_count(&self) -> usize {
        self.memo.read().len()
    }

    /// 替换距离校正，并清空记忆（已合成点源内嵌了旧校正）
    pub fn set_distance_corrections(
        &mut self,
        corrections: Option<CorrectionList>,
        min_mag_for_correction: f64,
    ) -> EfResult<()> {
        self.base
            .set_distance_corrections(corrections, min_mag_for_correction)?;
        self.memo.write().clear();
        Ok(())
    }

    /// 为场点取特化点源
    pub fn specialize(&self, site: &Site) -> EfResult<Option<Arc<PointSource<D>>>> {
        let data = self.adaptor.data_for_site(self.base.data(), site)?;
        if Arc::ptr_eq(&data, self.base.data()) {
            return Ok(None);
        }
        if !self.adaptor.is_discrete() {
            return Ok(Some(Arc::new(self.base.with_data(data)?)));
        }

        let key = data_key(&data);
        if let Some((_, source)) = self.memo.read().get(&key) {
            log::trace!("点源 '{}' 场点特化命中记忆", self.base.name());
            return Ok(Some(Arc::clone(source)));
        }
        log::trace!("点源 '{}' 场点特化未命中, 合成新点源", self.base.name());
        let built = Arc::new(self.base.with_data(Arc::clone(&data))?);
        // 竞争时保留先插入者
        let mut memo = self.memo.write();
        let (_, source) = memo.entry(key).or_insert((data, built));
        Ok(Some(Arc::clone(source)))
    }
}

impl<D: PointSourceData + 'static> SiteAdaptiveSource for SiteAdaptivePointSource<D> {
    fn for_site(&self, site: &Site) -> EfResult<SiteSpecific> {
        Ok(match self.specialize(site)? {
            Some(source) => SiteSpecific::Specialized(source as SourceRef),
            None => SiteSpecific::Unchanged,
        })
    }
}

impl<D: PointSourceData + 'static> Source for SiteAdaptivePointSource<D> {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn num_ruptures(&self) -> usize {
        self.base.num_ruptures()
    }

    fn rupture(&self, index: usize) -> EfResult<Rupture> {
        self.base.rupture(index)
    }

    fn tectonic_region(&self) -> TectonicRegion {
        self.base.tectonic_region()
    }

    fn is_poisson(&self) -> bool {
        self.base.is_poisson()
    }

    fn source_surface(&self) -> SurfaceRef {
        self.base.source_surface()
    }

    fn source_locations(&self) -> LocationList {
        self.base.source_locations()
    }

    fn cache_kind(&self) -> SourceCacheKind {
        self.base.cache_kind()
    }

    fn as_site_adaptive(&self) -> Option<&dyn SiteAdaptiveSource> {
        Some(self)
    }
}

/// 按场点距离分档的离散适配器
///
/// 档位以最小距离 (km) 升序排列；场点距离不小于某档阈值时取该档中阈值最大者，
/// 近于所有阈值时使用基础数据。
pub struct DistanceTieredData<D> {
    location: Location,
    tiers: Vec<(f64, Arc<D>)>,
}

impl<D> DistanceTieredData<D> {
    /// 创建适配器，阈值必须为正且严格递增
    pub fn new(location: Location, tiers: Vec<(f64, Arc<D>)>) -> EfResult<Self> {
        for (i, (threshold, _)) in tiers.iter().enumerate() {
            EfError::check_positive("tier distance", *threshold)?;
            if i > 0 && *threshold <= tiers[i - 1].0 {
                return Err(EfError::invalid_input(format!(
                    "距离档阈值必须严格递增: 第 {i} 档 {threshold}"
                )));
            }
        }
        Ok(Self { location, tiers })
    }
}

impl<D: Send + Sync> SiteAdaptiveData<D> for DistanceTieredData<D> {
    fn data_for_site(&self, base: &Arc<D>, site: &Site) -> EfResult<Arc<D>> {
        let distance = horz_distance(&self.location, &site.location);
        let chosen = self
            .tiers
            .iter()
            .rev()
            .find(|(threshold, _)| distance >= *threshold)
            .map_or(base, |(_, data)| data);
        Ok(Arc::clone(chosen))
    }

    fn is_discrete(&self) -> bool {
        true
    }
}
