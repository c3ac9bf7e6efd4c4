// crates/erf_core/src/source.rs

//! 震源
//!
//! 震源是 0 起始编号的破裂有序序列。具体类型差异通过
//! [`SourceCacheKind`] 能力标签表达，距离缓存包装按标签分派，
//! 不做运行时类型判断。

use crate::mfd::MagFreqDist;
use crate::rupture::{rate_to_prob, Rupture};
use erf_foundation::{EfError, EfResult};
use erf_geo::{LocationList, Site};
use erf_surface::{CompoundSurface, SurfaceRef};
use erf_surface::surface::surface_id;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 共享震源
pub type SourceRef = Arc<dyn Source>;

/// 构造区类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TectonicRegion {
    /// 活动浅层地壳
    #[default]
    ActiveShallow,
    /// 稳定浅层地壳
    StableShallow,
    /// 俯冲带界面
    SubductionInterface,
    /// 俯冲带板内
    SubductionSlab,
    /// 火山区
    Volcanic,
}

impl fmt::Display for TectonicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActiveShallow => "Active Shallow Crust",
            Self::StableShallow => "Stable Shallow Crust",
            Self::SubductionInterface => "Subduction Interface",
            Self::SubductionSlab => "Subduction IntraSlab",
            Self::Volcanic => "Volcanic",
        };
        f.write_str(name)
    }
}

/// 震源的距离缓存能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCacheKind {
    /// 所有破裂共享一个已解析的有限面
    FiniteSurface,
    /// 破裂面可能可缓存，需逐个探测
    CacheEligible,
    /// 不可缓存，查询直接委托给原震源
    Opaque,
}

/// 取得 `&dyn Source` 的辅助 trait，由空白实现覆盖所有震源
pub trait AsDynSource {
    /// 转为动态震源引用
    fn as_dyn_source(&self) -> &dyn Source;
}

impl<T: Source> AsDynSource for T {
    fn as_dyn_source(&self) -> &dyn Source {
        self
    }
}

/// 震源
pub trait Source: AsDynSource + Send + Sync {
    /// 名称
    fn name(&self) -> &str;

    /// 破裂数
    fn num_ruptures(&self) -> usize;

    /// 第 `index` 个破裂（共享视图，破裂面可能与震源共享）
    fn rupture(&self, index: usize) -> EfResult<Rupture>;

    /// 第 `index` 个破裂的独立副本
    fn rupture_deep_copy(&self, index: usize) -> EfResult<Rupture> {
        Ok(self.rupture(index)?.deep_copy())
    }

    /// 构造区类型
    fn tectonic_region(&self) -> TectonicRegion {
        TectonicRegion::default()
    }

    /// 是否为泊松震源
    fn is_poisson(&self) -> bool {
        true
    }

    /// 用于粗略距离筛选的代表性破裂面
    fn source_surface(&self) -> SurfaceRef;

    /// 代表性位置列表
    fn source_locations(&self) -> LocationList {
        self.source_surface().evenly_discretized_locations()
    }

    /// 到场点的粗略最小距离 (km)
    fn min_distance(&self, site: &Site) -> f64 {
        self.source_surface().quick_distance(&site.location)
    }

    /// 距离缓存能力
    fn cache_kind(&self) -> SourceCacheKind {
        SourceCacheKind::Opaque
    }

    /// 场点自适应能力
    fn as_site_adaptive(&self) -> Option<&dyn SiteAdaptiveSource> {
        None
    }

    /// 只进的破裂迭代器
    fn ruptures(&self) -> RuptureIter<'_> {
        RuptureIter::new(self.as_dyn_source())
    }

    /// 制表符分隔的震源摘要：编号、破裂数、是否泊松、`duration` 年总概率、名称
    fn metadata(&self, source_index: usize, duration: f64) -> EfResult<String> {
        let total = crate::calc::total_probability(self.as_dyn_source(), duration)?;
        Ok(format!(
            "{}\t{}\t{}\t{}\t\"{}\"",
            source_index,
            self.num_ruptures(),
            self.is_poisson(),
            total as f32,
            self.name()
        ))
    }
}

/// 破裂迭代器
pub struct RuptureIter<'a> {
    source: &'a dyn Source,
    next: usize,
    len: usize,
}

impl<'a> RuptureIter<'a> {
    /// 从第 0 个破裂开始
    pub fn new(source: &'a dyn Source) -> Self {
        Self {
            source,
            next: 0,
            len: source.num_ruptures(),
        }
    }
}

impl Iterator for RuptureIter<'_> {
    type Item = EfResult<Rupture>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let item = self.source.rupture(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.len - self.next;
        (rest, Some(rest))
    }
}

/// 场点特化结果
#[derive(Clone)]
pub enum SiteSpecific {
    /// 无需特化，使用原震源
    Unchanged,
    /// 特化后的震源
    Specialized(SourceRef),
}

impl fmt::Debug for SiteSpecific {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("Unchanged"),
            Self::Specialized(s) => write!(f, "Specialized({})", s.name()),
        }
    }
}

/// 场点自适应震源
pub trait SiteAdaptiveSource: Send + Sync {
    /// 为场点返回特化震源
    fn for_site(&self, site: &Site) -> EfResult<SiteSpecific>;
}

// ============================================================================
// 破裂列表震源
// ============================================================================

/// 由现成破裂组成的震源
#[derive(Debug, Clone)]
pub struct RuptureListSource {
    name: String,
    ruptures: Vec<Rupture>,
    surface: SurfaceRef,
    region: TectonicRegion,
    poisson: bool,
}

impl RuptureListSource {
    /// 指定代表性破裂面创建
    pub fn new(name: impl Into<String>, ruptures: Vec<Rupture>, source_surface: SurfaceRef) -> Self {
        Self {
            name: name.into(),
            ruptures,
            surface: source_surface,
            region: TectonicRegion::default(),
            poisson: true,
        }
    }

    /// 由破裂面推导代表性破裂面：全部共享一个面时取该面，否则组合所有不同的面
    pub fn from_ruptures(name: impl Into<String>, ruptures: Vec<Rupture>) -> EfResult<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        let mut distinct: Vec<SurfaceRef> = Vec::new();
        for rup in &ruptures {
            if seen.insert(surface_id(rup.surface())) {
                distinct.push(Arc::clone(rup.surface()));
            }
        }
        let surface: SurfaceRef = match distinct.len() {
            0 => {
                return Err(EfError::invalid_input(format!(
                    "震源 '{name}' 没有破裂, 无法推导破裂面"
                )))
            }
            1 => distinct.remove(0),
            _ => Arc::new(CompoundSurface::new(distinct)?),
        };
        Ok(Self::new(name, ruptures, surface))
    }

    /// 设置构造区类型
    pub fn with_tectonic_region(mut self, region: TectonicRegion) -> Self {
        self.region = region;
        self
    }

    /// 标记为非泊松震源
    pub fn non_poisson(mut self) -> Self {
        self.poisson = false;
        self
    }
}

impl Source for RuptureListSource {
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

    fn cache_kind(&self) -> SourceCacheKind {
        SourceCacheKind::CacheEligible
    }
}

// ============================================================================
// 断层破裂震源
// ============================================================================

/// 单一有限断层面上的泊松震源
///
/// 震级-频度分布中每个非零分档对应一个破裂，所有破裂共享同一破裂面。
#[derive(Debug, Clone)]
pub struct FaultRuptureSource {
    name: String,
    surface: SurfaceRef,
    mfd: MagFreqDist,
    rake: f64,
    duration: f64,
    bins: Vec<usize>,
    region: TectonicRegion,
}

impl FaultRuptureSource {
    /// 创建断层震源，破裂面必须为有限面
    pub fn new(
        name: impl Into<String>,
        surface: SurfaceRef,
        mfd: MagFreqDist,
        rake: f64,
        duration: f64,
    ) -> EfResult<Self> {
        let name = name.into();
        if !surface.is_finite() {
            return Err(EfError::invalid_input(format!(
                "断层震源 '{name}' 需要有限破裂面"
            )));
        }
        EfError::check_range("rake", rake, -180.0, 180.0)?;
        EfError::check_positive("duration", duration)?;
        let bins = mfd
            .iter()
            .enumerate()
            .filter(|(_, (_, rate))| *rate > 0.0)
            .map(|(i, _)| i)
            .collect();
        Ok(Self {
            name,
            surface,
            mfd,
            rake,
            duration,
            bins,
            region: TectonicRegion::default(),
        })
    }

    /// 设置构造区类型
    pub fn with_tectonic_region(mut self, region: TectonicRegion) -> Self {
        self.region = region;
        self
    }

    /// 预测时长（年）
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// 修改预测时长
    pub fn set_duration(&mut self, duration: f64) -> EfResult<()> {
        EfError::check_positive("duration", duration)?;
        self.duration = duration;
        Ok(())
    }

    /// 震级-频度分布
    pub fn mfd(&self) -> &MagFreqDist {
        &self.mfd
    }
}

impl Source for FaultRuptureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_ruptures(&self) -> usize {
        self.bins.len()
    }

    fn rupture(&self, index: usize) -> EfResult<Rupture> {
        let bin = *self
            .bins
            .get(index)
            .ok_or_else(|| EfError::index_out_of_bounds("rupture", index, self.bins.len()))?;
        Rupture::with_probability(
            self.mfd.magnitude(bin),
            self.rake,
            rate_to_prob(self.mfd.rate(bin), self.duration),
            Arc::clone(&self.surface),
            None,
        )
    }

    fn tectonic_region(&self) -> TectonicRegion {
        self.region
    }

    fn source_surface(&self) -> SurfaceRef {
        Arc::clone(&self.surface)
    }

    fn cache_kind(&self) -> SourceCacheKind {
        SourceCacheKind::FiniteSurface
    }
}
