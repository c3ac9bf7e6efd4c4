// crates/erf_core/src/point/data.rs

//! 点源紧凑数据与破裂面构造器
//!
//! 点源数据按破裂编号提供震级、滑动角、破裂面、有限性与震源位置。
//! 装配函数从震级-频度分布生成数据：零发生率分档直接丢弃；
//! 只有当某个 (震级, 描述符) 有多个候选破裂面时才存储逐破裂的破裂面编号。

use crate::mfd::MagFreqDist;
use erf_config::FocalMechKind;
use erf_foundation::weighted::is_normalized_sum;
use erf_foundation::{EfError, EfResult, WeightedList};
use erf_geo::Location;
use erf_surface::correction::rupture_length_km;
use erf_surface::{LineSurface, PointSurface, SurfaceRef};
use std::sync::Arc;

/// 点源数据
pub trait PointSourceData: Send + Sync {
    /// 破裂数
    fn num_ruptures(&self) -> usize;

    /// 第 i 个破裂的震级
    fn magnitude(&self, index: usize) -> f64;

    /// 第 i 个破裂的滑动角
    fn rake(&self, index: usize) -> f64;

    /// 第 i 个破裂的破裂面
    fn surface(&self, index: usize) -> EfResult<SurfaceRef>;

    /// 第 i 个破裂是否已有解析的有限面（有限面不做距离校正）
    fn is_finite(&self, index: usize) -> bool;

    /// 由震源位置与（可能已校正的）破裂面确定震源
    fn hypocenter(
        &self,
        source_location: &Location,
        surface: &SurfaceRef,
        index: usize,
    ) -> Option<Location>;
}

/// 以年发生率表示的点源数据
pub trait RatePointSourceData: PointSourceData {
    /// 第 i 个破裂的年发生率
    fn rate(&self, index: usize) -> f64;
}

/// 以已解析概率表示的点源数据
pub trait ProbabilityPointSourceData: PointSourceData {
    /// 第 i 个破裂的发生概率
    fn probability(&self, index: usize) -> f64;
}

/// 震源机制
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalMechanism {
    /// 走向（度）
    pub strike: f64,
    /// 倾角（度）
    pub dip: f64,
    /// 滑动角（度）
    pub rake: f64,
}

impl FocalMechanism {
    /// 创建并校验
    pub fn new(strike: f64, dip: f64, rake: f64) -> EfResult<Self> {
        EfError::check_finite("strike", strike)?;
        EfError::check_range("dip", dip, 0.0, 90.0)?;
        EfError::check_range("rake", rake, -180.0, 180.0)?;
        Ok(Self { strike, dip, rake })
    }
}

impl From<FocalMechKind> for FocalMechanism {
    fn from(kind: FocalMechKind) -> Self {
        Self {
            strike: 0.0,
            dip: kind.dip(),
            rake: kind.rake(),
        }
    }
}

/// 破裂面构造器，`T` 为破裂描述符（通常是震源机制）
pub trait RuptureSurfaceBuilder<T>: Send + Sync {
    /// 候选破裂面数（至少 1）
    fn num_surfaces(&self, magnitude: f64, descriptor: &T) -> usize;

    /// 第 `surface_index` 个候选破裂面
    fn surface(
        &self,
        source_location: &Location,
        magnitude: f64,
        descriptor: &T,
        surface_index: usize,
    ) -> EfResult<SurfaceRef>;

    /// 候选破裂面权重，同一 (震级, 描述符) 的权重和为 1
    fn surface_weight(&self, magnitude: f64, descriptor: &T, surface_index: usize) -> f64;

    /// 候选破裂面是否为有限面
    fn is_surface_finite(&self, magnitude: f64, descriptor: &T, surface_index: usize) -> bool;

    /// 震源位置规则
    fn hypocenter(&self, source_location: &Location, surface: &SurfaceRef) -> Option<Location>;

    /// 描述符对应的滑动角
    fn rake(&self, descriptor: &T) -> f64;

    /// 全部候选破裂面及其权重，权重必须归一化
    fn surfaces(
        &self,
        source_location: &Location,
        magnitude: f64,
        descriptor: &T,
    ) -> EfResult<WeightedList<SurfaceRef>> {
        let count = self.num_surfaces(magnitude, descriptor);
        let pairs = (0..count)
            .map(|i| {
                Ok((
                    self.surface(source_location, magnitude, descriptor, i)?,
                    self.surface_weight(magnitude, descriptor, i),
                ))
            })
            .collect::<EfResult<Vec<_>>>()?;
        WeightedList::new(pairs)
    }
}

/// 共享破裂面构造器
pub type SurfaceBuilderRef<T> = Arc<dyn RuptureSurfaceBuilder<T>>;

/// 真点面构造器：单一点面，深度固定
#[derive(Debug, Clone, Copy)]
pub struct TruePointSurfaceBuilder {
    depth: f64,
}

impl TruePointSurfaceBuilder {
    /// 创建构造器
    pub fn new(depth: f64) -> EfResult<Self> {
        EfError::check_finite("depth", depth)?;
        Ok(Self { depth })
    }
}

impl RuptureSurfaceBuilder<FocalMechanism> for TruePointSurfaceBuilder {
    fn num_surfaces(&self, _magnitude: f64, _mech: &FocalMechanism) -> usize {
        1
    }

    fn surface(
        &self,
        source_location: &Location,
        _magnitude: f64,
        mech: &FocalMechanism,
        surface_index: usize,
    ) -> EfResult<SurfaceRef> {
        EfError::check_index("surface", surface_index, 1)?;
        let surface = PointSurface::with_dip(source_location.with_depth(self.depth), mech.dip)?;
        Ok(Arc::new(surface))
    }

    fn surface_weight(&self, _magnitude: f64, _mech: &FocalMechanism, _surface_index: usize) -> f64 {
        1.0
    }

    fn is_surface_finite(&self, _magnitude: f64, _mech: &FocalMechanism, _surface_index: usize) -> bool {
        false
    }

    fn hypocenter(&self, source_location: &Location, _surface: &SurfaceRef) -> Option<Location> {
        Some(*source_location)
    }

    fn rake(&self, mech: &FocalMechanism) -> f64 {
        mech.rake
    }
}

/// 有限面构造器
///
/// 震级低于 `min_finite_mag` 时为点面；否则为每个候选走向生成一条
/// 以震源位置为中心、长度按震级缩放的线面，各走向等权。
#[derive(Debug, Clone)]
pub struct FiniteSurfaceBuilder {
    strikes: Vec<f64>,
    min_finite_mag: f64,
    depth: f64,
}

impl FiniteSurfaceBuilder {
    /// 创建构造器，至少一个候选走向
    pub fn new(strikes: Vec<f64>, min_finite_mag: f64, depth: f64) -> EfResult<Self> {
        if strikes.is_empty() {
            return Err(EfError::invalid_input("有限面构造器至少需要一个候选走向"));
        }
        for &strike in &strikes {
            EfError::check_finite("strike", strike)?;
        }
        EfError::check_finite("min_finite_mag", min_finite_mag)?;
        EfError::check_finite("depth", depth)?;
        Ok(Self {
            strikes,
            min_finite_mag,
            depth,
        })
    }

    fn is_finite_mag(&self, magnitude: f64) -> bool {
        magnitude >= self.min_finite_mag
    }
}

impl RuptureSurfaceBuilder<FocalMechanism> for FiniteSurfaceBuilder {
    fn num_surfaces(&self, magnitude: f64, _mech: &FocalMechanism) -> usize {
        if self.is_finite_mag(magnitude) {
            self.strikes.len()
        } else {
            1
        }
    }

    fn surface(
        &self,
        source_location: &Location,
        magnitude: f64,
        mech: &FocalMechanism,
        surface_index: usize,
    ) -> EfResult<SurfaceRef> {
        EfError::check_index("surface", surface_index, self.num_surfaces(magnitude, mech))?;
        let center = source_location.with_depth(self.depth);
        if !self.is_finite_mag(magnitude) {
            return Ok(Arc::new(PointSurface::with_dip(center, mech.dip)?));
        }
        let line = LineSurface::centered(
            &center,
            self.strikes[surface_index],
            rupture_length_km(magnitude),
            mech.dip,
        )?;
        Ok(Arc::new(line))
    }

    fn surface_weight(&self, magnitude: f64, mech: &FocalMechanism, _surface_index: usize) -> f64 {
        1.0 / self.num_surfaces(magnitude, mech) as f64
    }

    fn is_surface_finite(&self, magnitude: f64, _mech: &FocalMechanism, _surface_index: usize) -> bool {
        self.is_finite_mag(magnitude)
    }

    fn hypocenter(&self, source_location: &Location, _surface: &SurfaceRef) -> Option<Location> {
        Some(source_location.with_depth(self.depth))
    }

    fn rake(&self, mech: &FocalMechanism) -> f64 {
        mech.rake
    }
}

// ============================================================================
// 震级-频度分布数据
// ============================================================================

/// 由震级-频度分布装配的泊松点源数据
pub struct MfdPointSourceData<T> {
    location: Location,
    builder: SurfaceBuilderRef<T>,
    descriptors: Vec<T>,
    magnitudes: Vec<f64>,
    rates: Vec<f64>,
    descriptor_index: Vec<usize>,
    surface_index: Option<Vec<u16>>,
}

impl<T> MfdPointSourceData<T> {
    /// 震源位置
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// 是否存储了逐破裂的破裂面编号
    pub fn has_surface_choices(&self) -> bool {
        self.surface_index.is_some()
    }

    fn descriptor(&self, index: usize) -> &T {
        &self.descriptors[self.descriptor_index[index]]
    }

    fn surface_choice(&self, index: usize) -> usize {
        self.surface_index
            .as_ref()
            .map_or(0, |choices| choices[index] as usize)
    }
}

impl<T: Send + Sync> PointSourceData for MfdPointSourceData<T> {
    fn num_ruptures(&self) -> usize {
        self.magnitudes.len()
    }

    fn magnitude(&self, index: usize) -> f64 {
        self.magnitudes[index]
    }

    fn rake(&self, index: usize) -> f64 {
        self.builder.rake(self.descriptor(index))
    }

    fn surface(&self, index: usize) -> EfResult<SurfaceRef> {
        self.builder.surface(
            &self.location,
            self.magnitudes[index],
            self.descriptor(index),
            self.surface_choice(index),
        )
    }

    fn is_finite(&self, index: usize) -> bool {
        self.builder.is_surface_finite(
            self.magnitudes[index],
            self.descriptor(index),
            self.surface_choice(index),
        )
    }

    fn hypocenter(
        &self,
        source_location: &Location,
        surface: &SurfaceRef,
        _index: usize,
    ) -> Option<Location> {
        self.builder.hypocenter(source_location, surface)
    }
}

impl<T: Send + Sync> RatePointSourceData for MfdPointSourceData<T> {
    fn rate(&self, index: usize) -> f64 {
        self.rates[index]
    }
}

/// 候选破裂面数，并校验其权重归一化
fn checked_surface_count<T>(
    builder: &dyn RuptureSurfaceBuilder<T>,
    magnitude: f64,
    descriptor: &T,
) -> EfResult<usize> {
    let count = builder.num_surfaces(magnitude, descriptor);
    if count == 0 || count > u16::MAX as usize {
        return Err(EfError::invalid_input(format!(
            "震级 {magnitude} 的候选破裂面数无效: {count}"
        )));
    }
    if count > 1 {
        let sum: f64 = (0..count)
            .map(|i| builder.surface_weight(magnitude, descriptor, i))
            .sum();
        if !is_normalized_sum(sum) {
            return Err(EfError::not_normalized(
                format!("震级 {magnitude} 的候选破裂面"),
                sum,
            ));
        }
    }
    Ok(count)
}

/// 各描述符的 (震级, 发生率) 序列 → 点源数据
fn assemble<T>(
    location: Location,
    entries: Vec<(T, Vec<(f64, f64)>)>,
    builder: SurfaceBuilderRef<T>,
) -> EfResult<MfdPointSourceData<T>> {
    let mut any_multiple = false;
    let mut retained = Vec::new();
    for (d, (descriptor, bins)) in entries.iter().enumerate() {
        for &(magnitude, rate) in bins {
            EfError::check_finite("rate", rate)?;
            if rate < 0.0 {
                return Err(EfError::invalid_input(format!("发生率不能为负: {rate}")));
            }
            if rate == 0.0 {
                continue;
            }
            let count = checked_surface_count(builder.as_ref(), magnitude, descriptor)?;
            any_multiple |= count > 1;
            retained.push((d, magnitude, rate, count));
        }
    }
    if retained.is_empty() {
        return Err(EfError::invalid_input(format!(
            "位置 {location} 没有非零发生率的破裂"
        )));
    }

    let capacity: usize = retained.iter().map(|r| r.3).sum();
    let mut magnitudes = Vec::with_capacity(capacity);
    let mut rates = Vec::with_capacity(capacity);
    let mut descriptor_index = Vec::with_capacity(capacity);
    let mut surface_index = any_multiple.then(|| Vec::with_capacity(capacity));
    for (d, magnitude, rate, count) in retained {
        for i in 0..count {
            let weighted = if count == 1 {
                rate
            } else {
                rate * builder.surface_weight(magnitude, &entries[d].0, i)
            };
            magnitudes.push(magnitude);
            rates.push(weighted);
            descriptor_index.push(d);
            if let Some(choices) = surface_index.as_mut() {
                choices.push(i as u16);
            }
        }
    }

    Ok(MfdPointSourceData {
        location,
        builder,
        descriptors: entries.into_iter().map(|(descriptor, _)| descriptor).collect(),
        magnitudes,
        rates,
        descriptor_index,
        surface_index,
    })
}

/// 单一震级与发生率
pub fn data_for_mag_rate<T>(
    location: Location,
    magnitude: f64,
    rate: f64,
    descriptor: T,
    builder: SurfaceBuilderRef<T>,
) -> EfResult<MfdPointSourceData<T>> {
    assemble(location, vec![(descriptor, vec![(magnitude, rate)])], builder)
}

/// 震级-频度分布与单一描述符
pub fn data_for_mfd<T>(
    location: Location,
    mfd: &MagFreqDist,
    descriptor: T,
    builder: SurfaceBuilderRef<T>,
) -> EfResult<MfdPointSourceData<T>> {
    assemble(location, vec![(descriptor, mfd.iter().collect())], builder)
}

/// 震级-频度分布按描述符权重拆分，权重和必须为 1（单精度）
pub fn data_for_mfd_weighted<T>(
    location: Location,
    mfd: &MagFreqDist,
    weights: Vec<(T, f64)>,
    builder: SurfaceBuilderRef<T>,
) -> EfResult<MfdPointSourceData<T>> {
    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if !is_normalized_sum(sum) {
        return Err(EfError::not_normalized("描述符权重", sum));
    }
    let entries = weights
        .into_iter()
        .map(|(descriptor, weight)| {
            EfError::check_range("weight", weight, 0.0, 1.0)?;
            Ok((descriptor, mfd.iter().map(|(m, r)| (m, r * weight)).collect()))
        })
        .collect::<EfResult<Vec<_>>>()?;
    assemble(location, entries, builder)
}

/// 每个描述符一个独立的震级-频度分布
pub fn data_for_mfds<T>(
    location: Location,
    mfds: Vec<(T, MagFreqDist)>,
    builder: SurfaceBuilderRef<T>,
) -> EfResult<MfdPointSourceData<T>> {
    let entries = mfds
        .into_iter()
        .map(|(descriptor, mfd)| {
            let bins = mfd.iter().collect();
            (descriptor, bins)
        })
        .collect();
    assemble(location, entries, builder)
}

// ============================================================================
// 非泊松破裂列表数据
// ============================================================================

/// 由 (震级, 概率, 描述符) 列表装配的非泊松点源数据
pub struct RuptureListPointSourceData<T> {
    location: Location,
    builder: SurfaceBuilderRef<T>,
    ruptures: Vec<(f64, f64, T)>,
    rupture_index: Vec<usize>,
    surface_index: Option<Vec<u16>>,
}

impl<T> RuptureListPointSourceData<T> {
    fn entry(&self, index: usize) -> &(f64, f64, T) {
        &self.ruptures[self.rupture_index[index]]
    }

    fn surface_choice(&self, index: usize) -> usize {
        self.surface_index
            .as_ref()
            .map_or(0, |choices| choices[index] as usize)
    }
}

impl<T: Send + Sync> PointSourceData for RuptureListPointSourceData<T> {
    fn num_ruptures(&self) -> usize {
        self.rupture_index.len()
    }

    fn magnitude(&self, index: usize) -> f64 {
        self.entry(index).0
    }

    fn rake(&self, index: usize) -> f64 {
        self.builder.rake(&self.entry(index).2)
    }

    fn surface(&self, index: usize) -> EfResult<SurfaceRef> {
        let (magnitude, _, descriptor) = self.entry(index);
        self.builder
            .surface(&self.location, *magnitude, descriptor, self.surface_choice(index))
    }

    fn is_finite(&self, index: usize) -> bool {
        let (magnitude, _, descriptor) = self.entry(index);
        self.builder
            .is_surface_finite(*magnitude, descriptor, self.surface_choice(index))
    }

    fn hypocenter(
        &self,
        source_location: &Location,
        surface: &SurfaceRef,
        _index: usize,
    ) -> Option<Location> {
        self.builder.hypocenter(source_location, surface)
    }
}

impl<T: Send + Sync> ProbabilityPointSourceData for RuptureListPointSourceData<T> {
    fn probability(&self, index: usize) -> f64 {
        let (magnitude, probability, descriptor) = self.entry(index);
        let count = self.builder.num_surfaces(*magnitude, descriptor);
        if count == 1 {
            *probability
        } else {
            probability * self.builder.surface_weight(*magnitude, descriptor, self.surface_choice(index))
        }
    }
}

/// 非泊松 (震级, 概率, 描述符) 列表，零概率破裂直接丢弃
pub fn data_for_rupture_list<T>(
    location: Location,
    ruptures: Vec<(f64, f64, T)>,
    builder: SurfaceBuilderRef<T>,
) -> EfResult<RuptureListPointSourceData<T>> {
    let mut any_multiple = false;
    let mut counts = Vec::with_capacity(ruptures.len());
    for (magnitude, probability, descriptor) in &ruptures {
        EfError::check_range("probability", *probability, 0.0, 1.0)?;
        if *probability == 0.0 {
            counts.push(0);
            continue;
        }
        let count = checked_surface_count(builder.as_ref(), *magnitude, descriptor)?;
        any_multiple |= count > 1;
        counts.push(count);
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Err(EfError::invalid_input(format!(
            "位置 {location} 没有非零概率的破裂"
        )));
    }

    let mut rupture_index = Vec::with_capacity(total);
    let mut surface_index = any_multiple.then(|| Vec::with_capacity(total));
    for (r, &count) in counts.iter().enumerate() {
        for s in 0..count {
            rupture_index.push(r);
            if let Some(choices) = surface_index.as_mut() {
                choices.push(s as u16);
            }
        }
    }

    Ok(RuptureListPointSourceData {
        location,
        builder,
        ruptures,
        rupture_index,
        surface_index,
    })
}
