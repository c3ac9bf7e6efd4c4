// crates/erf_core/src/point/engine.rs

//! 点源破裂合成
//!
//! `PointSource` 把紧凑的点源数据按需展开为破裂。
//!
//! # 编号布局
//!
//! - 校正数 ≤ 1：破裂编号与数据编号一一对应（`Direct`）；
//! - 校正数 K ≥ 2：构建两张并行索引表 `data_index` / `correction_index`，
//!   容量为 `数据破裂数 × K`。有限破裂（或震级低于校正下限）只占一项，
//!   校正编号为 -1；点面破裂每个校正占一项。未用容量以 -1 填充，永不读取。
//!
//! ```text
//! 数据:  [点, 有限, 点]        K = 2
//! data_index       [0, 0, 1, 2, 2, -1]
//! correction_index [0, 1, -1, 0, 1, -1]
//! 破裂数 5
//! ```

use crate::rupture::{rate_to_prob, Rupture};
use crate::source::{Source, SourceCacheKind, TectonicRegion};
use crate::point::data::{PointSourceData, ProbabilityPointSourceData, RatePointSourceData};
use erf_foundation::{EfError, EfResult};
use erf_geo::{Location, LocationList};
use erf_surface::{CorrectionList, CorrectionRef, PointSurface, SurfaceRef};
use std::fmt;
use std::sync::Arc;

/// 未使用的索引项
const UNUSED: i32 = -1;

/// 发生量模型
#[derive(Debug, Clone, Copy, PartialEq)]
enum OccurrenceModel {
    /// 年发生率按时长转换为概率
    Poisson { duration: f64 },
    /// 直接使用已解析概率
    NonPoisson,
}

/// 破裂编号布局
#[derive(Debug, Clone)]
enum Layout {
    Direct {
        count: usize,
    },
    Expanded {
        data_index: Vec<i32>,
        correction_index: Vec<i32>,
        count: usize,
    },
}

impl Layout {
    fn count(&self) -> usize {
        match self {
            Self::Direct { count } | Self::Expanded { count, .. } => *count,
        }
    }
}

/// 由点源数据合成破裂的震源
pub struct PointSource<D> {
    name: String,
    location: Location,
    data: Arc<D>,
    value_of: fn(&D, usize) -> f64,
    model: OccurrenceModel,
    region: TectonicRegion,
    corrections: Option<CorrectionList>,
    min_mag_for_correction: f64,
    layout: Layout,
    cache_kind: SourceCacheKind,
    surface: SurfaceRef,
}

impl<D: RatePointSourceData> PointSource<D> {
    /// 泊松点源：年发生率按 `duration` 年转换为概率
    pub fn poisson(
        name: impl Into<String>,
        location: Location,
        data: Arc<D>,
        duration: f64,
    ) -> EfResult<Self> {
        EfError::check_positive("duration", duration)?;
        Self::build(
            name.into(),
            location,
            data,
            <D as RatePointSourceData>::rate,
            OccurrenceModel::Poisson { duration },
        )
    }
}

impl<D: ProbabilityPointSourceData> PointSource<D> {
    /// 非泊松点源：直接使用数据中的概率
    pub fn non_poisson(name: impl Into<String>, location: Location, data: Arc<D>) -> EfResult<Self> {
        Self::build(
            name.into(),
            location,
            data,
            <D as ProbabilityPointSourceData>::probability,
            OccurrenceModel::NonPoisson,
        )
    }
}

impl<D: PointSourceData> PointSource<D> {
    fn build(
        name: String,
        location: Location,
        data: Arc<D>,
        value_of: fn(&D, usize) -> f64,
        model: OccurrenceModel,
    ) -> EfResult<Self> {
        let layout = Layout::Direct {
            count: data.num_ruptures(),
        };
        Ok(Self {
            name,
            location,
            data,
            value_of,
            model,
            region: TectonicRegion::default(),
            corrections: None,
            min_mag_for_correction: 0.0,
            layout,
            cache_kind: SourceCacheKind::Opaque,
            surface: Arc::new(PointSurface::new(location)),
        })
    }

    /// 设置构造区类型
    pub fn with_tectonic_region(mut self, region: TectonicRegion) -> Self {
        self.region = region;
        self
    }

    /// 设置距离缓存能力标签
    pub fn with_cache_kind(mut self, kind: SourceCacheKind) -> Self {
        self.cache_kind = kind;
        self
    }

    /// 设置距离校正
    pub fn with_corrections(
        mut self,
        corrections: Option<CorrectionList>,
        min_mag_for_correction: f64,
    ) -> EfResult<Self> {
        self.set_distance_corrections(corrections, min_mag_for_correction)?;
        Ok(self)
    }

    /// 替换距离校正并重算编号布局
    ///
    /// 震级低于 `min_mag_for_correction` 的破裂与有限破裂一样不做校正。
    pub fn set_distance_corrections(
        &mut self,
        corrections: Option<CorrectionList>,
        min_mag_for_correction: f64,
    ) -> EfResult<()> {
        if let Some(list) = &corrections {
            if !list.is_normalized() {
                return Err(EfError::not_normalized("距离校正", list.weight_sum()));
            }
        }
        if min_mag_for_correction.is_nan() {
            return Err(EfError::invalid_input("校正最小震级不能为 NaN"));
        }
        let layout = compute_layout(
            self.data.as_ref(),
            corrections.as_ref(),
            min_mag_for_correction,
        )?;
        self.corrections = corrections;
        self.min_mag_for_correction = min_mag_for_correction;
        self.layout = layout;
        Ok(())
    }

    /// 修改预测时长（仅泊松点源）
    pub fn set_duration(&mut self, duration: f64) -> EfResult<()> {
        match &mut self.model {
            OccurrenceModel::Poisson { duration: current } => {
                EfError::check_positive("duration", duration)?;
                *current = duration;
                Ok(())
            }
            OccurrenceModel::NonPoisson => Err(EfError::unsupported(format!(
                "非泊松点源 '{}' 没有预测时长",
                self.name
            ))),
        }
    }

    /// 预测时长（非泊松点源为 None）
    pub fn duration(&self) -> Option<f64> {
        match self.model {
            OccurrenceModel::Poisson { duration } => Some(duration),
            OccurrenceModel::NonPoisson => None,
        }
    }

    /// 去掉距离校正的副本
    pub fn uncorrected(&self) -> Self {
        let mut copy = self.clone();
        copy.corrections = None;
        copy.layout = Layout::Direct {
            count: self.data.num_ruptures(),
        };
        copy
    }

    /// 以新数据创建配置相同的点源
    pub fn with_data(&self, data: Arc<D>) -> EfResult<Self> {
        let layout = compute_layout(
            data.as_ref(),
            self.corrections.as_ref(),
            self.min_mag_for_correction,
        )?;
        Ok(Self {
            data,
            layout,
            ..self.clone()
        })
    }

    /// 点源数据
    pub fn data(&self) -> &Arc<D> {
        &self.data
    }

    /// 震源位置
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// 距离校正
    pub fn corrections(&self) -> Option<&CorrectionList> {
        self.corrections.as_ref()
    }

    /// 应用距离校正的最小震级
    pub fn min_mag_for_correction(&self) -> f64 {
        self.min_mag_for_correction
    }

    /// 泊松点源的总年发生率（数据发生率之和）
    pub fn total_equiv_mean_annual_rate(&self) -> EfResult<f64> {
        match self.model {
            OccurrenceModel::Poisson { .. } => Ok((0..self.data.num_ruptures())
                .map(|i| (self.value_of)(self.data.as_ref(), i))
                .sum()),
            OccurrenceModel::NonPoisson => Err(EfError::unsupported(format!(
                "非泊松点源 '{}' 没有等效年发生率",
                self.name
            ))),
        }
    }

    fn correction_applies(&self, data_index: usize) -> bool {
        !self.data.is_finite(data_index)
            && self.data.magnitude(data_index) >= self.min_mag_for_correction
    }

    /// 解析破裂编号为 (数据编号, 校正编号)
    fn resolve(&self, index: usize) -> EfResult<(usize, Option<usize>)> {
        match &self.layout {
            Layout::Direct { count } => {
                EfError::check_index("rupture", index, *count)?;
                let correction = match &self.corrections {
                    Some(_) if self.correction_applies(index) => Some(0),
                    _ => None,
                };
                Ok((index, correction))
            }
            Layout::Expanded {
                data_index,
                correction_index,
                count,
            } => {
                EfError::check_index("rupture", index, *count)?;
                let data = usize::try_from(data_index[index]).map_err(|_| {
                    EfError::internal(format!(
                        "点源 '{}' 破裂 {index} 的数据编号未填充",
                        self.name
                    ))
                })?;
                let correction = usize::try_from(correction_index[index]).ok();
                Ok((data, correction))
            }
        }
    }
}

impl<D: PointSourceData> Clone for PointSource<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            location: self.location,
            data: Arc::clone(&self.data),
            value_of: self.value_of,
            model: self.model,
            region: self.region,
            corrections: self.corrections.clone(),
            min_mag_for_correction: self.min_mag_for_correction,
            layout: self.layout.clone(),
            cache_kind: self.cache_kind,
            surface: Arc::clone(&self.surface),
        }
    }
}

impl<D> fmt::Debug for PointSource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointSource")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("model", &self.model)
            .field("num_ruptures", &self.layout.count())
            .field(
                "num_corrections",
                &self.corrections.as_ref().map_or(0, |c| c.len()),
            )
            .finish()
    }
}

/// 计算编号布局
fn compute_layout<D: PointSourceData + ?Sized>(
    data: &D,
    corrections: Option<&CorrectionList>,
    min_mag_for_correction: f64,
) -> EfResult<Layout> {
    let data_count = data.num_ruptures();
    let correction_count = corrections.map_or(0, |c| c.len());
    if correction_count <= 1 {
        return Ok(Layout::Direct { count: data_count });
    }

    let capacity = data_count.checked_mul(correction_count).ok_or_else(|| {
        EfError::invalid_input(format!(
            "破裂数 {data_count} × 校正数 {correction_count} 溢出"
        ))
    })?;
    let to_i32 = |i: usize| {
        i32::try_from(i).map_err(|_| EfError::invalid_input(format!("编号 {i} 超出 i32 范围")))
    };
    let mut data_index = vec![UNUSED; capacity];
    let mut correction_index = vec![UNUSED; capacity];
    let mut count = 0;
    for d in 0..data_count {
        if data.is_finite(d) || data.magnitude(d) < min_mag_for_correction {
            data_index[count] = to_i32(d)?;
            count += 1;
        } else {
            for c in 0..correction_count {
                data_index[count] = to_i32(d)?;
                correction_index[count] = to_i32(c)?;
                count += 1;
            }
        }
    }
    log::trace!(
        "点源编号展开: {} 个数据破裂 × {} 个校正 → {} 个破裂 (容量 {})",
        data_count,
        correction_count,
        count,
        capacity
    );
    Ok(Layout::Expanded {
        data_index,
        correction_index,
        count,
    })
}

/// 把校正应用到点面上，必要时先做浅拷贝
fn apply_correction(
    mut surface: SurfaceRef,
    correction: CorrectionRef,
    magnitude: f64,
    force_copy: bool,
) -> Option<SurfaceRef> {
    if force_copy {
        surface = surface.copy_shallow();
    }
    if let Some(point) = Arc::get_mut(&mut surface).and_then(|s| s.as_point_mut()) {
        point.set_distance_correction(correction, magnitude);
        return Some(surface);
    }
    // 破裂面被共享，改为修改副本
    let mut copy = surface.copy_shallow();
    let point = Arc::get_mut(&mut copy).and_then(|s| s.as_point_mut())?;
    point.set_distance_correction(correction, magnitude);
    Some(copy)
}

impl<D: PointSourceData + 'static> Source for PointSource<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_ruptures(&self) -> usize {
        self.layout.count()
    }

    fn rupture(&self, index: usize) -> EfResult<Rupture> {
        let (d, correction) = self.resolve(index)?;
        let magnitude = self.data.magnitude(d);
        let rake = self.data.rake(d);
        let mut surface = self.data.surface(d)?;

        let weight = match (correction, &self.corrections) {
            (Some(c), Some(list)) => {
                if surface.as_point().is_none() {
                    return Err(EfError::internal(format!(
                        "点源 '{}' 数据破裂 {d} 标记为非有限, 但破裂面类型为 {:?}",
                        self.name,
                        surface.kind()
                    )));
                }
                surface = apply_correction(
                    surface,
                    Arc::clone(list.value(c)),
                    magnitude,
                    list.len() > 1,
                )
                .ok_or_else(|| {
                    EfError::internal(format!(
                        "点源 '{}' 数据破裂 {d} 的破裂面副本不是独立点面",
                        self.name
                    ))
                })?;
                list.weight(c)
            }
            (Some(c), None) => {
                return Err(EfError::internal(format!(
                    "点源 '{}' 破裂 {index} 引用了校正 {c}, 但未配置校正",
                    self.name
                )))
            }
            (None, _) => 1.0,
        };

        let hypocenter = self.data.hypocenter(&self.location, &surface, d);
        let value = (self.value_of)(self.data.as_ref(), d);
        let probability = match self.model {
            OccurrenceModel::Poisson { duration } => rate_to_prob(value * weight, duration),
            OccurrenceModel::NonPoisson => value * weight,
        };
        Rupture::with_probability(magnitude, rake, probability, surface, hypocenter)
    }

    fn tectonic_region(&self) -> TectonicRegion {
        self.region
    }

    fn is_poisson(&self) -> bool {
        matches!(self.model, OccurrenceModel::Poisson { .. })
    }

    fn source_surface(&self) -> SurfaceRef {
        Arc::clone(&self.surface)
    }

    fn source_locations(&self) -> LocationList {
        vec![self.location].into()
    }

    fn cache_kind(&self) -> SourceCacheKind {
        self.cache_kind
    }
}
