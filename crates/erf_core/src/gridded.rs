// crates/erf_core/src/gridded.rs

//! 网格点源预测
//!
//! 由 [`ForecastConfig`] 构建：每个网格节点一个泊松点源，
//! Gutenberg-Richter 震级-频度分布按机制权重拆分，可选有限面与距离校正。
//!
//! 可调参数：
//!
//! | 名称 | 类型 | 含义 |
//! |------|------|------|
//! | `total_rate_scale` | Float | 每节点总发生率的缩放系数 |
//! | `apply_corrections` | Bool | 是否应用配置中的距离校正 |
//!
//! 配置 `parameters` 中的其他条目也会被声明，可读写但不影响震源。

use crate::forecast::{Forecast, ForecastState, TimeSpan};
use crate::mfd::MagFreqDist;
use crate::nth::{NthRuptureForecast, NthRuptureIndex};
use crate::point::data::{
    data_for_mfd_weighted, FiniteSurfaceBuilder, FocalMechanism, SurfaceBuilderRef,
    TruePointSurfaceBuilder,
};
use crate::point::engine::PointSource;
use crate::source::{SourceCacheKind, SourceRef};
use erf_config::{CorrectionKind, ForecastConfig, ParamValue};
use erf_foundation::{EfError, EfResult, WeightedList};
use erf_geo::Location;
use erf_surface::{CorrectionList, CorrectionRef};
use erf_surface::correction::{FractileCorrection, NoCorrection};
use std::sync::Arc;

/// 总发生率缩放参数名
pub const TOTAL_RATE_SCALE: &str = "total_rate_scale";
/// 距离校正开关参数名
pub const APPLY_CORRECTIONS: &str = "apply_corrections";

/// 网格点源预测
pub struct GriddedPointForecast {
    config: ForecastConfig,
    state: ForecastState,
    sources: Vec<SourceRef>,
    nth: NthRuptureIndex,
}

impl GriddedPointForecast {
    /// 由配置创建，需调用 `update_forecast` 后才有震源
    pub fn from_config(config: ForecastConfig) -> EfResult<Self> {
        config.validate()?;
        let mut state = ForecastState::new(config.duration_years)?;
        for (name, value) in &config.parameters {
            state.declare_parameter(name.clone(), value.clone());
        }
        state.declare_parameter(TOTAL_RATE_SCALE, ParamValue::Float(1.0));
        state.declare_parameter(
            APPLY_CORRECTIONS,
            ParamValue::Bool(!config.corrections.is_empty()),
        );
        Ok(Self {
            config,
            state,
            sources: Vec::new(),
            nth: NthRuptureIndex::new(),
        })
    }

    /// 配置
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// 自上次更新后配置是否改变
    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    fn float_parameter(&self, name: &str) -> EfResult<f64> {
        self.state
            .parameters()
            .get(name)
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| EfError::internal(format!("参数 {name} 缺失或不是数值")))
    }

    fn bool_parameter(&self, name: &str) -> EfResult<bool> {
        self.state
            .parameters()
            .get(name)
            .and_then(ParamValue::as_bool)
            .ok_or_else(|| EfError::internal(format!("参数 {name} 缺失或不是布尔值")))
    }

    fn surface_builder(&self) -> EfResult<SurfaceBuilderRef<FocalMechanism>> {
        let depth = self.config.grid.depth_km;
        Ok(match self.config.surfaces.finite_min_mag {
            Some(min_mag) => Arc::new(FiniteSurfaceBuilder::new(
                self.config.surfaces.strike_choices.clone(),
                min_mag,
                depth,
            )?),
            None => Arc::new(TruePointSurfaceBuilder::new(depth)?),
        })
    }

    fn corrections(&self) -> EfResult<Option<CorrectionList>> {
        if self.config.corrections.is_empty() || !self.bool_parameter(APPLY_CORRECTIONS)? {
            return Ok(None);
        }
        let pairs = self
            .config
            .corrections
            .iter()
            .map(|c| {
                let correction: CorrectionRef = match c.kind {
                    CorrectionKind::None => Arc::new(NoCorrection),
                    CorrectionKind::Fractile { fractile } => {
                        Arc::new(FractileCorrection::new(fractile)?)
                    }
                };
                Ok((correction, c.weight))
            })
            .collect::<EfResult<Vec<_>>>()?;
        Ok(Some(WeightedList::new(pairs)?))
    }

    fn build_sources(&self) -> EfResult<Vec<SourceRef>> {
        let scale = self.float_parameter(TOTAL_RATE_SCALE)?;
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(EfError::invalid_input(format!(
                "{TOTAL_RATE_SCALE} 必须为非负有限值: {scale}"
            )));
        }
        let mfd_config = &self.config.mfd;
        let mfd = MagFreqDist::gutenberg_richter(
            mfd_config.min_mag,
            mfd_config.max_mag,
            mfd_config.delta_mag,
            mfd_config.b_value,
            mfd_config.total_rate_per_node * scale,
        )?;
        let weights: Vec<(FocalMechanism, f64)> = self
            .config
            .mechanisms
            .iter()
            .map(|m| (FocalMechanism::from(m.mechanism), m.weight))
            .collect();
        let builder = self.surface_builder()?;
        let corrections = self.corrections()?;
        let duration = self.state.time_span().duration();
        let cache_kind = if self.config.cache_grid_sources {
            SourceCacheKind::CacheEligible
        } else {
            SourceCacheKind::Opaque
        };

        self.config
            .grid
            .nodes()
            .into_iter()
            .enumerate()
            .map(|(i, (lat, lon))| {
                let location = Location::new(lat, lon, 0.0)?;
                let data = data_for_mfd_weighted(
                    location,
                    &mfd,
                    weights.clone(),
                    Arc::clone(&builder),
                )?;
                let source = PointSource::poisson(
                    format!("{} #{i}", self.config.name),
                    location,
                    Arc::new(data),
                    duration,
                )?
                .with_corrections(corrections.clone(), self.config.min_mag_for_correction)?
                .with_cache_kind(cache_kind);
                Ok(Arc::new(source) as SourceRef)
            })
            .collect()
    }
}

impl Forecast for GriddedPointForecast {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn update_forecast(&mut self) -> EfResult<()> {
        if !self.state.is_dirty() {
            return Ok(());
        }
        let sources = self.build_sources()?;
        self.nth.invalidate();
        self.sources = sources;
        self.state.mark_updated();
        log::debug!(
            "网格预测 '{}' 已重建: 代际 {}, {} 个点源, 时长 {} 年",
            self.config.name,
            self.state.generation(),
            self.sources.len(),
            self.state.time_span().duration()
        );
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.state.generation()
    }

    fn time_span(&self) -> TimeSpan {
        self.state.time_span()
    }

    fn set_time_span(&mut self, duration_years: f64) -> EfResult<()> {
        self.state.set_time_span(duration_years)
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> EfResult<()> {
        self.state.set_parameter(name, value)
    }

    fn parameter(&self, name: &str) -> Option<ParamValue> {
        self.state.parameters().get(name).cloned()
    }

    fn num_sources(&self) -> usize {
        self.sources.len()
    }

    fn source(&self, index: usize) -> EfResult<SourceRef> {
        self.sources
            .get(index)
            .map(Arc::clone)
            .ok_or_else(|| EfError::index_out_of_bounds("source", index, self.sources.len()))
    }
}

impl NthRuptureForecast for GriddedPointForecast {
    fn nth_index(&self) -> &NthRuptureIndex {
        &self.nth
    }
}
