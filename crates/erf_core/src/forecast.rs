// crates/erf_core/src/forecast.rs

//! 地震破裂预测
//!
//! 预测是震源的有序序列加上可变配置（可调参数、预测时长）。
//! 配置的每次修改都推进代际计数并置脏标志；[`Forecast::update_forecast`]
//! 之后震源与破裂数才可信。派生缓存（全局编号、距离缓存包装）
//! 记录其构建代际，代际变化即重建。

use crate::nth::{NthRuptureForecast, NthRuptureIndex};
use crate::rupture::Rupture;
use crate::source::SourceRef;
use erf_config::ParamValue;
use erf_foundation::{EfError, EfResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 预测时段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    duration_years: f64,
}

impl TimeSpan {
    /// 创建时段，时长必须为有限正数
    pub fn new(duration_years: f64) -> EfResult<Self> {
        EfError::check_positive("duration_years", duration_years)?;
        Ok(Self { duration_years })
    }

    /// 时长（年）
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration_years
    }
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self {
            duration_years: 1.0,
        }
    }
}

/// 已声明的可调参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterList {
    /// 创建空列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明参数及其初值（已存在则覆盖）
    pub fn declare(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    /// 修改已声明参数，值类型必须一致（整数可写入浮点参数）
    pub fn set(&mut self, name: &str, value: ParamValue) -> EfResult<()> {
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| EfError::invalid_input(format!("未声明的参数: {name}")))?;
        let value = match (&*slot, value) {
            (ParamValue::Float(_), ParamValue::Int(v)) => ParamValue::Float(v as f64),
            (current, value)
                if std::mem::discriminant(current) == std::mem::discriminant(&value) =>
            {
                value
            }
            (current, value) => {
                return Err(EfError::invalid_input(format!(
                    "参数 {name} 类型不匹配: 当前 {current}, 新值 {value}"
                )))
            }
        };
        *slot = value;
        Ok(())
    }

    /// 读取参数
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// 是否已声明
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按名称顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// 预测实现共用的配置状态：代际、脏标志、时段与参数
#[derive(Debug, Clone, Default)]
pub struct ForecastState {
    generation: u64,
    dirty: bool,
    time_span: TimeSpan,
    parameters: ParameterList,
}

impl ForecastState {
    /// 以给定时长创建，初始为脏
    pub fn new(duration_years: f64) -> EfResult<Self> {
        Ok(Self {
            generation: 0,
            dirty: true,
            time_span: TimeSpan::new(duration_years)?,
            parameters: ParameterList::new(),
        })
    }

    /// 当前代际
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 自上次更新后配置是否改变
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 时段
    #[inline]
    pub fn time_span(&self) -> TimeSpan {
        self.time_span
    }

    /// 参数
    pub fn parameters(&self) -> &ParameterList {
        &self.parameters
    }

    /// 声明参数（初始化用，不推进代际）
    pub fn declare_parameter(&mut self, name: impl Into<String>, value: ParamValue) {
        self.parameters.declare(name, value);
    }

    /// 修改时长
    pub fn set_time_span(&mut self, duration_years: f64) -> EfResult<()> {
        self.time_span = TimeSpan::new(duration_years)?;
        self.touch();
        Ok(())
    }

    /// 修改参数
    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> EfResult<()> {
        self.parameters.set(name, value)?;
        self.touch();
        Ok(())
    }

    /// 记录一次配置改变
    pub fn touch(&mut self) {
        self.generation += 1;
        self.dirty = true;
    }

    /// 记录一次更新完成
    pub fn mark_updated(&mut self) {
        self.generation += 1;
        self.dirty = false;
    }
}

/// 取得 `&dyn Forecast` 的辅助 trait
pub trait AsDynForecast {
    /// 转为动态预测引用
    fn as_dyn_forecast(&self) -> &dyn Forecast;
}

impl<T: Forecast> AsDynForecast for T {
    fn as_dyn_forecast(&self) -> &dyn Forecast {
        self
    }
}

/// 地震破裂预测
pub trait Forecast: AsDynForecast + Send + Sync {
    /// 名称
    fn name(&self) -> &str;

    /// 应用配置改变，之后震源与破裂数才可信
    fn update_forecast(&mut self) -> EfResult<()>;

    /// 配置代际，任何可能改变震源内容的修改都会推进
    fn generation(&self) -> u64;

    /// 预测时段
    fn time_span(&self) -> TimeSpan;

    /// 修改预测时长
    fn set_time_span(&mut self, duration_years: f64) -> EfResult<()>;

    /// 修改可调参数
    fn set_parameter(&mut self, name: &str, value: ParamValue) -> EfResult<()>;

    /// 读取可调参数
    fn parameter(&self, name: &str) -> Option<ParamValue>;

    /// 震源数
    fn num_sources(&self) -> usize;

    /// 第 `index` 个震源
    fn source(&self, index: usize) -> EfResult<SourceRef>;

    /// 第 `source` 个震源的破裂数
    fn num_ruptures(&self, source: usize) -> EfResult<usize> {
        Ok(self.source(source)?.num_ruptures())
    }

    /// 第 `source` 个震源的第 `rupture` 个破裂
    fn rupture(&self, source: usize, rupture: usize) -> EfResult<Rupture> {
        self.source(source)?.rupture(rupture)
    }

    /// 只进的震源迭代器
    fn sources(&self) -> SourceIter<'_> {
        SourceIter::new(self.as_dyn_forecast())
    }
}

/// 震源迭代器
pub struct SourceIter<'a> {
    forecast: &'a dyn Forecast,
    next: usize,
    len: usize,
}

impl<'a> SourceIter<'a> {
    /// 从第 0 个震源开始
    pub fn new(forecast: &'a dyn Forecast) -> Self {
        Self {
            forecast,
            next: 0,
            len: forecast.num_sources(),
        }
    }
}

impl Iterator for SourceIter<'_> {
    type Item = EfResult<SourceRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let item = self.forecast.source(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.len - self.next;
        (rest, Some(rest))
    }
}

// ============================================================================
// 固定震源列表预测
// ============================================================================

/// 由固定震源列表组成的预测
pub struct SourceListForecast {
    name: String,
    sources: Vec<SourceRef>,
    state: ForecastState,
    nth: NthRuptureIndex,
}

impl SourceListForecast {
    /// 创建预测，时长 1 年
    pub fn new(name: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            name: name.into(),
            sources,
            state: ForecastState::default(),
            nth: NthRuptureIndex::new(),
        }
    }

    /// 声明可调参数
    pub fn with_parameter(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.state.declare_parameter(name, value);
        self
    }

    /// 替换全部震源
    pub fn set_sources(&mut self, sources: Vec<SourceRef>) {
        self.nth.invalidate();
        self.sources = sources;
        self.state.touch();
    }

    /// 追加震源
    pub fn push_source(&mut self, source: SourceRef) {
        self.nth.invalidate();
        self.sources.push(source);
        self.state.touch();
    }

    /// 自上次更新后配置是否改变
    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }
}

impl Forecast for SourceListForecast {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_forecast(&mut self) -> EfResult<()> {
        if self.state.is_dirty() {
            self.state.mark_updated();
            log::debug!(
                "预测 '{}' 已更新: 代际 {}, {} 个震源",
                self.name,
                self.state.generation(),
                self.sources.len()
            );
        }
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

impl NthRuptureForecast for SourceListForecast {
    fn nth_index(&self) -> &NthRuptureIndex {
        &self.nth
    }
}
