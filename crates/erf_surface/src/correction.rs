// crates/erf_surface/src/correction.rs

//! 点源距离校正
//!
//! 点源以单点近似有限破裂，会高估近场距离。距离校正按震级缩短点面的
//! 有效水平距离，用多个带权校正（扇出）近似有限破裂的距离分布。
//!
//! 校正集合以 [`CorrectionList`] 表示，构造时强制权重归一化。

use erf_foundation::{EfError, EfResult, WeightedList};
use std::fmt::Debug;
use std::sync::Arc;

/// 共享距离校正
pub type CorrectionRef = Arc<dyn DistanceCorrection>;

/// 归一化的带权距离校正集合
pub type CorrectionList = WeightedList<CorrectionRef>;

/// 距离校正
pub trait DistanceCorrection: Send + Sync + Debug {
    /// 校正名称
    fn name(&self) -> &str;

    /// 校正后的 Joyner-Boore 距离 (km)
    fn corrected_jb(&self, magnitude: f64, horz_km: f64) -> f64;
}

/// 不做校正
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCorrection;

impl DistanceCorrection for NoCorrection {
    fn name(&self) -> &str {
        "none"
    }

    fn corrected_jb(&self, _magnitude: f64, horz_km: f64) -> f64 {
        horz_km
    }
}

/// 地表破裂长度 (km)，Wells & Coppersmith (1994) 全类型关系
#[inline]
pub fn rupture_length_km(magnitude: f64) -> f64 {
    10f64.powf(-3.22 + 0.69 * magnitude)
}

/// 分位数校正
///
/// 以半破裂长度的给定分位数缩短水平距离，下限为 0。
#[derive(Clone, Debug)]
pub struct FractileCorrection {
    name: String,
    fractile: f64,
}

impl FractileCorrection {
    /// 创建分位数校正，`fractile` 取值 [0, 1]
    pub fn new(fractile: f64) -> EfResult<Self> {
        EfError::check_range("fractile", fractile, 0.0, 1.0)?;
        Ok(Self {
            name: format!("fractile({fractile})"),
            fractile,
        })
    }

    /// 分位数
    pub fn fractile(&self) -> f64 {
        self.fractile
    }
}

impl DistanceCorrection for FractileCorrection {
    fn name(&self) -> &str {
        &self.name
    }

    fn corrected_jb(&self, magnitude: f64, horz_km: f64) -> f64 {
        let half_length = 0.5 * rupture_length_km(magnitude);
        (horz_km - self.fractile * half_length).max(0.0)
    }
}

/// 单一校正的集合
pub fn single_correction(correction: CorrectionRef) -> CorrectionList {
    WeightedList::single(correction)
}

/// 由 (分位数, 权重) 构造校正集合，权重必须归一化
pub fn fractile_corrections(pairs: &[(f64, f64)]) -> EfResult<CorrectionList> {
    let list = pairs
        .iter()
        .map(|&(fractile, weight)| {
            let correction: CorrectionRef = Arc::new(FractileCorrection::new(fractile)?);
            Ok((correction, weight))
        })
        .collect::<EfResult<Vec<_>>>()?;
    WeightedList::new(list)
}

/// 校正在点面上的应用状态
#[derive(Clone, Debug)]
pub struct AppliedCorrection {
    /// 校正
    pub correction: CorrectionRef,
    /// 所用震级
    pub magnitude: f64,
}
