// crates/erf_core/src/rupture.rs

//! 破裂记录
//!
//! `Rupture` 构造后不可变。克隆得到共享视图（破裂面与原记录共享），
//! [`Rupture::deep_copy`] 得到独立拥有破裂面的稳定副本。

use erf_foundation::{EfError, EfResult};
use erf_geo::Location;
use erf_surface::SurfaceRef;

/// 年发生率转换为 `duration` 年内的泊松发生概率
///
/// `p = 1 - exp(-rate * duration)`
#[inline]
pub fn rate_to_prob(rate: f64, duration: f64) -> f64 {
    -(-rate * duration).exp_m1()
}

/// `duration` 年内的泊松发生概率转换为年发生率
///
/// `rate = -ln(1 - p) / duration`，与 [`rate_to_prob`] 互逆
#[inline]
pub fn prob_to_rate(probability: f64, duration: f64) -> f64 {
    -(-probability).ln_1p() / duration
}

/// 发生量
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Occurrence {
    /// 预测时段内的发生概率
    Probability(f64),
    /// 年发生率
    Rate(f64),
}

/// 破裂
#[derive(Debug, Clone)]
pub struct Rupture {
    magnitude: f64,
    rake: f64,
    occurrence: Occurrence,
    surface: SurfaceRef,
    hypocenter: Option<Location>,
}

impl Rupture {
    /// 以发生概率创建
    pub fn with_probability(
        magnitude: f64,
        rake: f64,
        probability: f64,
        surface: SurfaceRef,
        hypocenter: Option<Location>,
    ) -> EfResult<Self> {
        EfError::check_range("probability", probability, 0.0, 1.0)?;
        Self::validated(magnitude, rake, Occurrence::Probability(probability), surface, hypocenter)
    }

    /// 以年发生率创建
    pub fn with_rate(
        magnitude: f64,
        rake: f64,
        rate: f64,
        surface: SurfaceRef,
        hypocenter: Option<Location>,
    ) -> EfResult<Self> {
        EfError::check_finite("rate", rate)?;
        if rate < 0.0 {
            return Err(EfError::invalid_input(format!("发生率不能为负: {rate}")));
        }
        Self::validated(magnitude, rake, Occurrence::Rate(rate), surface, hypocenter)
    }

    fn validated(
        magnitude: f64,
        rake: f64,
        occurrence: Occurrence,
        surface: SurfaceRef,
        hypocenter: Option<Location>,
    ) -> EfResult<Self> {
        EfError::check_finite("magnitude", magnitude)?;
        EfError::check_range("rake", rake, -180.0, 180.0)?;
        Ok(Self {
            magnitude,
            rake,
            occurrence,
            surface,
            hypocenter,
        })
    }

    /// 震级
    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// 滑动角（度）
    #[inline]
    pub fn rake(&self) -> f64 {
        self.rake
    }

    /// 发生量
    #[inline]
    pub fn occurrence(&self) -> Occurrence {
        self.occurrence
    }

    /// 破裂面
    #[inline]
    pub fn surface(&self) -> &SurfaceRef {
        &self.surface
    }

    /// 震源
    #[inline]
    pub fn hypocenter(&self) -> Option<&Location> {
        self.hypocenter.as_ref()
    }

    /// `duration` 年内的发生概率
    pub fn probability(&self, duration: f64) -> f64 {
        match self.occurrence {
            Occurrence::Probability(p) => p,
            Occurrence::Rate(r) => rate_to_prob(r, duration),
        }
    }

    /// 等效年发生率
    pub fn mean_annual_rate(&self, duration: f64) -> f64 {
        match self.occurrence {
            Occurrence::Probability(p) => prob_to_rate(p, duration),
            Occurrence::Rate(r) => r,
        }
    }

    /// 以新的破裂面返回副本，其余属性不变
    pub fn with_surface(&self, surface: SurfaceRef) -> Self {
        Self {
            surface,
            ..self.clone()
        }
    }

    /// 独立拥有破裂面的副本
    pub fn deep_copy(&self) -> Self {
        self.with_surface(self.surface.copy_shallow())
    }
}
