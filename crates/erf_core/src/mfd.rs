// crates/erf_core/src/mfd.rs

//! 增量震级-频度分布
//!
//! 有序的 (震级, 年发生率) 对。只提供点源装配需要的最小功能。

use erf_foundation::{EfError, EfResult};

/// 地震矩 (N·m)，`M0 = 10^(1.5 M + 9.05)`
#[inline]
pub fn magnitude_to_moment(magnitude: f64) -> f64 {
    10f64.powf(1.5 * magnitude + 9.05)
}

/// 增量震级-频度分布
#[derive(Debug, Clone, PartialEq)]
pub struct MagFreqDist {
    points: Vec<(f64, f64)>,
}

impl MagFreqDist {
    /// 由 (震级, 发生率) 对创建，震级须严格递增，发生率须为非负有限值
    pub fn new(points: Vec<(f64, f64)>) -> EfResult<Self> {
        for (i, &(mag, rate)) in points.iter().enumerate() {
            EfError::check_finite("magnitude", mag)?;
            EfError::check_finite("rate", rate)?;
            if rate < 0.0 {
                return Err(EfError::invalid_input(format!(
                    "第 {i} 档发生率不能为负: {rate}"
                )));
            }
            if i > 0 && mag <= points[i - 1].0 {
                return Err(EfError::invalid_input(format!(
                    "震级必须严格递增: 第 {i} 档 {mag} <= {}",
                    points[i - 1].0
                )));
            }
        }
        Ok(Self { points })
    }

    /// 单一震级
    pub fn single(magnitude: f64, rate: f64) -> EfResult<Self> {
        Self::new(vec![(magnitude, rate)])
    }

    /// 等间距分档，发生率全为 0
    pub fn evenly(min_mag: f64, num: usize, delta: f64) -> EfResult<Self> {
        EfError::check_positive("delta", delta)?;
        Self::new((0..num).map(|i| (min_mag + i as f64 * delta, 0.0)).collect())
    }

    /// Gutenberg-Richter 分布：发生率正比于 `10^(-b M)`，总发生率为 `total_rate`
    pub fn gutenberg_richter(
        min_mag: f64,
        max_mag: f64,
        delta: f64,
        b_value: f64,
        total_rate: f64,
    ) -> EfResult<Self> {
        EfError::check_positive("delta", delta)?;
        EfError::check_finite("b_value", b_value)?;
        if max_mag < min_mag {
            return Err(EfError::invalid_input(format!(
                "最大震级 {max_mag} 小于最小震级 {min_mag}"
            )));
        }
        let num = ((max_mag - min_mag) / delta + 1e-9).floor() as usize + 1;
        let raw: Vec<(f64, f64)> = (0..num)
            .map(|i| {
                let mag = min_mag + i as f64 * delta;
                (mag, 10f64.powf(-b_value * mag))
            })
            .collect();
        let sum: f64 = raw.iter().map(|(_, r)| r).sum();
        Self::new(
            raw.into_iter()
                .map(|(mag, r)| (mag, total_rate * r / sum))
                .collect(),
        )
    }

    /// 设置第 i 档发生率
    pub fn set_rate(&mut self, index: usize, rate: f64) -> EfResult<()> {
        EfError::check_index("mfd bin", index, self.points.len())?;
        EfError::check_finite("rate", rate)?;
        if rate < 0.0 {
            return Err(EfError::invalid_input(format!("发生率不能为负: {rate}")));
        }
        self.points[index].1 = rate;
        Ok(())
    }

    /// 分档数
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 第 i 档震级
    #[inline]
    pub fn magnitude(&self, index: usize) -> f64 {
        self.points[index].0
    }

    /// 第 i 档发生率
    #[inline]
    pub fn rate(&self, index: usize) -> f64 {
        self.points[index].1
    }

    /// 遍历 (震级, 发生率)
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied()
    }

    /// 总发生率
    pub fn total_rate(&self) -> f64 {
        self.points.iter().map(|(_, r)| r).sum()
    }

    /// 不小于 `magnitude` 的累积发生率
    pub fn cumulative_rate_above(&self, magnitude: f64) -> f64 {
        self.points
            .iter()
            .filter(|(m, _)| *m >= magnitude)
            .map(|(_, r)| r)
            .sum()
    }

    /// 总地震矩率 (N·m/年)
    pub fn total_moment_rate(&self) -> f64 {
        self.points
            .iter()
            .map(|&(m, r)| r * magnitude_to_moment(m))
            .sum()
    }

    /// 按比例缩放发生率
    pub fn scaled(&self, factor: f64) -> EfResult<Self> {
        EfError::check_finite("factor", factor)?;
        if factor < 0.0 {
            return Err(EfError::invalid_input(format!("缩放系数不能为负: {factor}")));
        }
        Ok(Self {
            points: self.points.iter().map(|&(m, r)| (m, r * factor)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gr_total_rate() {
        let mfd = MagFreqDist::gutenberg_richter(5.05, 7.45, 0.1, 1.0, 0.01).unwrap();
        assert_eq!(mfd.len(), 25);
        assert!((mfd.total_rate() - 0.01).abs() < 1e-15);
        // b = 1：相邻分档比值为 10^-0.1
        let ratio = mfd.rate(1) / mfd.rate(0);
        assert!((ratio - 10f64.powf(-0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unsorted() {
        assert!(MagFreqDist::new(vec![(6.0, 0.1), (5.0, 0.1)]).is_err());
        assert!(MagFreqDist::new(vec![(6.0, -0.1)]).is_err());
    }

    #[test]
    fn test_evenly_and_set_rate() {
        let mut mfd = MagFreqDist::evenly(5.0, 3, 0.5).unwrap();
        assert_eq!(mfd.total_rate(), 0.0);
        mfd.set_rate(2, 0.2).unwrap();
        assert_eq!(mfd.cumulative_rate_above(5.5), 0.2);
        assert!(mfd.set_rate(3, 0.1).is_err());
    }

    #[test]
    fn test_scaled() {
        let mfd = MagFreqDist::single(6.0, 0.02).unwrap();
        assert!((mfd.scaled(0.5).unwrap().total_rate() - 0.01).abs() < 1e-15);
        assert!(mfd.scaled(-1.0).is_err());
    }

    #[test]
    fn test_moment_rate() {
        let mfd = MagFreqDist::single(6.0, 1.0).unwrap();
        assert!((mfd.total_moment_rate() - 10f64.powf(18.05)).abs() / 10f64.powf(18.05) < 1e-12);
    }
}
