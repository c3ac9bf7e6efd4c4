// crates/erf_core/src/calc.rs

//! 震源与预测层面的汇总计算
//!
//! 泊松震源的总概率按 `1 - Π(1 - p_i)` 组合（以对数和计算），
//! 非泊松震源直接求和。

use crate::forecast::Forecast;
use crate::mfd::magnitude_to_moment;
use crate::rupture::Rupture;
use crate::source::Source;
use erf_foundation::{EfError, EfResult};
use erf_geo::Region;
use rand::Rng;
use rayon::prelude::*;

// ============================================================================
// 震源汇总
// ============================================================================

/// 各破裂等效年发生率之和
pub fn total_equiv_mean_annual_rate(source: &dyn Source, duration: f64) -> EfResult<f64> {
    EfError::check_positive("duration", duration)?;
    source
        .ruptures()
        .map(|rup| rup.map(|r| r.mean_annual_rate(duration)))
        .sum()
}

/// 震源在 `duration` 年内的总发生概率
pub fn total_probability(source: &dyn Source, duration: f64) -> EfResult<f64> {
    total_probability_above(source, f64::NEG_INFINITY, None, duration)
}

/// 震级不低于 `magnitude` 的破裂总概率
///
/// 给定区域时，每个破裂的概率乘以其破裂面离散点落在区域内的比例。
pub fn total_probability_above(
    source: &dyn Source,
    magnitude: f64,
    region: Option<&dyn Region>,
    duration: f64,
) -> EfResult<f64> {
    EfError::check_positive("duration", duration)?;
    let poisson = source.is_poisson();
    let mut acc = 0.0;
    for rup in source.ruptures() {
        let rup = rup?;
        if rup.magnitude() < magnitude {
            continue;
        }
        let fraction = region.map_or(1.0, |r| rup.surface().fraction_in_region(r));
        let p = rup.probability(duration) * fraction;
        if poisson {
            acc += (-p).ln_1p();
        } else {
            acc += p;
        }
    }
    Ok(if poisson { -acc.exp_m1() } else { acc })
}

/// 泊松等效总地震矩率 (N·m/年)
pub fn total_moment_rate(source: &dyn Source, duration: f64) -> EfResult<f64> {
    EfError::check_positive("duration", duration)?;
    source
        .ruptures()
        .map(|rup| rup.map(|r| magnitude_to_moment(r.magnitude()) * r.mean_annual_rate(duration)))
        .sum()
}

// ============================================================================
// 随机抽样
// ============================================================================

/// 以均值 `expected` 的泊松分布抽取事件数，截断于 `round(10λ) + 2`
fn draw_poisson_count<R: Rng + ?Sized>(expected: f64, rng: &mut R) -> usize {
    let u: f64 = rng.gen();
    let max_num = (10.0 * expected).round() as usize + 2;
    let mut term = (-expected).exp();
    let mut sum = 0.0;
    for num in 0..max_num {
        if num > 0 {
            term *= expected / num as f64;
        }
        sum += term;
        if u <= sum {
            return num;
        }
    }
    max_num
}

/// 逐破裂抽取泊松事件数，每个破裂下标按抽到的事件数重复出现
///
/// 非泊松震源返回 `Unsupported`。
pub fn draw_random_rupture_indices<R: Rng + ?Sized>(
    source: &dyn Source,
    duration: f64,
    rng: &mut R,
) -> EfResult<Vec<usize>> {
    if !source.is_poisson() {
        return Err(EfError::unsupported(format!(
            "非泊松震源 '{}' 不支持随机抽取破裂",
            source.name()
        )));
    }
    let mut indices = Vec::new();
    for (i, rup) in source.ruptures().enumerate() {
        let expected = -(-rup?.probability(duration)).ln_1p();
        if !expected.is_finite() {
            return Err(EfError::invalid_input(format!(
                "震源 '{}' 第 {i} 个破裂概率为 1, 期望事件数无穷",
                source.name()
            )));
        }
        let count = draw_poisson_count(expected, rng);
        indices.extend(std::iter::repeat(i).take(count));
    }
    Ok(indices)
}

/// 随机抽取破裂，见 [`draw_random_rupture_indices`]
pub fn draw_random_ruptures<R: Rng + ?Sized>(
    source: &dyn Source,
    duration: f64,
    rng: &mut R,
) -> EfResult<Vec<Rupture>> {
    draw_random_rupture_indices(source, duration, rng)?
        .into_iter()
        .map(|i| source.rupture(i))
        .collect()
}

/// 按相对权重抽取一个下标，`rand` ∈ [0, 1)
fn sample_index(weights: &[f64], rand: f64) -> EfResult<usize> {
    EfError::check_range("rand", rand, 0.0, 1.0)?;
    let total: f64 = weights.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(EfError::invalid_input(format!("权重总和无效: {total}")));
    }
    let target = rand * total;
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if target < cumulative {
            return Ok(i);
        }
    }
    // 舍入误差落在末尾时取最后一个正权重
    weights
        .iter()
        .rposition(|w| *w > 0.0)
        .ok_or_else(|| EfError::internal("权重全为零"))
}

/// 按相对概率抽取单个破裂下标
pub fn draw_single_rupture_index(source: &dyn Source, duration: f64, rand: f64) -> EfResult<usize> {
    let weights = source
        .ruptures()
        .map(|rup| rup.map(|r| r.probability(duration)))
        .collect::<EfResult<Vec<_>>>()?;
    sample_index(&weights, rand)
}

/// 按相对发生率抽取单个破裂下标
///
/// 低震级概率接近 1 时仍能保持 Gutenberg-Richter 比例。
pub fn draw_single_rupture_index_from_rates(
    source: &dyn Source,
    duration: f64,
    rand: f64,
) -> EfResult<usize> {
    let mut weights = Vec::with_capacity(source.num_ruptures());
    for (i, rup) in source.ruptures().enumerate() {
        let rate = rup?.mean_annual_rate(duration);
        if rate.is_infinite() {
            return Err(EfError::invalid_input(format!(
                "震源 '{}' 第 {i} 个破裂发生率无穷",
                source.name()
            )));
        }
        weights.push(rate);
    }
    sample_index(&weights, rand)
}

// ============================================================================
// 预测汇总
// ============================================================================

/// 各震源的等效年发生率
pub fn forecast_total_rates<F: Forecast + ?Sized>(forecast: &F) -> EfResult<Vec<f64>> {
    let duration = forecast.time_span().duration();
    (0..forecast.num_sources())
        .map(|i| total_equiv_mean_annual_rate(forecast.source(i)?.as_ref(), duration))
        .collect()
}

/// [`forecast_total_rates`] 的并行版本
pub fn forecast_total_rates_par<F: Forecast + ?Sized>(forecast: &F) -> EfResult<Vec<f64>> {
    let duration = forecast.time_span().duration();
    (0..forecast.num_sources())
        .into_par_iter()
        .map(|i| total_equiv_mean_annual_rate(forecast.source(i)?.as_ref(), duration))
        .collect()
}

/// 在 `threads` 个工作线程的专用线程池上逐震源执行 `f`，结果按震源顺序返回
pub fn for_each_source_par<F, T, Op>(forecast: &F, threads: usize, op: Op) -> EfResult<Vec<T>>
where
    F: Forecast + ?Sized,
    T: Send,
    Op: Fn(usize, &dyn Source) -> EfResult<T> + Send + Sync,
{
    if threads == 0 {
        return Err(EfError::invalid_input("线程数必须至少为 1"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("erf-worker-{i}"))
        .build()
        .map_err(|e| EfError::internal(format!("创建线程池失败: {e}")))?;
    log::debug!(
        "预测 '{}': {} 个震源分派到 {} 个工作线程",
        forecast.name(),
        forecast.num_sources(),
        threads
    );
    pool.install(|| {
        (0..forecast.num_sources())
            .into_par_iter()
            .map(|i| {
                let source = forecast.source(i)?;
                op(i, source.as_ref())
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::SourceListForecast;
    use crate::source::{RuptureListSource, SourceRef};
    use erf_geo::{Location, RectangularRegion};
    use erf_surface::{PointSurface, SurfaceRef};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn surface(lat: f64) -> SurfaceRef {
        Arc::new(PointSurface::new(Location::new(lat, -118.0, 5.0).unwrap()))
    }

    fn source(probs: &[(f64, f64)]) -> RuptureListSource {
        let rups = probs
            .iter()
            .enumerate()
            .map(|(i, &(m, p))| {
                Rupture::with_probability(m, 0.0, p, surface(34.0 + i as f64), None).unwrap()
            })
            .collect();
        RuptureListSource::from_ruptures("calc", rups).unwrap()
    }

    #[test]
    fn test_total_probability_poisson() {
        let src = source(&[(5.0, 0.1), (6.0, 0.2)]);
        let p = total_probability(&src, 1.0).unwrap();
        assert!((p - (1.0 - 0.9 * 0.8)).abs() < 1e-12);
        let above = total_probability_above(&src, 5.5, None, 1.0).unwrap();
        assert!((above - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_total_probability_non_poisson_sums() {
        let src = source(&[(5.0, 0.1), (6.0, 0.2)]).non_poisson();
        let p = total_probability(&src, 1.0).unwrap();
        assert!((p - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_region_filter() {
        let src = source(&[(5.0, 0.1), (6.0, 0.2)]);
        let region = RectangularRegion::new(33.5, 34.5, -119.0, -117.0).unwrap();
        let p = total_probability_above(&src, 0.0, Some(&region as &dyn Region), 1.0).unwrap();
        assert!((p - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_moment_rate_matches_rate() {
        let src = source(&[(6.0, 0.01)]);
        let rate = total_equiv_mean_annual_rate(&src, 1.0).unwrap();
        let moment = total_moment_rate(&src, 1.0).unwrap();
        assert!((moment / rate - magnitude_to_moment(6.0)).abs() / moment < 1e-9);
    }

    #[test]
    fn test_draws_require_poisson() {
        let src = source(&[(5.0, 0.1)]).non_poisson();
        let mut rng = StdRng::seed_from_u64(7);
        let err = draw_random_rupture_indices(&src, 1.0, &mut rng).unwrap_err();
        assert_eq!(err.kind(), erf_foundation::ErrorKind::Unsupported);
    }

    #[test]
    fn test_draw_counts_are_plausible() {
        let src = source(&[(5.0, 0.5), (6.0, 0.0001)]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut first = 0;
        for _ in 0..2000 {
            let idx = draw_random_rupture_indices(&src, 1.0, &mut rng).unwrap();
            first += idx.iter().filter(|&&i| i == 0).count();
        }
        // λ = ln 2 ≈ 0.693
        let mean = first as f64 / 2000.0;
        assert!((mean - 0.693).abs() < 0.1, "mean = {mean}");
    }

    #[test]
    fn test_single_index_by_relative_probability() {
        let src = source(&[(5.0, 0.1), (6.0, 0.3)]);
        assert_eq!(draw_single_rupture_index(&src, 1.0, 0.0).unwrap(), 0);
        assert_eq!(draw_single_rupture_index(&src, 1.0, 0.2).unwrap(), 0);
        assert_eq!(draw_single_rupture_index(&src, 1.0, 0.3).unwrap(), 1);
        assert_eq!(draw_single_rupture_index(&src, 1.0, 0.99).unwrap(), 1);
    }

    #[test]
    fn test_rate_draw_rejects_certain_rupture() {
        let src = source(&[(5.0, 1.0), (6.0, 0.3)]);
        assert!(draw_single_rupture_index_from_rates(&src, 1.0, 0.5).is_err());
        assert!(draw_single_rupture_index(&src, 1.0, 0.5).is_ok());
    }

    #[test]
    fn test_worker_pool_matches_sequential() {
        let sources: Vec<SourceRef> = (0..8)
            .map(|i| Arc::new(source(&[(5.0, 0.01 * (i + 1) as f64)])) as SourceRef)
            .collect();
        let mut forecast = SourceListForecast::new("par", sources);
        forecast.update_forecast().unwrap();

        let seq = forecast_total_rates(&forecast).unwrap();
        let par = forecast_total_rates_par(&forecast).unwrap();
        assert_eq!(seq, par);

        let counts = for_each_source_par(&forecast, 3, |i, s| Ok((i, s.num_ruptures()))).unwrap();
        assert_eq!(counts.len(), 8);
        assert!(counts.iter().enumerate().all(|(i, &(j, n))| i == j && n == 1));
        assert!(for_each_source_par(&forecast, 0, |_, _| Ok(())).is_err());
    }
}
