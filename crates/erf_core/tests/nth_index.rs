//! 全局破裂编号与率/概率换算的集成测试

use erf_core::nth::OffsetTable;
use erf_core::prelude::*;
use erf_geo::Location;
use erf_surface::{PointSurface, SurfaceRef};
use proptest::prelude::*;
use std::sync::Arc;

fn surface() -> SurfaceRef {
    Arc::new(PointSurface::new(Location::new(34.0, -118.0, 5.0).unwrap()))
}

fn source_with(n: usize, tag: f64) -> SourceRef {
    let rups = (0..n)
        .map(|i| Rupture::with_probability(tag + 0.1 * i as f64, 0.0, 0.01, surface(), None).unwrap())
        .collect();
    Arc::new(RuptureListSource::new(format!("src {tag}"), rups, surface()))
}

fn forecast_from_counts(counts: &[usize]) -> SourceListForecast {
    let sources = counts
        .iter()
        .enumerate()
        .map(|(i, &n)| source_with(n, 5.0 + i as f64))
        .collect();
    let mut forecast = SourceListForecast::new("counts", sources);
    forecast.update_forecast().unwrap();
    forecast
}

#[test]
fn leading_empty_source_maps_to_next() {
    let forecast = forecast_from_counts(&[0, 2, 1]);
    assert_eq!(forecast.total_num_ruptures().unwrap(), 3);
    assert_eq!(forecast.src_index_for_nth_rup(0).unwrap(), 1);
    assert_eq!(forecast.src_index_for_nth_rup(2).unwrap(), 2);
    assert_eq!(forecast.rup_index_in_source_for_nth_rup(2).unwrap(), 0);
    assert_eq!(forecast.nth_rup_indices_for_source(0).unwrap(), 0..0);

    // source 1 的首个破裂
    let rup = forecast.nth_rupture(0).unwrap();
    assert!((rup.magnitude() - 6.0).abs() < 1e-12);
    assert!(forecast.nth_rupture(3).is_err());
}

#[test]
fn table_rebuilt_after_source_change() {
    let mut forecast = forecast_from_counts(&[1, 1]);
    assert_eq!(forecast.total_num_ruptures().unwrap(), 2);
    forecast.push_source(source_with(4, 9.0));
    forecast.update_forecast().unwrap();
    assert_eq!(forecast.total_num_ruptures().unwrap(), 6);
    assert_eq!(forecast.src_index_for_nth_rup(5).unwrap(), 2);
}

#[test]
fn concurrent_readers_agree() {
    let forecast = forecast_from_counts(&[3, 0, 5, 2, 0, 7]);
    let totals: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| forecast.total_num_ruptures().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(totals.iter().all(|&t| t == 17));
}

#[test]
fn thirty_year_probability_round_trip() {
    let p = rate_to_prob(0.01, 30.0);
    assert!((p - 0.259_181_779_318_282).abs() < 1e-12);
    assert!((p - 0.2592).abs() < 1e-4);
    assert!((prob_to_rate(p, 30.0) - 0.01).abs() < 1e-15);
}

proptest! {
    #[test]
    fn ranges_concatenate_to_total(counts in prop::collection::vec(0usize..6, 0..24)) {
        let table = OffsetTable::build(&counts);
        let mut expected_start = 0;
        for s in 0..counts.len() {
            let range = table.rupture_indices_for_source(s).unwrap();
            prop_assert_eq!(range.start, expected_start);
            prop_assert_eq!(range.len(), counts[s]);
            expected_start = range.end;
        }
        prop_assert_eq!(expected_start, table.total());
    }

    #[test]
    fn lookup_matches_sequential_walk(counts in prop::collection::vec(0usize..6, 1..24)) {
        let table = OffsetTable::build(&counts);
        let mut nth = 0;
        for (s, &n) in counts.iter().enumerate() {
            for r in 0..n {
                prop_assert_eq!(table.source_index_for_nth(nth).unwrap(), s);
                prop_assert_eq!(table.rupture_index_in_source_for_nth(nth).unwrap(), r);
                nth += 1;
            }
        }
        prop_assert!(table.source_index_for_nth(nth).is_err());
    }

    #[test]
    fn rate_probability_inverse(rate in 1e-6f64..0.05, duration in 0.1f64..100.0) {
        let p = rate_to_prob(rate, duration);
        prop_assert!((0.0..1.0).contains(&p));
        let back = prob_to_rate(p, duration);
        prop_assert!(((back - rate) / rate).abs() < 1e-9);
    }
}
