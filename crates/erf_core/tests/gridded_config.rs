//! 由配置文件构建网格预测的集成测试

use erf_core::calc::{for_each_source_par, forecast_total_rates, forecast_total_rates_par};
use erf_core::gridded::{APPLY_CORRECTIONS, TOTAL_RATE_SCALE};
use erf_core::prelude::*;
use std::io::Write;

const CONFIG: &str = r#"{
    "name": "socal-test",
    "duration_years": 30.0,
    "grid": { "min_lat": 34.0, "max_lat": 34.2, "min_lon": -118.2, "max_lon": -118.1, "spacing_deg": 0.1 },
    "mfd": { "min_mag": 5.0, "max_mag": 7.0, "delta_mag": 0.5, "b_value": 1.0, "total_rate_per_node": 0.002 },
    "mechanisms": [
        { "mechanism": "strike_slip", "weight": 0.6 },
        { "mechanism": "reverse", "weight": 0.4 }
    ],
    "surfaces": { "finite_min_mag": 6.0, "strike_choices": [0.0, 45.0, 90.0] },
    "corrections": [
        { "kind": { "type": "fractile", "fractile": 0.1 }, "weight": 0.5 },
        { "kind": { "type": "fractile", "fractile": 0.9 }, "weight": 0.5 }
    ],
    "min_mag_for_correction": 5.5,
    "parameters": { "background": "include" }
}"#;

fn load() -> GriddedPointForecast {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = ForecastConfig::from_file(file.path()).unwrap();
    let mut forecast = GriddedPointForecast::from_config(config).unwrap();
    forecast.update_forecast().unwrap();
    forecast
}

#[test]
fn config_file_builds_expected_layout() {
    let forecast = load();
    assert_eq!(forecast.num_sources(), 6);
    // M5.0 两机制各 1；M5.5 两机制各 2 个校正；M6.0/6.5/7.0 两机制各 3 个走向
    assert_eq!(forecast.num_ruptures(0).unwrap(), 2 + 4 + 3 * 6);
    assert_eq!(forecast.total_num_ruptures().unwrap(), 6 * 24);
    assert_eq!(
        forecast.parameter("background"),
        Some(ParamValue::Text("include".into()))
    );
}

#[test]
fn node_rates_are_conserved() {
    let forecast = load();
    let rates = forecast_total_rates(&forecast).unwrap();
    assert!(rates.iter().all(|r| (r - 0.002).abs() < 1e-12));
    assert_eq!(rates, forecast_total_rates_par(&forecast).unwrap());
}

#[test]
fn parameters_drive_rebuild() {
    let mut forecast = load();
    let g = forecast.generation();

    forecast
        .set_parameter(TOTAL_RATE_SCALE, ParamValue::Float(2.0))
        .unwrap();
    forecast
        .set_parameter(APPLY_CORRECTIONS, ParamValue::Bool(false))
        .unwrap();
    assert!(forecast.set_parameter("unknown", ParamValue::Int(1)).is_err());
    assert!(forecast
        .set_parameter(TOTAL_RATE_SCALE, ParamValue::Text("x".into()))
        .is_err());
    forecast.update_forecast().unwrap();

    assert!(forecast.generation() > g);
    assert_eq!(forecast.num_ruptures(0).unwrap(), 2 + 2 + 3 * 6);
    let rates = forecast_total_rates(&forecast).unwrap();
    assert!(rates.iter().all(|r| (r - 0.004).abs() < 1e-12));
}

#[test]
fn worker_pool_visits_every_source() {
    let forecast = load();
    let counts = for_each_source_par(&forecast, 4, |_, s| Ok(s.num_ruptures())).unwrap();
    assert_eq!(counts.iter().sum::<usize>(), forecast.total_num_ruptures().unwrap());
}

#[test]
fn cache_wrapping_defers_point_sources() {
    // 网格源含点面破裂，标记可缓存后仍会被探测为延迟
    let mut config = load().config().clone();
    config.cache_grid_sources = true;
    let mut forecast = GriddedPointForecast::from_config(config).unwrap();
    forecast.update_forecast().unwrap();

    let wrapped = DistCachedForecast::new(forecast);
    assert_eq!(wrapped.wrapped_source_count().unwrap(), 0);
    assert_eq!(wrapped.deferred_source_count().unwrap(), 6);
}
