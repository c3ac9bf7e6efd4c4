//! 球面距离属性测试

use erf_geo::prelude::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn location_at_recovers_distance(
        lat in -60.0f64..60.0,
        lon in -170.0f64..170.0,
        az in 0.0f64..360.0,
        dist in 0.1f64..500.0,
    ) {
        let origin = Location::new(lat, lon, 0.0).unwrap();
        let p = location_at(&origin, az, dist, 0.0);
        prop_assert!((horz_distance(&origin, &p) - dist).abs() < 1e-6);
    }

    #[test]
    fn horz_distance_symmetric(
        lat1 in -80.0f64..80.0, lon1 in -170.0f64..170.0,
        lat2 in -80.0f64..80.0, lon2 in -170.0f64..170.0,
    ) {
        let a = Location::new(lat1, lon1, 0.0).unwrap();
        let b = Location::new(lat2, lon2, 0.0).unwrap();
        prop_assert!((horz_distance(&a, &b) - horz_distance(&b, &a)).abs() < 1e-9);
        prop_assert!(linear_distance(&a, &b) <= horz_distance(&a, &b) + 1e-9);
    }
}

#[test]
fn location_serde_roundtrip() {
    let loc = Location::new(34.05, -118.25, 7.5).unwrap();
    let json = serde_json::to_string(&loc).unwrap();
    let back: Location = serde_json::from_str(&json).unwrap();
    assert_eq!(loc, back);
}

#[test]
fn site_in_rectangular_region() {
    let region = RectangularRegion::new(33.0, 35.0, -119.0, -117.0)
        .unwrap()
        .named("LA");
    let site = Site::new("downtown", Location::new(34.05, -118.25, 0.0).unwrap());
    assert!(region.contains(&site.location));
    assert_eq!(region.name(), "LA");
}
