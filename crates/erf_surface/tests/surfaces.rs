//! 破裂面集成测试

use erf_geo::{Location, RectangularRegion};
use erf_surface::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

fn line(lat0: f64, lat1: f64) -> SurfaceRef {
    Arc::new(
        LineSurface::new(
            vec![
                Location::new(lat0, -118.0, 1.0).unwrap(),
                Location::new(lat1, -118.0, 1.0).unwrap(),
            ]
            .into(),
            60.0,
        )
        .unwrap(),
    )
}

#[test]
fn cached_compound_matches_original() {
    let compound: SurfaceRef =
        Arc::new(CompoundSurface::new(vec![line(34.0, 34.2), line(34.2, 34.5)]).unwrap());
    let cached = CachedSurface::new(compound.clone());
    for lon in [-118.3, -118.0, -117.6] {
        let site = Location::new(34.3, lon, 0.0).unwrap();
        assert_eq!(cached.distances(&site), compound.distances(&site));
        assert_eq!(cached.distance_x(&site), compound.distance_x(&site));
    }
    assert_eq!(cached.components().map(|c| c.len()), Some(2));
}

#[test]
fn fraction_in_region() {
    let surface = line(34.0, 34.4);
    let region = RectangularRegion::new(33.0, 34.2, -119.0, -117.0).unwrap();
    let fraction = surface.fraction_in_region(&region);
    assert!(fraction > 0.4 && fraction < 0.6, "fraction = {fraction}");

    let point = PointSurface::new(Location::new(34.1, -118.0, 5.0).unwrap());
    assert_eq!(point.fraction_in_region(&region), 1.0);
}

#[test]
fn same_surface_identity() {
    let a = line(34.0, 34.2);
    let b = a.clone();
    let c = a.copy_shallow();
    assert!(same_surface(&a, &b));
    assert!(!same_surface(&a, &c));
}

proptest! {
    #[test]
    fn corrected_jb_never_exceeds_raw(mag in 4.0f64..8.5, horz in 0.0f64..300.0, fractile in 0.0f64..1.0) {
        let corr = FractileCorrection::new(fractile).unwrap();
        let corrected = corr.corrected_jb(mag, horz);
        prop_assert!(corrected <= horz);
        prop_assert!(corrected >= 0.0);
    }

    #[test]
    fn rupture_distance_at_least_jb(lat in 33.0f64..35.0, lon in -119.0f64..-117.0) {
        let surface = line(34.0, 34.3);
        let d = surface.distances(&Location::new(lat, lon, 0.0).unwrap());
        prop_assert!(d.rupture >= d.jb);
        prop_assert!(d.seis >= d.rupture);
    }
}
