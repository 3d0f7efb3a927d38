use std::error::Error;
use std::sync::Arc;

use bit_set::BitSet;

use hazard_forecast_lib::geodesy::{Location, LocationList};
use hazard_forecast_lib::gmm::{Gmm, GmmSet};
use hazard_forecast_lib::surface::GriddedSurface;
use hazard_forecast_lib::system::SystemSourceSet;
use hazard_forecast_lib::vectorized::{aggregate_rupture_distances, calc_section_distances};

fn test_gmms() -> Arc<GmmSet> {
    let map = [(Gmm::Ask14, 1.0)].into_iter().collect();
    Arc::new(GmmSet::builder(map, 300.0).build().unwrap())
}

fn section_at(lat: f64) -> GriddedSurface {
    let a = Location::surface(lat, -118.0);
    let b = a.move_along(0.0, 9.0, 0.0);
    GriddedSurface::from_trace(&LocationList::from(vec![a, b]), 90.0, 12.0, 1.0).unwrap()
}

fn five_section_set() -> SystemSourceSet {
    let mut builder = SystemSourceSet::builder("Indexed set", 1.0, test_gmms());
    for i in 0..5 {
        builder = builder.section(section_at(34.0 + 0.09 * i as f64));
    }
    builder
        .rupture(vec![0, 1], 6.8, 1.2e-4, 0.0, 90.0, 12.0, 0.0)
        .rupture(vec![2, 3, 4], 7.2, 4.0e-5, 0.0, 90.0, 12.0, 0.0)
        .rupture(vec![1, 2, 3], 7.1, 6.5e-5, 0.0, 90.0, 12.0, 0.0)
        .build()
        .unwrap()
}

/// Section hits {0,1,1,0,0} pass exactly the ruptures sharing sections
/// 1 or 2.
#[test]
fn test_section_hit_filter() {
    let set = five_section_set();

    let mut hits = BitSet::with_capacity(5);
    hits.insert(1);
    hits.insert(2);
    assert_eq!(set.filtered_indices(&hits), vec![0, 1, 2]);

    let mut hits = BitSet::with_capacity(5);
    hits.insert(0);
    hits.insert(1);
    // rupture 1 spans {2,3,4} only
    assert_eq!(set.filtered_indices(&hits), vec![0, 2]);
}

/// Every set bit addresses a valid section and every rupture spans at
/// least two sections.
#[test]
fn test_bitset_invariants() {
    let set = five_section_set();
    for rupture in set.iter() {
        assert!(rupture.section_count() >= 2);
        for s in rupture.sections() {
            assert!(s < set.sections().len());
        }
    }
}

/// The parallel section-distance fan-out covers exactly the hit
/// sections and feeds per-rupture aggregation.
#[test]
fn test_distance_fan_out() -> Result<(), Box<dyn Error>> {
    let set = five_section_set();
    let site = Location::surface(34.05, -118.15);

    let hits = set.section_bits_within(&site, 30.0);
    assert!(hits.contains(0));
    let table = calc_section_distances(&set, &hits, &site);

    for s in 0..set.sections().len() {
        assert_eq!(hits.contains(s), table.is_hit(s));
    }

    for index in set.filtered_indices(&hits) {
        let d = aggregate_rupture_distances(&set, index, &table);
        assert!(d.r_rup >= d.r_jb - 1e-9);
        assert!(d.r_rup.is_finite());
    }
    Ok(())
}
