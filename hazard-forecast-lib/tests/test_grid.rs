use std::error::Error;
use std::sync::Arc;

use hazard_forecast_lib::auxilary::approx_equal;
use hazard_forecast_lib::geodesy::Location;
use hazard_forecast_lib::gmm::{Gmm, GmmSet};
use hazard_forecast_lib::grid::{GridSourceSet, MagDepthMap};
use hazard_forecast_lib::mfd::IncrementalMfd;
use hazard_forecast_lib::pointsource::FocalMechMap;
use hazard_forecast_lib::sourceset::SourceType;

fn test_gmms() -> Arc<GmmSet> {
    let map = [(Gmm::Bssa14, 1.0)].into_iter().collect();
    Arc::new(GmmSet::builder(map, 200.0).build().unwrap())
}

fn ss_only() -> FocalMechMap {
    FocalMechMap::new(1.0, 0.0, 0.0).unwrap()
}

/// A single-magnitude strike-slip node: one rupture, no hanging-wall
/// duplication, for both the degenerate and finite variants.
#[test]
fn test_single_mag_strike_slip_node() -> Result<(), Box<dyn Error>> {
    for finite in [false, true] {
        let map = MagDepthMap::new(vec![(10.0, vec![(5.0, 1.0)])])?;
        let mfd = IncrementalMfd::single(6.0, 0.03, false)?;
        let set = GridSourceSet::builder("Point grid", 1.0, test_gmms(), SourceType::Grid)
            .mag_depth_map(map)
            .mechs(ss_only())
            .finite(finite)
            .node(Location::surface(34.0, -118.0), mfd, None)
            .build()?;

        let source = set.iter().next().ok_or("empty set")?;
        assert_eq!(source.size(), 1);

        let mut it = source.ruptures();
        let rupture = it.next().ok_or("no rupture")?;
        assert!(approx_equal(rupture.rake, 0.0, 1e-12));
        assert!(approx_equal(rupture.surface.dip(), 90.0, 1e-12));
        assert!(approx_equal(rupture.rate, 0.03, 1e-15));
        assert!(approx_equal(rupture.surface.z_top(), 5.0, 1e-12));
        assert!(it.next().is_none());
    }
    Ok(())
}

/// The two-tier magnitude-depth map of the spec: 13 lookup-table
/// entries, 13 iterated ruptures, and the documented depths and
/// weights for the lowest magnitude bin.
#[test]
fn test_two_tier_mag_depth_map() -> Result<(), Box<dyn Error>> {
    let map = MagDepthMap::new(vec![
        (6.5, vec![(1.0, 0.4), (3.0, 0.5), (5.0, 0.1)]),
        (10.0, vec![(1.0, 0.1), (5.0, 0.9)]),
    ])?;
    let mfd = IncrementalMfd::incremental(
        vec![5.0, 5.5, 6.0, 6.5, 7.0],
        vec![1.0, 1.0, 1.0, 1.0, 1.0],
        false,
    )?;
    let set = GridSourceSet::builder("Tiered grid", 1.0, test_gmms(), SourceType::Grid)
        .mag_depth_map(map)
        .mechs(ss_only())
        .node(Location::surface(34.0, -118.0), mfd, None)
        .build()?;

    assert_eq!(set.tables().len(), 13);
    assert_eq!(&set.tables().mag_depth_depths[..3], &[1.0, 3.0, 5.0]);
    assert_eq!(&set.tables().mag_depth_weights[..3], &[0.4, 0.5, 0.1]);

    let source = set.iter().next().ok_or("empty set")?;
    assert_eq!(source.size(), 13);
    let mut count = 0;
    let mut it = source.ruptures();
    while it.next().is_some() {
        count += 1;
    }
    assert_eq!(count, 13);
    Ok(())
}

/// Rate conservation across the full mechanism expansion: the iterator
/// rates sum to the MFD rates times the depth weights times the
/// mechanism weights.
#[test]
fn test_finite_rate_conservation() -> Result<(), Box<dyn Error>> {
    let map = MagDepthMap::new(vec![
        (6.5, vec![(1.0, 0.4), (3.0, 0.5), (5.0, 0.1)]),
        (10.0, vec![(1.0, 0.1), (5.0, 0.9)]),
    ])?;
    let mfd = IncrementalMfd::incremental(
        vec![5.0, 5.5, 6.0, 6.5, 7.0],
        vec![0.2, 0.1, 0.05, 0.02, 0.01],
        false,
    )?;
    let mechs = FocalMechMap::new(0.5, 0.3, 0.2)?;
    let set = GridSourceSet::builder("Mech grid", 1.0, test_gmms(), SourceType::Grid)
        .mag_depth_map(map)
        .mechs(mechs)
        .node(Location::surface(34.0, -118.0), mfd.clone(), None)
        .build()?;

    let source = set.iter().next().ok_or("empty set")?;
    // SS + 2 x (REV fw/hw) + 2 x (NOR fw/hw) blocks over 13 entries
    assert_eq!(source.size(), 13 * 5);

    let mut total = 0.0;
    let mut it = source.ruptures();
    while let Some(rupture) = it.next() {
        total += rupture.rate;
    }
    // depth weights and mechanism weights each sum to one
    assert!((total - mfd.total_rate()).abs() < 1e-12);
    Ok(())
}

/// Hanging-wall and footwall representations of a reverse rupture halve
/// the mechanism weight and differ in their distance metrics.
#[test]
fn test_hanging_wall_footwall_split() -> Result<(), Box<dyn Error>> {
    let map = MagDepthMap::new(vec![(10.0, vec![(5.0, 1.0)])])?;
    let mfd = IncrementalMfd::single(6.5, 0.01, false)?;
    let mechs = FocalMechMap::new(0.0, 1.0, 0.0)?;
    let set = GridSourceSet::builder("Reverse grid", 1.0, test_gmms(), SourceType::Grid)
        .mag_depth_map(map)
        .mechs(mechs)
        .node(Location::surface(34.0, -118.0), mfd, None)
        .build()?;

    let source = set.iter().next().ok_or("empty set")?;
    assert_eq!(source.size(), 2);

    let site = Location::surface(34.0, -118.0).move_along(90.0, 12.0, 0.0);
    let fw = source.get(0);
    let hw = source.get(1);
    assert!(approx_equal(fw.rate, 0.005, 1e-15));
    assert!(approx_equal(hw.rate, 0.005, 1e-15));

    let fw_d = fw.distances(&site);
    let hw_d = hw.distances(&site);
    assert!(fw_d.r_x < 0.0);
    assert!(hw_d.r_x > 0.0);
    assert!(hw_d.r_x > fw_d.r_x.abs());
    Ok(())
}
