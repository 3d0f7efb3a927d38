use std::error::Error;

use hazard_forecast_lib::auxilary::approx_equal;
use hazard_forecast_lib::cluster::ClusterSource;
use hazard_forecast_lib::fault::{FaultSource, FaultSourceSet, FloatStyle};
use hazard_forecast_lib::geodesy::{Location, LocationList};
use hazard_forecast_lib::gmm::{Gmm, GmmSet};
use hazard_forecast_lib::magnitudes::moment;
use hazard_forecast_lib::mfd::IncrementalMfd;
use hazard_forecast_lib::msr::MagScalingType;
use hazard_forecast_lib::parsers::parse_fault_source_set;
use std::sync::Arc;

const EPSILON: f64 = 1e-9;

fn test_gmms() -> Arc<GmmSet> {
    let map = [(Gmm::Ask14, 1.0)].into_iter().collect();
    Arc::new(GmmSet::builder(map, 300.0).build().unwrap())
}

fn trace_20km() -> LocationList {
    let a = Location::surface(34.0, -118.0);
    let b = a.move_along(0.0, 20.0, 0.0);
    LocationList::from(vec![a, b])
}

/// A single floating Gutenberg-Richter fault: every magnitude bin
/// produces one rupture per valid along-strike position.
#[test]
fn test_floating_gr_fault_counts() -> Result<(), Box<dyn Error>> {
    let mfd = IncrementalMfd::gutenberg_richter(3.0, 1.0, 5.0, 7.0, 0.1, true)?;
    assert_eq!(mfd.len(), 20);

    let source = FaultSource::builder()
        .name("GR fault")
        .trace(trace_20km())
        .dip(90.0)
        .width(15.0)
        .rake(0.0)
        .mfds(vec![mfd.clone()])
        .mag_scaling(MagScalingType::Wc94Length)
        .aspect_ratio(1.0)
        .offset(1.0)
        .float_style(FloatStyle::FullDownDip)
        .build()?;

    // every bin floats into ceil((L_trace - L(m)) / offset + 1)
    // positions, at least one
    let mut expected = 0usize;
    for i in 0..20 {
        let m = 5.05 + 0.1 * i as f64;
        let len = 10_f64.powf(-3.22 + 0.69 * m);
        expected += ((20.0 - len) + 1.0).ceil().max(1.0) as usize;
    }
    assert_eq!(source.size(), expected);

    // each of the 20 bins contributes at least one rupture
    let mut mags: Vec<f64> = source.iter().map(|r| r.mag).collect();
    mags.dedup();
    assert_eq!(mags.len(), 20);

    // full down dip: every rupture spans the whole width
    for rupture in source.iter() {
        assert!(approx_equal(rupture.surface.width(), 15.0, EPSILON));
    }

    // per-bin rates survive the split across positions
    let total: f64 = source.iter().map(|r| r.rate).sum();
    assert!(approx_equal(total, mfd.total_rate(), 1e-12));
    Ok(())
}

/// A SINGLE MFD with 3-branch epistemic uncertainty: branch magnitudes
/// straddle the nominal magnitude, rates hold the branch-weight ratio,
/// and the nominal total moment is preserved.
#[test]
fn test_single_mfd_three_branch_epistemic() -> Result<(), Box<dyn Error>> {
    let xml = r#"
<FaultSourceSet name="Epi" weight="1.0">
  <Settings>
    <MagUncertainty>
      <Epistemic deltas="[-0.2, 0.0, 0.2]" weights="[0.2, 0.6, 0.2]" cutoff="6.5"/>
    </MagUncertainty>
  </Settings>
  <SourceProperties magScaling="WC1994_LENGTH"/>
  <Source name="Single">
    <MagFreqDist type="SINGLE" m="6.5" a="0.002" floats="false" weight="1.0"/>
    <Geometry dip="90.0" width="15.0" rake="0.0" depth="0.0"/>
    <Trace>
      34.0,-118.0,0.0
      34.18,-118.0,0.0
    </Trace>
  </Source>
</FaultSourceSet>"#;
    let set = parse_fault_source_set(xml, "Fault/epi.xml", test_gmms())?;
    let source = set.iter().next().ok_or("empty set")?;
    assert_eq!(source.size(), 3);

    let ruptures = source.ruptures();
    assert!(approx_equal(ruptures[0].mag, 6.3, EPSILON));
    assert!(approx_equal(ruptures[1].mag, 6.5, EPSILON));
    assert!(approx_equal(ruptures[2].mag, 6.7, EPSILON));

    // rates in the 0.2 : 0.6 : 0.2 branch-weight ratio
    assert!(approx_equal(ruptures[0].rate / ruptures[1].rate, 0.2 / 0.6, 1e-12));
    assert!(approx_equal(ruptures[2].rate / ruptures[1].rate, 0.2 / 0.6, 1e-12));

    // total moment equals the nominal single-MFD total moment
    let total_mo: f64 = ruptures.iter().map(|r| r.rate * moment(r.mag)).sum();
    let nominal_mo = 0.002 * moment(6.5);
    assert!((total_mo - nominal_mo).abs() / nominal_mo < 1e-12);
    Ok(())
}

fn cluster_5000yr() -> ClusterSource {
    let rate = 1.0 / 5000.0;
    let mut faults = FaultSourceSet::builder(
        "Cluster faults",
        1.0,
        test_gmms(),
        MagScalingType::Wc94Length,
    );
    for (i, m) in [7.2, 7.4, 7.6].iter().enumerate() {
        let a = Location::surface(34.0 + 0.3 * i as f64, -118.0);
        let b = a.move_along(0.0, 25.0, 0.0);
        let source = FaultSource::builder()
            .name(&format!("Fault {i}"))
            .trace(LocationList::from(vec![a, b]))
            .dip(90.0)
            .width(15.0)
            .rake(0.0)
            .mfds(vec![IncrementalMfd::single(*m, rate, false).unwrap()])
            .mag_scaling(MagScalingType::Wc94Length)
            .build()
            .unwrap();
        faults = faults.source(source);
    }
    ClusterSource::new("Test cluster", rate, faults.build().unwrap()).unwrap()
}

/// A cluster source exposes the shared cluster rate and the wrapped
/// fault group.
#[test]
fn test_cluster_rate_and_size() {
    let cluster = cluster_5000yr();
    assert_eq!(cluster.faults().size(), 3);
    assert!(approx_equal(cluster.rate(), 1.0 / 5000.0, 1e-15));
}

/// Per-rupture iteration over a cluster is unsupported.
#[test]
#[should_panic(expected = "joint-probability")]
fn test_cluster_iteration_panics() {
    let cluster = cluster_5000yr();
    let _ = cluster.iter();
}
