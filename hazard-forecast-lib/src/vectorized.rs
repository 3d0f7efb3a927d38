//! # Vectorized Distance Calculations
//!
//! This module provides parallelized routines for the distance work of
//! hazard calculation: the per-site section-distance fan-out of the
//! indexed fault engine and the bulk pre-filtering of gridded sources.
//! It leverages [`Rayon`](https://docs.rs/rayon/latest/rayon/) for
//! data-parallel computation on large collections.
//!
//! ## Primary Types and Functions
//!
//! - [`DistanceTable`]: per-section `(rJB, rRup, rX)` cache, stored as
//!   three flat arrays indexed by section.
//! - [`calc_section_distances`]: compute distances for every hit
//!   section of a [`SystemSourceSet`] in parallel.
//! - [`aggregate_rupture_distances`]: assemble per-rupture
//!   ground-motion inputs from the cached section distances.
//! - [`filter_point_sources`]: parallel distance pre-filter over the
//!   nodes of a [`GridSourceSet`].
//!
//! ## Parallelism
//!
//! Distance tasks are CPU-bound and never block. Each task writes a
//! result keyed by section index, so ordering between tasks is
//! irrelevant. The number of threads is controlled by the
//! `RAYON_NUM_THREADS` environment variable or defaults to the number
//! of logical CPU cores.

use bit_set::BitSet;
use rayon::prelude::*;

use crate::geodesy::Location;
use crate::grid::{GridSourceSet, PointSource};
use crate::rupture::{DistanceType, Distances};
use crate::system::SystemSourceSet;

/// Per-section distance cache: `(DistanceType × SectionIndex) → f64`
/// stored as three flat arrays. Sections outside the filter hold `NaN`.
#[derive(Debug)]
pub struct DistanceTable {
    r_jb: Vec<f64>,
    r_rup: Vec<f64>,
    r_x: Vec<f64>,
}

impl DistanceTable {
    fn new(n_sections: usize) -> Self {
        Self {
            r_jb: vec![f64::NAN; n_sections],
            r_rup: vec![f64::NAN; n_sections],
            r_x: vec![f64::NAN; n_sections],
        }
    }

    /// Cached value for `section`, `NaN` if the section was not hit.
    pub fn get(&self, kind: DistanceType, section: usize) -> f64 {
        match kind {
            DistanceType::RJb => self.r_jb[section],
            DistanceType::RRup => self.r_rup[section],
            DistanceType::RX => self.r_x[section],
        }
    }

    /// `true` if distances were computed for `section`.
    pub fn is_hit(&self, section: usize) -> bool {
        !self.r_rup[section].is_nan()
    }
}

/// Compute `(rJB, rRup, rX)` for every section of `set` flagged in
/// `section_bits`, in parallel, and collect the results into a
/// [`DistanceTable`].
pub fn calc_section_distances(
    set: &SystemSourceSet,
    section_bits: &BitSet,
    site: &Location,
) -> DistanceTable {
    let hits: Vec<usize> = section_bits.iter().collect();
    let sections = set.sections();

    let computed: Vec<(usize, Distances)> = hits
        .par_iter()
        .map(|&s| (s, sections[s].distances(site)))
        .collect();

    let mut table = DistanceTable::new(sections.len());
    for (s, d) in computed {
        table.r_jb[s] = d.r_jb;
        table.r_rup[s] = d.r_rup;
        table.r_x[s] = d.r_x;
    }
    table
}

/// Assemble the ground-motion distance input of rupture `index` from
/// the cached section distances: closest `rRup`, closest `rJB`, and
/// area-weighted `rX` over the rupture's hit sections.
pub fn aggregate_rupture_distances(
    set: &SystemSourceSet,
    index: usize,
    table: &DistanceTable,
) -> Distances {
    let mut r_jb = f64::INFINITY;
    let mut r_rup = f64::INFINITY;
    let mut rx_weighted = 0.0;
    let mut area = 0.0;

    for s in set.rupture(index).sections() {
        if !table.is_hit(s) {
            continue;
        }
        r_jb = r_jb.min(table.get(DistanceType::RJb, s));
        r_rup = r_rup.min(table.get(DistanceType::RRup, s));
        let section = &set.sections()[s];
        let a = section.length() * section.width();
        rx_weighted += a * table.get(DistanceType::RX, s);
        area += a;
    }

    let r_x = if area > 0.0 { rx_weighted / area } else { f64::NAN };
    Distances::new(r_jb, r_rup, r_x)
}

/// Parallel distance pre-filter over the nodes of a grid source set.
///
/// Equivalent to
/// [`location_sources`](crate::grid::GridSourceSet::location_sources)
/// but distributed across threads, for sets with many thousands of
/// nodes.
pub fn filter_point_sources<'a>(
    set: &'a GridSourceSet,
    site: &Location,
) -> Vec<&'a PointSource> {
    let d = set.gmms().max_dist_hi();
    set.sources()
        .par_iter()
        .filter(|s| set.distance_filter(site, d, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auxilary::approx_equal;
    use crate::geodesy::LocationList;
    use crate::gmm::{Gmm, GmmSet};
    use crate::grid::MagDepthMap;
    use crate::mfd::IncrementalMfd;
    use crate::pointsource::FocalMechMap;
    use crate::sourceset::SourceType;
    use crate::surface::GriddedSurface;

    fn test_gmms() -> Arc<GmmSet> {
        let map = [(Gmm::Ask14, 1.0)].into_iter().collect();
        Arc::new(GmmSet::builder(map, 200.0).build().unwrap())
    }

    fn section_at(lat: f64) -> GriddedSurface {
        let a = Location::surface(lat, -118.0);
        let b = a.move_along(0.0, 8.0, 0.0);
        GriddedSurface::from_trace(&LocationList::from(vec![a, b]), 90.0, 10.0, 1.0).unwrap()
    }

    fn test_system() -> SystemSourceSet {
        SystemSourceSet::builder("System", 1.0, test_gmms())
            .section(section_at(34.0))
            .section(section_at(34.2))
            .section(section_at(34.4))
            .rupture(vec![0, 1], 6.8, 1e-4, 2.0, 90.0, 10.0, 0.0)
            .rupture(vec![1, 2], 6.9, 1e-4, 2.0, 90.0, 10.0, 0.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_section_distance_table() {
        let set = test_system();
        let site = Location::surface(34.0, -118.2);
        let bits = set.section_bits_within(&site, 40.0);
        let table = calc_section_distances(&set, &bits, &site);

        for s in bits.iter() {
            assert!(table.is_hit(s));
            let exact = set.sections()[s].distances(&site);
            assert!(approx_equal(table.get(DistanceType::RRup, s), exact.r_rup, 1e-12));
        }
        // unhit sections stay NaN
        for s in 0..set.sections().len() {
            if !bits.contains(s) {
                assert!(!table.is_hit(s));
            }
        }
    }

    #[test]
    fn test_rupture_aggregation() {
        let set = test_system();
        let site = Location::surface(34.0, -118.2);
        let bits = set.section_bits_within(&site, 500.0);
        let table = calc_section_distances(&set, &bits, &site);

        let agg = aggregate_rupture_distances(&set, 0, &table);
        let d0 = set.sections()[0].distances(&site);
        let d1 = set.sections()[1].distances(&site);
        assert!(approx_equal(agg.r_rup, d0.r_rup.min(d1.r_rup), 1e-12));
        assert!(approx_equal(agg.r_jb, d0.r_jb.min(d1.r_jb), 1e-12));
        // equal-area sections: rX is the plain mean
        assert!(approx_equal(agg.r_x, 0.5 * (d0.r_x + d1.r_x), 1e-12));
    }

    #[test]
    fn test_parallel_grid_filter() {
        let map = MagDepthMap::new(vec![(10.0, vec![(5.0, 1.0)])]).unwrap();
        let mechs = FocalMechMap::new(1.0, 0.0, 0.0).unwrap();
        let mut builder =
            GridSourceSet::builder("Grid", 1.0, test_gmms(), SourceType::Grid)
                .mag_depth_map(map)
                .mechs(mechs);
        for i in 0..50 {
            let mfd = IncrementalMfd::single(6.0, 0.001, false).unwrap();
            builder = builder.node(Location::surface(30.0 + 0.2 * i as f64, -118.0), mfd, None);
        }
        let set = builder.build().unwrap();

        let site = Location::surface(30.0, -118.0);
        let par = filter_point_sources(&set, &site);
        let serial = set.location_sources(&site);
        assert_eq!(par.len(), serial.len());
        assert!(!par.is_empty());
        assert!(par.len() < 50);
    }
}
