//! # Indexed Fault System
//!
//! UCERF3-style source sets represent hundreds of thousands of
//! multi-section ruptures over a shared, ordered array of fault-section
//! surfaces. The memory layout is column-oriented: one bit-set of
//! participating section indices per rupture, plus parallel primitive
//! arrays for magnitude, rate, depth, dip, width and rake.
//!
//! ## Distance filtering
//!
//! A site filter first materializes the set of sections within the
//! cutoff distance as a single bit-set
//! ([`SystemSourceSet::section_bits_within`]); a rupture passes iff its
//! section bit-set intersects it. Exact per-section distances are then
//! computed in bulk (see [`vectorized`](crate::vectorized)) and
//! aggregated per rupture.

use std::sync::Arc;

use bit_set::BitSet;

use crate::error::ValidationError;
use crate::geodesy::Location;
use crate::gmm::GmmSet;
use crate::magnitudes::{check_depth, check_dip, check_magnitude, check_rake, check_weight};
use crate::sourceset::SourceType;
use crate::surface::GriddedSurface;

/// A lightweight view of one indexed rupture.
#[derive(Debug, Clone, Copy)]
pub struct SystemRupture<'a> {
    pub index: usize,
    pub mag: f64,
    pub rate: f64,
    pub depth: f64,
    pub dip: f64,
    pub width: f64,
    pub rake: f64,
    sections: &'a BitSet,
}

impl<'a> SystemRupture<'a> {
    /// Indices of the sections participating in this rupture.
    pub fn sections(&self) -> impl Iterator<Item = usize> + 'a {
        self.sections.iter()
    }

    /// Number of participating sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

/// An indexed (system) fault source set.
#[derive(Debug)]
pub struct SystemSourceSet {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    sections: Vec<GriddedSurface>,
    centroids: Vec<Location>,
    bitsets: Vec<BitSet>,
    mags: Vec<f64>,
    rates: Vec<f64>,
    depths: Vec<f64>,
    dips: Vec<f64>,
    widths: Vec<f64>,
    rakes: Vec<f64>,
}

impl SystemSourceSet {
    /// Start building a system source set.
    pub fn builder(name: &str, weight: f64, gmms: Arc<GmmSet>) -> SystemSourceSetBuilder {
        SystemSourceSetBuilder {
            name: name.to_string(),
            weight,
            gmms,
            sections: Vec::new(),
            ruptures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn source_type(&self) -> SourceType {
        SourceType::System
    }

    pub fn gmms(&self) -> &Arc<GmmSet> {
        &self.gmms
    }

    /// Number of ruptures.
    pub fn size(&self) -> usize {
        self.mags.len()
    }

    /// The ordered section surfaces.
    pub fn sections(&self) -> &[GriddedSurface] {
        &self.sections
    }

    /// Rupture view at `index`.
    pub fn rupture(&self, index: usize) -> SystemRupture<'_> {
        SystemRupture {
            index,
            mag: self.mags[index],
            rate: self.rates[index],
            depth: self.depths[index],
            dip: self.dips[index],
            width: self.widths[index],
            rake: self.rakes[index],
            sections: &self.bitsets[index],
        }
    }

    /// Iterator over all rupture views in index order.
    pub fn iter(&self) -> impl Iterator<Item = SystemRupture<'_>> {
        (0..self.size()).map(|i| self.rupture(i))
    }

    /// Bit-set of sections whose centroid lies within `distance` km of
    /// `site` (fast horizontal distance).
    pub fn section_bits_within(&self, site: &Location, distance: f64) -> BitSet {
        let mut bits = BitSet::with_capacity(self.sections.len());
        for (i, centroid) in self.centroids.iter().enumerate() {
            if site.horz_distance_fast(centroid) <= distance {
                bits.insert(i);
            }
        }
        bits
    }

    /// `true` if rupture `index` shares any section with `section_bits`.
    pub fn passes(&self, section_bits: &BitSet, index: usize) -> bool {
        !self.bitsets[index].is_disjoint(section_bits)
    }

    /// Indices of all ruptures intersecting `section_bits`.
    pub fn filtered_indices(&self, section_bits: &BitSet) -> Vec<usize> {
        (0..self.size())
            .filter(|&r| self.passes(section_bits, r))
            .collect()
    }

    /// Rupture indices passing the site filter at the GMM set's maximum
    /// applicable distance.
    pub fn location_rupture_indices(&self, site: &Location) -> Vec<usize> {
        let bits = self.section_bits_within(site, self.gmms.max_dist_hi());
        self.filtered_indices(&bits)
    }
}

/// Single-use builder for [`SystemSourceSet`].
pub struct SystemSourceSetBuilder {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    sections: Vec<GriddedSurface>,
    ruptures: Vec<(Vec<usize>, [f64; 6])>,
}

impl SystemSourceSetBuilder {
    /// Append a section surface. Section order defines the index space
    /// rupture bit-sets refer to.
    pub fn section(mut self, section: GriddedSurface) -> Self {
        self.sections.push(section);
        self
    }

    /// Append a rupture over `section_indices` with its scalar
    /// properties.
    #[allow(clippy::too_many_arguments)]
    pub fn rupture(
        mut self,
        section_indices: Vec<usize>,
        mag: f64,
        rate: f64,
        depth: f64,
        dip: f64,
        width: f64,
        rake: f64,
    ) -> Self {
        self.ruptures
            .push((section_indices, [mag, rate, depth, dip, width, rake]));
        self
    }

    /// Validate and build: every rupture references at least 2 valid
    /// sections, and angles are in range.
    pub fn build(self) -> Result<SystemSourceSet, ValidationError> {
        check_weight(self.weight)?;
        if self.ruptures.is_empty() {
            return Err(ValidationError::EmptySourceSet(self.name));
        }
        let n_sections = self.sections.len();
        let n = self.ruptures.len();

        let mut bitsets = Vec::with_capacity(n);
        let mut mags = Vec::with_capacity(n);
        let mut rates = Vec::with_capacity(n);
        let mut depths = Vec::with_capacity(n);
        let mut dips = Vec::with_capacity(n);
        let mut widths = Vec::with_capacity(n);
        let mut rakes = Vec::with_capacity(n);

        for (index, (indices, props)) in self.ruptures.into_iter().enumerate() {
            let mut bits = BitSet::with_capacity(n_sections);
            for s in indices {
                if s >= n_sections {
                    return Err(ValidationError::SectionIndex(s, n_sections));
                }
                bits.insert(s);
            }
            if bits.len() < 2 {
                return Err(ValidationError::SystemSectionCount {
                    index,
                    count: bits.len(),
                });
            }
            let [mag, rate, depth, dip, width, rake] = props;
            if rate < 0.0 {
                return Err(ValidationError::NegativeRate(rate));
            }
            check_magnitude(mag)?;
            check_depth(depth)?;
            check_dip(dip)?;
            check_rake(rake)?;

            bitsets.push(bits);
            mags.push(mag);
            rates.push(rate);
            depths.push(depth);
            dips.push(dip);
            widths.push(width);
            rakes.push(rake);
        }

        let centroids = self.sections.iter().map(GriddedSurface::centroid).collect();

        Ok(SystemSourceSet {
            name: self.name,
            weight: self.weight,
            gmms: self.gmms,
            sections: self.sections,
            centroids,
            bitsets,
            mags,
            rates,
            depths,
            dips,
            widths,
            rakes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::LocationList;
    use crate::gmm::{Gmm, GmmSet};

    fn test_gmms() -> Arc<GmmSet> {
        let map = [(Gmm::Ask14, 1.0)].into_iter().collect();
        Arc::new(GmmSet::builder(map, 300.0).build().unwrap())
    }

    fn section_at(lat: f64) -> GriddedSurface {
        let a = Location::surface(lat, -118.0);
        let b = a.move_along(0.0, 8.0, 0.0);
        GriddedSurface::from_trace(&LocationList::from(vec![a, b]), 90.0, 10.0, 1.0).unwrap()
    }

    fn five_section_set() -> SystemSourceSet {
        let mut builder = SystemSourceSet::builder("Test system", 1.0, test_gmms());
        for i in 0..5 {
            builder = builder.section(section_at(34.0 + i as f64));
        }
        builder
            .rupture(vec![0, 1], 6.7, 1e-4, 2.0, 90.0, 10.0, 0.0)
            .rupture(vec![2, 3, 4], 7.1, 5e-5, 2.0, 90.0, 10.0, 0.0)
            .rupture(vec![1, 2, 3], 7.0, 8e-5, 2.0, 90.0, 10.0, 0.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let set = five_section_set();
        assert_eq!(set.size(), 3);
        assert_eq!(set.sections().len(), 5);
        let rup = set.rupture(1);
        assert_eq!(rup.section_count(), 3);
        assert_eq!(rup.sections().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(rup.mag, 7.1);
    }

    #[test]
    fn test_bitset_filter() {
        let set = five_section_set();
        // sections 1 and 2 hit
        let mut bits = BitSet::with_capacity(5);
        bits.insert(1);
        bits.insert(2);
        assert_eq!(set.filtered_indices(&bits), vec![0, 1, 2]);

        // sections 0 and 1 hit: rupture 1 ({2,3,4}) is excluded
        let mut bits = BitSet::with_capacity(5);
        bits.insert(0);
        bits.insert(1);
        assert_eq!(set.filtered_indices(&bits), vec![0, 2]);
    }

    #[test]
    fn test_site_filter() {
        let set = five_section_set();
        // near section 0 only
        let site = Location::surface(34.0, -118.1);
        let bits = set.section_bits_within(&site, 30.0);
        assert!(bits.contains(0));
        assert!(!bits.contains(4));
        let hits = set.filtered_indices(&bits);
        assert!(hits.contains(&0));
        assert!(!hits.contains(&1));
    }

    #[test]
    fn test_single_section_rupture_rejected() {
        let res = SystemSourceSet::builder("Bad", 1.0, test_gmms())
            .section(section_at(34.0))
            .section(section_at(35.0))
            .rupture(vec![0], 6.5, 1e-4, 2.0, 90.0, 10.0, 0.0)
            .build();
        assert!(matches!(
            res,
            Err(ValidationError::SystemSectionCount { index: 0, count: 1 })
        ));
    }

    #[test]
    fn test_out_of_range_section_rejected() {
        let res = SystemSourceSet::builder("Bad", 1.0, test_gmms())
            .section(section_at(34.0))
            .section(section_at(35.0))
            .rupture(vec![0, 2], 6.5, 1e-4, 2.0, 90.0, 10.0, 0.0)
            .build();
        assert!(matches!(res, Err(ValidationError::SectionIndex(2, 2))));
    }
}
