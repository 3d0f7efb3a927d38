//! # Gridded Background Seismicity
//!
//! A grid source set holds one point source per grid node. Each point
//! source manufactures finite-fault ruptures on the fly from the node
//! location plus the set's shared magnitude–depth–focal-mechanism
//! tables, using the index arithmetic of
//! [`MechIndexing`](crate::pointsource::MechIndexing).
//!
//! ## Iteration contract
//!
//! [`PointSource::ruptures`] returns a reusing iterator: every advance
//! overwrites and returns the same [`Rupture`], so the borrow ends
//! before the next advance and a fresh iterator is required per thread.
//! [`PointSource::get`] allocates a fresh rupture per call and is safe
//! to use from any thread, at a cost.
//!
//! Slab source sets reuse this module with
//! [`SourceType::Slab`](crate::sourceset::SourceType); the deeper
//! intraslab depths arrive through the data, not through code.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::geodesy::Location;
use crate::gmm::GmmSet;
use crate::magnitudes::{check_depth, check_weight, check_weight_sum};
use crate::mfd::IncrementalMfd;
use crate::pointsource::{
    rupture_length, rupture_width, DistanceCorrection, FocalMechMap, MechIndexing, PointSurface,
    PointSurfaceKind,
};
use crate::rupture::{Rupture, Surface};
use crate::sourceset::SourceType;

/// Depth distributions keyed by magnitude cutoff.
///
/// Outer keys are magnitude cutoffs interpreted as strict upper bounds;
/// inner entries map depth-of-top to weight, with weights summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct MagDepthMap {
    entries: Vec<(f64, Vec<(f64, f64)>)>,
}

impl MagDepthMap {
    /// Create and validate a magnitude–depth map: cutoffs strictly
    /// increasing, each depth-weight distribution summing to 1.
    pub fn new(mut entries: Vec<(f64, Vec<(f64, f64)>)>) -> Result<Self, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::MissingElement(
                "magDepthMap".into(),
                "grid source set".into(),
            ));
        }
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, depths) in &entries {
            for &(d, _) in depths {
                check_depth(d)?;
            }
            let weights: Vec<f64> = depths.iter().map(|(_, w)| *w).collect();
            check_weight_sum(&weights)?;
        }
        Ok(Self { entries })
    }

    /// The depth-weight distribution applicable to magnitude `m`: the
    /// entry with the smallest cutoff strictly greater than `m`.
    pub fn depths_for(&self, m: f64) -> Option<&[(f64, f64)]> {
        self.entries
            .iter()
            .find(|(cutoff, _)| m < *cutoff)
            .map(|(_, depths)| depths.as_slice())
    }
}

/// The shared lookup tables of a grid source set, referenced by every
/// contained point source.
///
/// The three parallel arrays flatten the magnitude–depth pairing: entry
/// `i` holds the MFD bin index, the depth of top, and the weight of one
/// pair. Their shared length is the per-source rupture count before
/// mechanism expansion.
#[derive(Debug)]
pub struct GridTables {
    /// Template MFD bin magnitudes the indices refer to.
    pub mags: Vec<f64>,
    /// Original MFD bin index per table entry.
    pub mag_depth_indices: Vec<usize>,
    /// Depth of top per table entry, km.
    pub mag_depth_depths: Vec<f64>,
    /// Weight per table entry.
    pub mag_depth_weights: Vec<f64>,
    /// Set-level focal mechanism weights.
    pub mechs: FocalMechMap,
    /// Surface variant the set's sources expose.
    pub kind: PointSurfaceKind,
    /// Point-source distance correction.
    pub correction: DistanceCorrection,
}

impl GridTables {
    fn build(
        mags: &[f64],
        mag_depth_map: &MagDepthMap,
        mechs: FocalMechMap,
        kind: PointSurfaceKind,
        correction: DistanceCorrection,
    ) -> Result<Self, ValidationError> {
        let mut indices = Vec::new();
        let mut depths = Vec::new();
        let mut weights = Vec::new();
        for (i, &m) in mags.iter().enumerate() {
            let dist = mag_depth_map
                .depths_for(m)
                .ok_or(ValidationError::MagDepthCoverage(m))?;
            for &(d, w) in dist {
                indices.push(i);
                depths.push(d);
                weights.push(w);
            }
        }
        Ok(Self {
            mags: mags.to_vec(),
            mag_depth_indices: indices,
            mag_depth_depths: depths,
            mag_depth_weights: weights,
            mechs,
            kind,
            correction,
        })
    }

    /// Flattened magnitude–depth pair count.
    pub fn len(&self) -> usize {
        self.mag_depth_indices.len()
    }

    /// `true` if the tables are empty. Construction rejects this state.
    pub fn is_empty(&self) -> bool {
        self.mag_depth_indices.is_empty()
    }
}

/// A single grid-node source.
#[derive(Debug)]
pub struct PointSource {
    loc: Location,
    mfd: IncrementalMfd,
    mechs: FocalMechMap,
    indexing: MechIndexing,
    tables: Arc<GridTables>,
}

impl PointSource {
    /// Node location.
    pub fn location(&self) -> &Location {
        &self.loc
    }

    /// Node MFD.
    pub fn mfd(&self) -> &IncrementalMfd {
        &self.mfd
    }

    /// Rupture count, including zero-rate entries the iterator skips.
    pub fn size(&self) -> usize {
        self.indexing.size()
    }

    /// Annual rate of rupture `index`: MFD rate × depth weight ×
    /// mechanism weight.
    pub fn rate(&self, index: usize) -> f64 {
        let md = self.indexing.mag_depth_index(index);
        self.mfd.rate(self.tables.mag_depth_indices[md])
            * self.tables.mag_depth_weights[md]
            * self.indexing.mech_weight(&self.mechs, index)
    }

    /// Random access: a freshly allocated rupture for `index`.
    /// Thread-safe but slow; prefer [`PointSource::ruptures`] in hot
    /// loops.
    pub fn get(&self, index: usize) -> Rupture {
        let surface = PointSurface::empty(self.loc, self.tables.kind);
        let mut rupture = Rupture::new(0.0, 0.0, 0.0, Surface::Point(surface));
        self.fill(index, &mut rupture);
        rupture
    }

    /// Reusing rupture iterator. Not thread-safe: obtain one iterator
    /// per thread, and never retain the returned reference across an
    /// advance.
    pub fn ruptures(&self) -> PointSourceRuptures<'_> {
        let surface = PointSurface::empty(self.loc, self.tables.kind);
        PointSourceRuptures {
            source: self,
            index: 0,
            rupture: Rupture::new(0.0, 0.0, 0.0, Surface::Point(surface)),
        }
    }

    fn fill(&self, index: usize, rupture: &mut Rupture) {
        let md = self.indexing.mag_depth_index(index);
        let m = self.tables.mags[self.tables.mag_depth_indices[md]];
        let z_top = self.tables.mag_depth_depths[md];
        let mech = self.indexing.mech(index);
        let dip = mech.dip();
        let dip_rad = dip.to_radians();
        let width = rupture_width(m, z_top, dip_rad);

        rupture.mag = m;
        rupture.rake = mech.rake();
        rupture.rate = self.rate(index);
        if let Surface::Point(surf) = &mut rupture.surface {
            surf.loc = self.loc;
            surf.mag = m;
            surf.dip = dip;
            surf.z_top = z_top;
            surf.z_bot = z_top + width * dip_rad.sin();
            surf.width_dd = width;
            surf.length = rupture_length(m);
            surf.footwall = self.indexing.is_on_footwall(index);
            surf.kind = self.tables.kind;
            surf.correction = self.tables.correction;
        }
    }
}

/// Reusing rupture iterator over a [`PointSource`]. Entries with zero
/// rate are skipped, so the iterator may yield fewer ruptures than
/// [`PointSource::size`].
pub struct PointSourceRuptures<'a> {
    source: &'a PointSource,
    index: usize,
    rupture: Rupture,
}

impl PointSourceRuptures<'_> {
    /// Advance and return the reused rupture. The returned reference is
    /// invalidated by the next advance.
    pub fn next(&mut self) -> Option<&Rupture> {
        while self.index < self.source.size() {
            let i = self.index;
            self.index += 1;
            if self.source.rate(i) == 0.0 {
                continue;
            }
            self.source.fill(i, &mut self.rupture);
            return Some(&self.rupture);
        }
        None
    }
}

/// A grid (or slab) source set.
#[derive(Debug)]
pub struct GridSourceSet {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    source_type: SourceType,
    tables: Arc<GridTables>,
    sources: Vec<PointSource>,
}

impl GridSourceSet {
    /// Start building a grid source set. `source_type` is
    /// [`SourceType::Grid`] or [`SourceType::Slab`].
    pub fn builder(
        name: &str,
        weight: f64,
        gmms: Arc<GmmSet>,
        source_type: SourceType,
    ) -> GridSourceSetBuilder {
        GridSourceSetBuilder {
            name: name.to_string(),
            weight,
            gmms,
            source_type,
            mag_depth_map: None,
            mechs: None,
            strike: None,
            finite: true,
            correction: DistanceCorrection::default(),
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn gmms(&self) -> &Arc<GmmSet> {
        &self.gmms
    }

    /// The shared lookup tables.
    pub fn tables(&self) -> &Arc<GridTables> {
        &self.tables
    }

    /// Number of grid-node sources.
    pub fn size(&self) -> usize {
        self.sources.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointSource> {
        self.sources.iter()
    }

    /// The node sources as a slice, for bulk (parallel) filtering.
    pub fn sources(&self) -> &[PointSource] {
        &self.sources
    }

    /// Total rupture count across all nodes, including zero-rate
    /// entries.
    pub fn total_ruptures(&self) -> usize {
        self.sources.iter().map(PointSource::size).sum()
    }

    /// Per-point distance filter: fast horizontal distance from `site`
    /// to the node within `distance` km.
    pub fn distance_filter(&self, site: &Location, distance: f64, source: &PointSource) -> bool {
        site.horz_distance_fast(source.location()) <= distance
    }

    /// Sources passing the distance pre-filter at the GMM set's maximum
    /// applicable distance.
    pub fn location_sources(&self, site: &Location) -> Vec<&PointSource> {
        let d = self.gmms.max_dist_hi();
        self.sources
            .iter()
            .filter(|s| self.distance_filter(site, d, s))
            .collect()
    }
}

/// Single-use builder for [`GridSourceSet`].
pub struct GridSourceSetBuilder {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    source_type: SourceType,
    mag_depth_map: Option<MagDepthMap>,
    mechs: Option<FocalMechMap>,
    strike: Option<f64>,
    finite: bool,
    correction: DistanceCorrection,
    nodes: Vec<(Location, IncrementalMfd, Option<FocalMechMap>)>,
}

impl GridSourceSetBuilder {
    /// Set-level magnitude–depth map.
    pub fn mag_depth_map(mut self, map: MagDepthMap) -> Self {
        self.mag_depth_map = Some(map);
        self
    }

    /// Set-level focal-mechanism weights.
    pub fn mechs(mut self, mechs: FocalMechMap) -> Self {
        self.mechs = Some(mechs);
        self
    }

    /// Explicit strike in degrees; selects the fixed-strike surface
    /// variant.
    pub fn strike(mut self, strike: Option<f64>) -> Self {
        self.strike = strike;
        self
    }

    /// `false` selects the degenerate point surface variant instead of
    /// finite rectangles. Ignored when a strike is set.
    pub fn finite(mut self, finite: bool) -> Self {
        self.finite = finite;
        self
    }

    /// Point-source distance correction.
    pub fn correction(mut self, correction: DistanceCorrection) -> Self {
        self.correction = correction;
        self
    }

    /// Add a grid node with its MFD and optional mechanism override.
    pub fn node(mut self, loc: Location, mfd: IncrementalMfd, mechs: Option<FocalMechMap>) -> Self {
        self.nodes.push((loc, mfd, mechs));
        self
    }

    /// Validate and build. Every node MFD must share the magnitude
    /// structure of the first node, and the magnitude–depth map must
    /// cover every magnitude.
    pub fn build(self) -> Result<GridSourceSet, ValidationError> {
        check_weight(self.weight)?;
        if self.nodes.is_empty() {
            return Err(ValidationError::EmptySourceSet(self.name));
        }
        let mag_depth_map = self.mag_depth_map.ok_or_else(|| {
            ValidationError::MissingElement("magDepthMap".into(), format!("set '{}'", self.name))
        })?;
        let mechs = self.mechs.ok_or_else(|| {
            ValidationError::MissingElement("focalMechMap".into(), format!("set '{}'", self.name))
        })?;

        let kind = match (self.strike, self.finite) {
            (Some(s), _) => PointSurfaceKind::FixedStrike(s),
            (None, true) => PointSurfaceKind::Finite,
            (None, false) => PointSurfaceKind::Point,
        };
        let finite = !matches!(kind, PointSurfaceKind::Point);

        let template = &self.nodes[0].1;
        let tables = Arc::new(GridTables::build(
            template.mags(),
            &mag_depth_map,
            mechs,
            kind,
            self.correction,
        )?);

        let mut sources = Vec::with_capacity(self.nodes.len());
        for (loc, mfd, node_mechs) in self.nodes {
            if mfd.len() != tables.mags.len() {
                return Err(ValidationError::LengthMismatch(mfd.len(), tables.mags.len()));
            }
            let node_mechs = node_mechs.unwrap_or(tables.mechs);
            let indexing = MechIndexing::new(&node_mechs, tables.len(), finite);
            sources.push(PointSource {
                loc,
                mfd,
                mechs: node_mechs,
                indexing,
                tables: tables.clone(),
            });
        }

        Ok(GridSourceSet {
            name: self.name,
            weight: self.weight,
            gmms: self.gmms,
            source_type: self.source_type,
            tables,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxilary::approx_equal;
    use crate::gmm::{Gmm, GmmSet};

    fn test_gmms() -> Arc<GmmSet> {
        let map = [(Gmm::Bssa14, 1.0)].into_iter().collect();
        Arc::new(GmmSet::builder(map, 200.0).build().unwrap())
    }

    fn ss_only() -> FocalMechMap {
        FocalMechMap::new(1.0, 0.0, 0.0).unwrap()
    }

    fn single_node_set() -> GridSourceSet {
        let map = MagDepthMap::new(vec![(10.0, vec![(5.0, 1.0)])]).unwrap();
        let mfd = IncrementalMfd::single(6.0, 0.03, false).unwrap();
        GridSourceSet::builder("Test grid", 1.0, test_gmms(), SourceType::Grid)
            .mag_depth_map(map)
            .mechs(ss_only())
            .node(Location::surface(34.0, -118.0), mfd, None)
            .build()
            .unwrap()
    }

    #[test]
    fn test_single_node_single_mag() {
        let set = single_node_set();
        assert_eq!(set.size(), 1);
        let src = &set.iter().next().unwrap();
        assert_eq!(src.size(), 1);

        let mut it = src.ruptures();
        let rup = it.next().unwrap();
        assert!(approx_equal(rup.mag, 6.0, 1e-12));
        assert!(approx_equal(rup.rake, 0.0, 1e-12));
        assert!(approx_equal(rup.rate, 0.03, 1e-15));
        assert!(approx_equal(rup.surface.dip(), 90.0, 1e-12));
        assert!(approx_equal(rup.surface.z_top(), 5.0, 1e-12));
        let rup2 = it.next();
        assert!(rup2.is_none());
    }

    #[test]
    fn test_mag_depth_table_layout() {
        let map = MagDepthMap::new(vec![
            (6.5, vec![(1.0, 0.4), (3.0, 0.5), (5.0, 0.1)]),
            (10.0, vec![(1.0, 0.1), (5.0, 0.9)]),
        ])
        .unwrap();
        let mfd = IncrementalMfd::incremental(
            vec![5.0, 5.5, 6.0, 6.5, 7.0],
            vec![1.0; 5],
            false,
        )
        .unwrap();
        let set = GridSourceSet::builder("Layered grid", 1.0, test_gmms(), SourceType::Grid)
            .mag_depth_map(map)
            .mechs(ss_only())
            .node(Location::surface(34.0, -118.0), mfd, None)
            .build()
            .unwrap();

        let tables = set.tables();
        // 3 mags below the 6.5 cutoff x 3 depths + 2 mags x 2 depths
        assert_eq!(tables.len(), 13);
        assert_eq!(&tables.mag_depth_depths[..3], &[1.0, 3.0, 5.0]);
        assert_eq!(&tables.mag_depth_weights[..3], &[0.4, 0.5, 0.1]);
        // the m = 6.5 bin falls in the second depth distribution
        assert_eq!(tables.mag_depth_indices[9], 3);
        assert_eq!(tables.mag_depth_depths[9], 1.0);

        let src = set.iter().next().unwrap();
        assert_eq!(src.size(), 13);
        let mut count = 0;
        let mut it = src.ruptures();
        while it.next().is_some() {
            count += 1;
        }
        assert_eq!(count, 13);
    }

    #[test]
    fn test_rate_conservation_with_mechanisms() {
        let map = MagDepthMap::new(vec![
            (6.5, vec![(1.0, 0.4), (5.0, 0.6)]),
            (10.0, vec![(1.0, 1.0)]),
        ])
        .unwrap();
        let mfd = IncrementalMfd::incremental(
            vec![5.0, 6.0, 7.0],
            vec![0.1, 0.01, 0.001],
            false,
        )
        .unwrap();
        let mechs = FocalMechMap::new(0.5, 0.3, 0.2).unwrap();
        let set = GridSourceSet::builder("Mech grid", 1.0, test_gmms(), SourceType::Grid)
            .mag_depth_map(map)
            .mechs(mechs)
            .node(Location::surface(34.0, -118.0), mfd.clone(), None)
            .build()
            .unwrap();

        let src = set.iter().next().unwrap();
        let total: f64 = (0..src.size()).map(|i| src.rate(i)).sum();
        // every magnitude's depth weights and mechanism weights sum to 1
        assert!((total - mfd.total_rate()).abs() < 1e-12);
    }

    #[test]
    fn test_get_matches_iterator() {
        let set = single_node_set();
        let src = set.iter().next().unwrap();
        let fresh = src.get(0);
        let mut it = src.ruptures();
        let reused = it.next().unwrap();
        assert_eq!(fresh.mag, reused.mag);
        assert_eq!(fresh.rate, reused.rate);
        assert_eq!(fresh.surface.z_top(), reused.surface.z_top());
    }

    #[test]
    fn test_missing_mag_depth_coverage() {
        let map = MagDepthMap::new(vec![(6.5, vec![(5.0, 1.0)])]).unwrap();
        let mfd = IncrementalMfd::single(7.0, 0.001, false).unwrap();
        let res = GridSourceSet::builder("Uncovered", 1.0, test_gmms(), SourceType::Grid)
            .mag_depth_map(map)
            .mechs(ss_only())
            .node(Location::surface(34.0, -118.0), mfd, None)
            .build();
        assert!(matches!(res, Err(ValidationError::MagDepthCoverage(_))));
    }

    #[test]
    fn test_point_filter() {
        let set = single_node_set();
        let near = Location::surface(34.5, -118.0);
        let far = Location::surface(37.0, -118.0);
        assert_eq!(set.location_sources(&near).len(), 1);
        assert_eq!(set.location_sources(&far).len(), 0);
    }

    #[test]
    fn test_slab_tag() {
        let map = MagDepthMap::new(vec![(10.0, vec![(50.0, 1.0)])]).unwrap();
        let mfd = IncrementalMfd::single(6.0, 0.03, false).unwrap();
        let set = GridSourceSet::builder("Slab set", 1.0, test_gmms(), SourceType::Slab)
            .mag_depth_map(map)
            .mechs(ss_only())
            .finite(false)
            .node(Location::surface(50.0, 155.0), mfd, None)
            .build()
            .unwrap();
        assert_eq!(set.source_type(), SourceType::Slab);
    }
}
