//! # Fault Sources
//!
//! A fault source couples an evenly gridded fault surface with one or
//! more magnitude–frequency distributions and materializes the full
//! rupture list at build time. Non-floating MFD bins each yield one
//! full-surface rupture; floating bins yield one rupture per valid
//! position of a magnitude-scaled subset surface, with the bin rate
//! divided evenly among positions.

use std::sync::Arc;

use crate::auxilary::RATE_FLOOR;
use crate::error::ValidationError;
use crate::geodesy::{Location, LocationList};
use crate::gmm::GmmSet;
use crate::magnitudes::{check_rake, check_weight};
use crate::mfd::IncrementalMfd;
use crate::msr::{MagScalingType, ScalingDimension};
use crate::rupture::{Rupture, Surface};
use crate::sourceset::SourceType;
use crate::surface::GriddedSurface;

/// How a floating rupture is positioned down dip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatStyle {
    /// Force full down-dip extent; ruptures float along strike only.
    #[default]
    FullDownDip,
    /// Float both along strike and down dip.
    DownDip,
    /// Float along strike with the rupture centered down dip.
    Centered,
}

/// Rupture length and down-dip width for magnitude `m` under a scaling
/// relation, an aspect ratio, and the maximum down-dip width of the
/// parent surface.
pub fn rupture_dimensions(
    msr: MagScalingType,
    m: f64,
    aspect_ratio: f64,
    max_width: f64,
) -> (f64, f64) {
    let rel = msr.relation();
    let length = match rel.dimension {
        ScalingDimension::Length => rel.value(m),
        ScalingDimension::Area => {
            let area = rel.value(m);
            let w0 = (area / aspect_ratio).sqrt();
            area / w0.min(max_width)
        }
    };
    let width = (length / aspect_ratio).min(max_width);
    (length, width)
}

/// Materialize the rupture list for `mfds` over `surface`.
///
/// Shared by fault and interface sources. Bins with rates below the
/// numerical floor are dropped.
pub(crate) fn generate_ruptures(
    surface: &Arc<GriddedSurface>,
    mfds: &[IncrementalMfd],
    rake: f64,
    msr: MagScalingType,
    aspect_ratio: f64,
    offset: f64,
    float_style: FloatStyle,
) -> Vec<Rupture> {
    let max_width = surface.width();
    let mut ruptures = Vec::new();

    for mfd in mfds {
        for (m, r) in mfd.iter() {
            if r < RATE_FLOOR {
                continue;
            }
            if !mfd.floats() {
                ruptures.push(Rupture::new(m, rake, r, Surface::Gridded(surface.clone())));
                continue;
            }

            let (length, mut width) = rupture_dimensions(msr, m, aspect_ratio, max_width);
            if float_style == FloatStyle::FullDownDip {
                width = 2.0 * max_width;
            }

            let n = match float_style {
                FloatStyle::Centered => surface.num_subset_surfaces_along_length(length, offset),
                _ => surface.num_subset_surfaces(length, width, offset),
            };
            let rate = r / n as f64;
            for k in 0..n {
                let sub = match float_style {
                    FloatStyle::Centered => {
                        surface.centered_subset_surface(length, width, offset, k)
                    }
                    _ => surface.subset_surface(length, width, offset, k),
                };
                ruptures.push(Rupture::new(
                    m,
                    rake,
                    rate,
                    Surface::Gridded(Arc::new(sub)),
                ));
            }
        }
    }
    ruptures
}

/// A fault source: a named gridded surface with its materialized
/// rupture list.
#[derive(Debug)]
pub struct FaultSource {
    name: String,
    trace: LocationList,
    surface: Arc<GriddedSurface>,
    rake: f64,
    ruptures: Vec<Rupture>,
}

impl FaultSource {
    /// Start building a fault source.
    pub fn builder() -> FaultSourceBuilder {
        FaultSourceBuilder::default()
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper fault trace.
    pub fn trace(&self) -> &LocationList {
        &self.trace
    }

    /// The parent fault surface.
    pub fn surface(&self) -> &Arc<GriddedSurface> {
        &self.surface
    }

    /// Rake of every rupture of this source, degrees.
    pub fn rake(&self) -> f64 {
        self.rake
    }

    /// Number of ruptures.
    pub fn size(&self) -> usize {
        self.ruptures.len()
    }

    /// Iterator over the rupture list.
    pub fn iter(&self) -> std::slice::Iter<'_, Rupture> {
        self.ruptures.iter()
    }

    /// The rupture list.
    pub fn ruptures(&self) -> &[Rupture] {
        &self.ruptures
    }
}

/// Single-use builder for [`FaultSource`].
#[derive(Default)]
pub struct FaultSourceBuilder {
    name: Option<String>,
    trace: Option<LocationList>,
    dip: Option<f64>,
    width: Option<f64>,
    rake: Option<f64>,
    depth: Option<f64>,
    mfds: Vec<IncrementalMfd>,
    msr: Option<MagScalingType>,
    aspect_ratio: f64,
    offset: f64,
    float_style: FloatStyle,
}

impl FaultSourceBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Upper fault trace; its first point sets the depth of the top of
    /// the surface unless [`FaultSourceBuilder::depth`] overrides it.
    pub fn trace(mut self, trace: LocationList) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn dip(mut self, dip: f64) -> Self {
        self.dip = Some(dip);
        self
    }

    /// Down-dip width in kilometers.
    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn rake(mut self, rake: f64) -> Self {
        self.rake = Some(rake);
        self
    }

    /// Depth to the top of the surface in kilometers, applied to every
    /// trace point.
    pub fn depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn mfds(mut self, mfds: Vec<IncrementalMfd>) -> Self {
        self.mfds = mfds;
        self
    }

    pub fn mag_scaling(mut self, msr: MagScalingType) -> Self {
        self.msr = Some(msr);
        self
    }

    /// Rupture length / down-dip width ratio for floating ruptures.
    /// Defaults to 1.0.
    pub fn aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Grid spacing and floating offset in kilometers. Defaults to 1.0.
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn float_style(mut self, style: FloatStyle) -> Self {
        self.float_style = style;
        self
    }

    /// Validate inputs, build the surface, and materialize the rupture
    /// list.
    pub fn build(self) -> Result<FaultSource, ValidationError> {
        let name = self
            .name
            .ok_or_else(|| ValidationError::MissingElement("name".into(), "fault source".into()))?;
        let trace = self.trace.ok_or_else(|| {
            ValidationError::MissingElement("trace".into(), format!("fault source '{name}'"))
        })?;
        let msr = self.msr.ok_or_else(|| {
            ValidationError::MissingElement("magScaling".into(), format!("fault source '{name}'"))
        })?;
        if self.mfds.is_empty() {
            return Err(ValidationError::EmptyMfd);
        }
        let dip = self.dip.ok_or_else(|| {
            ValidationError::MissingElement("dip".into(), format!("fault source '{name}'"))
        })?;
        let width = self.width.ok_or_else(|| {
            ValidationError::MissingElement("width".into(), format!("fault source '{name}'"))
        })?;
        let rake = check_rake(self.rake.ok_or_else(|| {
            ValidationError::MissingElement("rake".into(), format!("fault source '{name}'"))
        })?)?;

        let trace = match self.depth {
            Some(depth) => LocationList::from(
                trace
                    .iter()
                    .map(|l| Location::new(l.lat, l.lon, depth))
                    .collect(),
            ),
            None => trace,
        };

        let aspect_ratio = if self.aspect_ratio > 0.0 { self.aspect_ratio } else { 1.0 };
        let offset = if self.offset > 0.0 { self.offset } else { 1.0 };

        let surface = Arc::new(GriddedSurface::from_trace(&trace, dip, width, offset)?);
        let ruptures = generate_ruptures(
            &surface,
            &self.mfds,
            rake,
            msr,
            aspect_ratio,
            offset,
            self.float_style,
        );
        if ruptures.is_empty() {
            return Err(ValidationError::EmptySource(name));
        }

        Ok(FaultSource {
            name,
            trace,
            surface,
            rake,
            ruptures,
        })
    }
}

/// A group of fault sources sharing a weight and GMM assignment.
///
/// MFD rates inside the contained sources have already been multiplied
/// by the set weight at parse time; the stored weight is retained for
/// diagnostic reconstruction only.
#[derive(Debug)]
pub struct FaultSourceSet {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    mag_scaling: MagScalingType,
    sources: Vec<FaultSource>,
}

impl FaultSourceSet {
    /// Start building a fault source set.
    pub fn builder(name: &str, weight: f64, gmms: Arc<GmmSet>, msr: MagScalingType) -> FaultSourceSetBuilder {
        FaultSourceSetBuilder {
            name: name.to_string(),
            weight,
            gmms,
            mag_scaling: msr,
            sources: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn source_type(&self) -> SourceType {
        SourceType::Fault
    }

    pub fn gmms(&self) -> &Arc<GmmSet> {
        &self.gmms
    }

    pub fn mag_scaling(&self) -> MagScalingType {
        self.mag_scaling
    }

    /// Number of sources in the set.
    pub fn size(&self) -> usize {
        self.sources.len()
    }

    /// Iterator over all sources.
    pub fn iter(&self) -> std::slice::Iter<'_, FaultSource> {
        self.sources.iter()
    }

    /// Total rupture count across all sources.
    pub fn total_ruptures(&self) -> usize {
        self.sources.iter().map(FaultSource::size).sum()
    }

    /// `true` if `source` passes the cheap distance pre-filter: the
    /// horizontal distance from `site` to either end of the source
    /// trace is within `distance` km.
    pub fn distance_filter(&self, site: &Location, distance: f64, source: &FaultSource) -> bool {
        source.trace().min_endpoint_distance_fast(site) <= distance
    }

    /// Sources passing the distance pre-filter at the GMM set's maximum
    /// applicable distance.
    pub fn location_sources(&self, site: &Location) -> Vec<&FaultSource> {
        let d = self.gmms.max_dist_hi();
        self.sources
            .iter()
            .filter(|s| self.distance_filter(site, d, s))
            .collect()
    }
}

/// Single-use builder for [`FaultSourceSet`].
pub struct FaultSourceSetBuilder {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    mag_scaling: MagScalingType,
    sources: Vec<FaultSource>,
}

impl FaultSourceSetBuilder {
    /// Add a built source to the set.
    pub fn source(mut self, source: FaultSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Validate and build. A set with zero sources fails.
    pub fn build(self) -> Result<FaultSourceSet, ValidationError> {
        check_weight(self.weight)?;
        if self.sources.is_empty() {
            return Err(ValidationError::EmptySourceSet(self.name));
        }
        Ok(FaultSourceSet {
            name: self.name,
            weight: self.weight,
            gmms: self.gmms,
            mag_scaling: self.mag_scaling,
            sources: self.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxilary::approx_equal;
    use crate::gmm::{Gmm, GmmSet};

    fn test_gmms() -> Arc<GmmSet> {
        let map = [(Gmm::Ask14, 1.0)].into_iter().collect();
        Arc::new(GmmSet::builder(map, 300.0).build().unwrap())
    }

    fn test_trace() -> LocationList {
        let a = Location::surface(34.0, -118.0);
        let b = a.move_along(0.0, 20.0, 0.0);
        LocationList::from(vec![a, b])
    }

    fn single_source(mfds: Vec<IncrementalMfd>, style: FloatStyle) -> FaultSource {
        FaultSource::builder()
            .name("Test fault")
            .trace(test_trace())
            .dip(90.0)
            .width(15.0)
            .rake(0.0)
            .mfds(mfds)
            .mag_scaling(MagScalingType::Wc94Length)
            .aspect_ratio(1.0)
            .offset(1.0)
            .float_style(style)
            .build()
            .unwrap()
    }

    #[test]
    fn test_non_floating_single_rupture() {
        let mfd = IncrementalMfd::single(6.5, 0.001, false).unwrap();
        let src = single_source(vec![mfd], FloatStyle::FullDownDip);
        assert_eq!(src.size(), 1);
        let rup = &src.ruptures()[0];
        assert!(approx_equal(rup.rate, 0.001, 1e-15));
        assert!(approx_equal(rup.surface.width(), 15.0, 1e-9));
    }

    #[test]
    fn test_floating_rate_conservation() {
        let mfd = IncrementalMfd::single(6.0, 0.002, true).unwrap();
        let src = single_source(vec![mfd], FloatStyle::FullDownDip);
        // L(6.0) = 8.318 km floats into 13 positions on a 20 km trace
        assert_eq!(src.size(), 13);
        let total: f64 = src.iter().map(|r| r.rate).sum();
        assert!(approx_equal(total, 0.002, 1e-15));
    }

    #[test]
    fn test_full_down_dip_forces_full_width() {
        let mfd = IncrementalMfd::single(6.0, 0.002, true).unwrap();
        let src = single_source(vec![mfd], FloatStyle::FullDownDip);
        for rup in src.iter() {
            assert!(approx_equal(rup.surface.width(), 15.0, 1e-9));
            assert!(approx_equal(rup.surface.z_top(), 0.0, 1e-12));
        }
    }

    #[test]
    fn test_down_dip_floats_both_ways() {
        let mfd = IncrementalMfd::single(6.0, 0.002, true).unwrap();
        let src = single_source(vec![mfd], FloatStyle::DownDip);
        // W = min(L / 1.0, 15) = 8.318 spans 9 of 16 rows: 8 down-dip
        // positions x 13 along-strike positions
        assert_eq!(src.size(), 13 * 8);
        let total: f64 = src.iter().map(|r| r.rate).sum();
        assert!(approx_equal(total, 0.002, 1e-15));
    }

    #[test]
    fn test_centered_floats_along_strike_only() {
        let mfd = IncrementalMfd::single(6.0, 0.002, true).unwrap();
        let src = single_source(vec![mfd], FloatStyle::Centered);
        assert_eq!(src.size(), 13);
        for rup in src.iter() {
            // 9-row window on a 16-row surface centers at row 3
            assert!(approx_equal(rup.surface.z_top(), 3.0, 1e-9));
        }
    }

    #[test]
    fn test_rate_floor_drops_bins() {
        let mfd = IncrementalMfd::incremental(
            vec![6.0, 6.5],
            vec![1e-15, 0.001],
            false,
        )
        .unwrap();
        let src = single_source(vec![mfd], FloatStyle::FullDownDip);
        assert_eq!(src.size(), 1);
        assert!(approx_equal(src.ruptures()[0].mag, 6.5, 1e-12));
    }

    #[test]
    fn test_missing_inputs_rejected() {
        let mfd = IncrementalMfd::single(6.5, 0.001, false).unwrap();
        let res = FaultSource::builder()
            .name("No msr")
            .trace(test_trace())
            .dip(90.0)
            .width(15.0)
            .rake(0.0)
            .mfds(vec![mfd])
            .build();
        assert!(matches!(res, Err(ValidationError::MissingElement(_, _))));

        let res = FaultSource::builder()
            .name("No mfds")
            .trace(test_trace())
            .dip(90.0)
            .width(15.0)
            .rake(0.0)
            .mag_scaling(MagScalingType::Wc94Length)
            .build();
        assert!(matches!(res, Err(ValidationError::EmptyMfd)));
    }

    #[test]
    fn test_invalid_dip_rejected() {
        let mfd = IncrementalMfd::single(6.5, 0.001, false).unwrap();
        let res = FaultSource::builder()
            .name("Bad dip")
            .trace(test_trace())
            .dip(95.0)
            .width(15.0)
            .rake(0.0)
            .mfds(vec![mfd])
            .mag_scaling(MagScalingType::Wc94Length)
            .build();
        assert!(matches!(res, Err(ValidationError::DipRange(_))));
    }

    #[test]
    fn test_set_filter() {
        let mfd = IncrementalMfd::single(6.5, 0.001, false).unwrap();
        let src = single_source(vec![mfd], FloatStyle::FullDownDip);
        let set = FaultSourceSet::builder("Test set", 1.0, test_gmms(), MagScalingType::Wc94Length)
            .source(src)
            .build()
            .unwrap();

        let near = Location::surface(34.05, -118.05);
        let far = Location::surface(40.0, -110.0);
        assert_eq!(set.location_sources(&near).len(), 1);
        assert_eq!(set.location_sources(&far).len(), 0);
        assert_eq!(set.source_type(), SourceType::Fault);
    }

    #[test]
    fn test_empty_set_rejected() {
        let res = FaultSourceSet::builder("Empty", 1.0, test_gmms(), MagScalingType::Wc94Length)
            .build();
        assert!(matches!(res, Err(ValidationError::EmptySourceSet(_))));
    }

    #[test]
    fn test_area_scaling_dimensions() {
        // Ellsworth-B: A(7.0) = 10^2.8 = 631 km²; W0 = sqrt(631/1.0) =
        // 25.1 exceeds max width 15, so L = A / 15
        let (l, w) = rupture_dimensions(MagScalingType::EllsworthB, 7.0, 1.0, 15.0);
        assert!(approx_equal(l, 10_f64.powf(2.8) / 15.0, 1e-9));
        assert!(approx_equal(w, 15.0, 1e-9));
    }
}
