//! # Subduction Interface Sources
//!
//! An interface source carries the same rupture-generation contract as a
//! fault source, but its surface is approximated from an upper and a
//! lower trace; dip and width are derived by the surface rather than
//! supplied, and the builder accepts `NaN` for those scalars.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::fault::{generate_ruptures, FloatStyle};
use crate::geodesy::{Location, LocationList};
use crate::gmm::GmmSet;
use crate::magnitudes::{check_rake, check_weight};
use crate::mfd::IncrementalMfd;
use crate::msr::MagScalingType;
use crate::rupture::Rupture;
use crate::sourceset::SourceType;
use crate::surface::GriddedSurface;

/// A subduction interface source.
#[derive(Debug)]
pub struct InterfaceSource {
    name: String,
    upper_trace: LocationList,
    lower_trace: LocationList,
    surface: Arc<GriddedSurface>,
    rake: f64,
    ruptures: Vec<Rupture>,
}

impl InterfaceSource {
    /// Start building an interface source.
    pub fn builder() -> InterfaceSourceBuilder {
        InterfaceSourceBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upper_trace(&self) -> &LocationList {
        &self.upper_trace
    }

    pub fn lower_trace(&self) -> &LocationList {
        &self.lower_trace
    }

    pub fn surface(&self) -> &Arc<GriddedSurface> {
        &self.surface
    }

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

    pub fn ruptures(&self) -> &[Rupture] {
        &self.ruptures
    }
}

/// Single-use builder for [`InterfaceSource`].
#[derive(Default)]
pub struct InterfaceSourceBuilder {
    name: Option<String>,
    upper_trace: Option<LocationList>,
    lower_trace: Option<LocationList>,
    rake: Option<f64>,
    mfds: Vec<IncrementalMfd>,
    msr: Option<MagScalingType>,
    aspect_ratio: f64,
    offset: f64,
    float_style: FloatStyle,
}

impl InterfaceSourceBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn upper_trace(mut self, trace: LocationList) -> Self {
        self.upper_trace = Some(trace);
        self
    }

    pub fn lower_trace(mut self, trace: LocationList) -> Self {
        self.lower_trace = Some(trace);
        self
    }

    pub fn rake(mut self, rake: f64) -> Self {
        self.rake = Some(rake);
        self
    }

    /// Dip and width are derived from the traces; the values supplied
    /// with interface geometry are accepted and ignored, including
    /// `NaN`.
    pub fn dip(self, _dip: f64) -> Self {
        self
    }

    /// See [`InterfaceSourceBuilder::dip`].
    pub fn width(self, _width: f64) -> Self {
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

    pub fn aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Grid spacing and floating offset in kilometers. Defaults to 5.0,
    /// the working resolution of large interface surfaces.
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn float_style(mut self, style: FloatStyle) -> Self {
        self.float_style = style;
        self
    }

    /// Validate inputs, approximate the surface between the traces, and
    /// materialize the rupture list.
    pub fn build(self) -> Result<InterfaceSource, ValidationError> {
        let name = self.name.ok_or_else(|| {
            ValidationError::MissingElement("name".into(), "interface source".into())
        })?;
        let upper = self.upper_trace.ok_or_else(|| {
            ValidationError::MissingElement("trace".into(), format!("interface source '{name}'"))
        })?;
        let lower = self.lower_trace.ok_or_else(|| {
            ValidationError::MissingElement(
                "lowerTrace".into(),
                format!("interface source '{name}'"),
            )
        })?;
        let msr = self.msr.ok_or_else(|| {
            ValidationError::MissingElement(
                "magScaling".into(),
                format!("interface source '{name}'"),
            )
        })?;
        if self.mfds.is_empty() {
            return Err(ValidationError::EmptyMfd);
        }
        let rake = check_rake(self.rake.ok_or_else(|| {
            ValidationError::MissingElement("rake".into(), format!("interface source '{name}'"))
        })?)?;

        let aspect_ratio = if self.aspect_ratio > 0.0 { self.aspect_ratio } else { 1.0 };
        let offset = if self.offset > 0.0 { self.offset } else { 5.0 };

        let surface = Arc::new(GriddedSurface::approx_from_traces(&upper, &lower, offset)?);
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

        Ok(InterfaceSource {
            name,
            upper_trace: upper,
            lower_trace: lower,
            surface,
            rake,
            ruptures,
        })
    }
}

/// A group of interface sources sharing a weight and GMM assignment.
#[derive(Debug)]
pub struct InterfaceSourceSet {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    mag_scaling: MagScalingType,
    sources: Vec<InterfaceSource>,
}

impl InterfaceSourceSet {
    /// Start building an interface source set.
    pub fn builder(
        name: &str,
        weight: f64,
        gmms: Arc<GmmSet>,
        msr: MagScalingType,
    ) -> InterfaceSourceSetBuilder {
        InterfaceSourceSetBuilder {
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
        SourceType::Interface
    }

    pub fn gmms(&self) -> &Arc<GmmSet> {
        &self.gmms
    }

    pub fn mag_scaling(&self) -> MagScalingType {
        self.mag_scaling
    }

    pub fn size(&self) -> usize {
        self.sources.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterfaceSource> {
        self.sources.iter()
    }

    pub fn total_ruptures(&self) -> usize {
        self.sources.iter().map(InterfaceSource::size).sum()
    }

    /// `true` if `source` passes the cheap distance pre-filter: the
    /// horizontal distance from `site` to any endpoint of either trace
    /// is within `distance` km.
    pub fn distance_filter(
        &self,
        site: &Location,
        distance: f64,
        source: &InterfaceSource,
    ) -> bool {
        source.upper_trace().min_endpoint_distance_fast(site) <= distance
            || source.lower_trace().min_endpoint_distance_fast(site) <= distance
    }

    /// Sources passing the distance pre-filter at the GMM set's maximum
    /// applicable distance.
    pub fn location_sources(&self, site: &Location) -> Vec<&InterfaceSource> {
        let d = self.gmms.max_dist_hi();
        self.sources
            .iter()
            .filter(|s| self.distance_filter(site, d, s))
            .collect()
    }
}

/// Single-use builder for [`InterfaceSourceSet`].
pub struct InterfaceSourceSetBuilder {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    mag_scaling: MagScalingType,
    sources: Vec<InterfaceSource>,
}

impl InterfaceSourceSetBuilder {
    /// Add a built source to the set.
    pub fn source(mut self, source: InterfaceSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Validate and build. A set with zero sources fails.
    pub fn build(self) -> Result<InterfaceSourceSet, ValidationError> {
        check_weight(self.weight)?;
        if self.sources.is_empty() {
            return Err(ValidationError::EmptySourceSet(self.name));
        }
        Ok(InterfaceSourceSet {
            name: self.name,
            weight: self.weight,
            gmms: self.gmms,
            mag_scaling: self.mag_scaling,
            sources: self.sources,
        })
    }
}
