//! Rupture representation: an immutable bundle of magnitude, rake,
//! annual rate and surface, plus the site distance triple every
//! ground-motion model consumes.

use std::sync::Arc;

use crate::geodesy::Location;
use crate::pointsource::PointSurface;
use crate::surface::GriddedSurface;

/// The site-to-rupture distance metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceType {
    /// Closest horizontal distance to the surface projection (km).
    RJb,
    /// Closest 3-D distance to the rupture (km).
    RRup,
    /// Signed distance across strike, positive on the hanging wall (km).
    RX,
}

/// A site-to-rupture distance triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distances {
    pub r_jb: f64,
    pub r_rup: f64,
    pub r_x: f64,
}

impl Distances {
    /// Create a new distance triple.
    pub fn new(r_jb: f64, r_rup: f64, r_x: f64) -> Self {
        Self { r_jb, r_rup, r_x }
    }

    /// Value of the requested metric.
    pub fn get(&self, kind: DistanceType) -> f64 {
        match kind {
            DistanceType::RJb => self.r_jb,
            DistanceType::RRup => self.r_rup,
            DistanceType::RX => self.r_x,
        }
    }
}

/// The surface attached to a rupture.
///
/// Fault-like ruptures share immutable gridded surfaces by reference;
/// gridded-seismicity ruptures carry a small point surface by value so
/// reusing iterators can overwrite it in place.
#[derive(Debug, Clone)]
pub enum Surface {
    Gridded(Arc<GriddedSurface>),
    Point(PointSurface),
}

impl Surface {
    /// Dip of the surface in degrees.
    pub fn dip(&self) -> f64 {
        match self {
            Self::Gridded(s) => s.dip(),
            Self::Point(s) => s.dip,
        }
    }

    /// Depth to the top of the surface in kilometers.
    pub fn z_top(&self) -> f64 {
        match self {
            Self::Gridded(s) => s.z_top(),
            Self::Point(s) => s.z_top,
        }
    }

    /// Down-dip width in kilometers.
    pub fn width(&self) -> f64 {
        match self {
            Self::Gridded(s) => s.width(),
            Self::Point(s) => s.width_dd,
        }
    }

    /// Site-to-surface distance triple.
    pub fn distances(&self, site: &Location) -> Distances {
        match self {
            Self::Gridded(s) => s.distances(site),
            Self::Point(s) => s.distances(site),
        }
    }
}

/// An earthquake rupture: magnitude, rake, annual rate and surface.
///
/// Rate is an annual occurrence rate assuming Poisson behavior; the
/// conversion to exceedance probability is deferred to the hazard layer.
#[derive(Debug, Clone)]
pub struct Rupture {
    pub mag: f64,
    pub rake: f64,
    pub rate: f64,
    pub surface: Surface,
    pub hypocenter: Option<Location>,
}

impl Rupture {
    /// Create a new rupture without a hypocenter.
    pub fn new(mag: f64, rake: f64, rate: f64, surface: Surface) -> Self {
        Self { mag, rake, rate, surface, hypocenter: None }
    }

    /// Distance triple from `site` to this rupture's surface.
    pub fn distances(&self, site: &Location) -> Distances {
        self.surface.distances(site)
    }
}
