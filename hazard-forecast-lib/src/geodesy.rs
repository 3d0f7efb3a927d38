//! # Geodetic Primitives
//!
//! This module provides the location types and distance math used across
//! the forecast model: exact haversine distances and bearings (via the
//! [`geo`](https://docs.rs/geo/) crate), a cheap flat-earth horizontal
//! distance for bulk filtering, and ordered location sequences (traces)
//! with resampling support for surface construction.
//!
//! ## Primary Types
//!
//! - [`Location`]: an immutable `(lat, lon, depth)` triple in decimal
//!   degrees and kilometers.
//! - [`LocationList`]: an ordered sequence of [`Location`]s, typically a
//!   fault trace.
//!
//! ## Conventions
//!
//! - Latitude and longitude are decimal degrees; depth is kilometers,
//!   positive down.
//! - All distances are kilometers.
//! - Azimuths are decimal degrees clockwise from north in `[0°, 360°)`.

use crate::error::ValidationError;
use geo::{Bearing, Destination, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometers, used by the fast flat-earth distance.
pub const EARTH_RADIUS: f64 = 6371.0072;

/// An immutable geographic location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Depth in kilometers, positive down. Zero at the surface.
    #[serde(default)]
    pub depth: f64,
}

impl Location {
    /// Create a new location.
    pub fn new(lat: f64, lon: f64, depth: f64) -> Self {
        Self { lat, lon, depth }
    }

    /// Create a new location at the surface (zero depth).
    pub fn surface(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, 0.0)
    }

    fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    /// Exact horizontal (epicentral) distance to `other` in kilometers.
    pub fn horz_distance(&self, other: &Location) -> f64 {
        Haversine.distance(self.point(), other.point()) / 1000.
    }

    /// Fast flat-earth horizontal distance to `other` in kilometers.
    ///
    /// Scales the longitude difference by the cosine of the mean latitude.
    /// Accurate to well under a percent for separations below a few
    /// hundred kilometers, which is the regime of every distance filter.
    pub fn horz_distance_fast(&self, other: &Location) -> f64 {
        let d_lat = (self.lat - other.lat).to_radians();
        let mid_lat = (0.5 * (self.lat + other.lat)).to_radians();
        let d_lon = (self.lon - other.lon).to_radians() * mid_lat.cos();
        EARTH_RADIUS * (d_lat * d_lat + d_lon * d_lon).sqrt()
    }

    /// Full 3-D distance to `other` in kilometers, combining the exact
    /// horizontal distance with the depth difference.
    pub fn distance_3d(&self, other: &Location) -> f64 {
        let h = self.horz_distance(other);
        let dz = self.depth - other.depth;
        (h * h + dz * dz).sqrt()
    }

    /// Azimuth from this location to `other` in decimal degrees
    /// clockwise from north, in `[0°, 360°)`.
    pub fn azimuth(&self, other: &Location) -> f64 {
        let az = Haversine.bearing(self.point(), other.point());
        if az < 0.0 { az + 360.0 } else { az }
    }

    /// New location reached by moving `horiz` kilometers along `azimuth`
    /// (degrees) and changing depth by `delta_depth` kilometers.
    pub fn move_along(&self, azimuth: f64, horiz: f64, delta_depth: f64) -> Location {
        let p = Haversine.destination(self.point(), azimuth, horiz * 1000.);
        Location::new(p.y(), p.x(), self.depth + delta_depth)
    }
}

/// An ordered sequence of [`Location`]s.
///
/// Used for fault traces (upper and lower edges) and any other location
/// path. A trace used as a fault edge must have at least 2 points with
/// monotonically non-decreasing depths; see [`LocationList::validate_trace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationList(Vec<Location>);

impl LocationList {
    /// Create a location list from a vector of locations.
    pub fn from(locs: Vec<Location>) -> Self {
        Self(locs)
    }

    /// Number of locations in the list.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if the list holds no locations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Location at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Location> {
        self.0.get(index)
    }

    /// First location of the list.
    pub fn first(&self) -> Option<&Location> {
        self.0.first()
    }

    /// Last location of the list.
    pub fn last(&self) -> Option<&Location> {
        self.0.last()
    }

    /// Iterator over the locations.
    pub fn iter(&self) -> std::slice::Iter<'_, Location> {
        self.0.iter()
    }

    /// Total horizontal length of the polyline in kilometers.
    pub fn length(&self) -> f64 {
        self.0
            .windows(2)
            .map(|w| w[0].horz_distance(&w[1]))
            .sum()
    }

    /// Mean location of the list (arithmetic mean of each coordinate).
    pub fn centroid(&self) -> Location {
        let n = self.0.len() as f64;
        let (lat, lon, depth) = self.0.iter().fold((0.0, 0.0, 0.0), |acc, l| {
            (acc.0 + l.lat, acc.1 + l.lon, acc.2 + l.depth)
        });
        Location::new(lat / n, lon / n, depth / n)
    }

    /// Azimuth from the first to the last point, the nominal strike of a
    /// trace, in `[0°, 360°)`.
    pub fn strike(&self) -> f64 {
        self.0[0].azimuth(&self.0[self.0.len() - 1])
    }

    /// Minimum fast horizontal distance from `loc` to any point of the
    /// list, in kilometers.
    pub fn min_horz_distance_fast(&self, loc: &Location) -> f64 {
        self.0
            .iter()
            .map(|l| loc.horz_distance_fast(l))
            .fold(f64::INFINITY, f64::min)
    }

    /// Minimum fast horizontal distance from `loc` to either endpoint of
    /// the list, in kilometers. This is the fault-filter predicate input.
    pub fn min_endpoint_distance_fast(&self, loc: &Location) -> f64 {
        let d0 = loc.horz_distance_fast(&self.0[0]);
        let d1 = loc.horz_distance_fast(&self.0[self.0.len() - 1]);
        d0.min(d1)
    }

    /// Check the fault-trace invariants: at least 2 points and depths
    /// monotonically non-decreasing from first to last.
    pub fn validate_trace(&self) -> Result<(), ValidationError> {
        if self.0.len() < 2 {
            return Err(ValidationError::TraceSize(self.0.len()));
        }
        if self.0.windows(2).any(|w| w[1].depth < w[0].depth) {
            return Err(ValidationError::TraceDepthOrder);
        }
        Ok(())
    }

    /// Resample the polyline at an approximately uniform `spacing` in
    /// kilometers.
    ///
    /// The polyline is divided into `round(length / spacing)` equal
    /// segments (at least one), so the returned list always includes both
    /// endpoints and has `n + 1` points at an effective spacing of
    /// `length / n`. Coordinates are interpolated linearly within
    /// segments.
    pub fn resample(&self, spacing: f64) -> LocationList {
        if self.0.len() < 2 {
            return self.clone();
        }
        let total = self.length();
        if total <= 0.0 || spacing <= 0.0 {
            return self.clone();
        }
        let n = (total / spacing).round().max(1.0) as usize;
        let step = total / n as f64;

        // cumulative distances along the polyline
        let mut cum = Vec::with_capacity(self.0.len());
        cum.push(0.0);
        for w in self.0.windows(2) {
            let last = *cum.last().unwrap_or(&0.0);
            cum.push(last + w[0].horz_distance(&w[1]));
        }

        let mut out = Vec::with_capacity(n + 1);
        out.push(self.0[0]);
        let mut seg = 0usize;
        for k in 1..n {
            let target = k as f64 * step;
            while seg + 2 < self.0.len() && cum[seg + 1] < target {
                seg += 1;
            }
            let seg_len = cum[seg + 1] - cum[seg];
            let f = if seg_len > 0.0 {
                (target - cum[seg]) / seg_len
            } else {
                0.0
            };
            let a = &self.0[seg];
            let b = &self.0[seg + 1];
            out.push(Location::new(
                a.lat + f * (b.lat - a.lat),
                a.lon + f * (b.lon - a.lon),
                a.depth + f * (b.depth - a.depth),
            ));
        }
        out.push(self.0[self.0.len() - 1]);
        LocationList(out)
    }
}

impl<'a> IntoIterator for &'a LocationList {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
