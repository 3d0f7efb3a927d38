//! # Point-Source Surfaces and Finite-Surface Distance Math
//!
//! Gridded background seismicity represents each grid node as a point
//! that stands in for a finite rupture. This module provides:
//!
//! - [`FocalMech`] and [`FocalMechMap`]: focal mechanisms and their
//!   weights.
//! - [`MechIndexing`]: the shared rupture index arithmetic over the
//!   Cartesian product of magnitude–depth bins and mechanism
//!   representations (strike-slip, then reverse footwall/hanging-wall,
//!   then normal footwall/hanging-wall).
//! - [`PointSurface`]: the degenerate, finite, and fixed-strike surface
//!   variants with their self-consistent `(rJB, rRup, rX)` metrics.
//! - [`DistanceCorrection`]: the NSHMP08-style lookup correction that
//!   maps epicentral distance to an effective `rJB` for a point that
//!   actually represents a finite rupture.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::auxilary::SEISMOGENIC_DEPTH;
use crate::error::ValidationError;
use crate::geodesy::{Location, EARTH_RADIUS};
use crate::magnitudes::check_weight_sum;
use crate::msr::MagScalingType;
use crate::rupture::Distances;

/// Focal mechanism of a gridded-seismicity rupture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalMech {
    StrikeSlip,
    Reverse,
    Normal,
}

impl FocalMech {
    /// Representative rake angle in degrees.
    pub fn rake(&self) -> f64 {
        match self {
            Self::StrikeSlip => 0.0,
            Self::Reverse => 90.0,
            Self::Normal => -90.0,
        }
    }

    /// Representative dip angle in degrees.
    pub fn dip(&self) -> f64 {
        match self {
            Self::StrikeSlip => 90.0,
            Self::Reverse => 50.0,
            Self::Normal => 50.0,
        }
    }
}

impl FromStr for FocalMech {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRIKE_SLIP" => Ok(Self::StrikeSlip),
            "REVERSE" => Ok(Self::Reverse),
            "NORMAL" => Ok(Self::Normal),
            other => Err(format!("unknown focal mechanism: {other}")),
        }
    }
}

/// Focal-mechanism weights for a grid source set or node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalMechMap {
    pub strike_slip: f64,
    pub reverse: f64,
    pub normal: f64,
}

impl FocalMechMap {
    /// Create and validate a mechanism weight map (weights sum to 1).
    pub fn new(strike_slip: f64, reverse: f64, normal: f64) -> Result<Self, ValidationError> {
        check_weight_sum(&[strike_slip, reverse, normal])?;
        Ok(Self { strike_slip, reverse, normal })
    }

    /// Weight of `mech`.
    pub fn weight(&self, mech: FocalMech) -> f64 {
        match mech {
            FocalMech::StrikeSlip => self.strike_slip,
            FocalMech::Reverse => self.reverse,
            FocalMech::Normal => self.normal,
        }
    }
}

/// Rupture index arithmetic shared by the point-source variants.
///
/// Ruptures are ordered strike-slip, then reverse
/// (footwall, hanging-wall), then normal (footwall, hanging-wall); each
/// block covers every magnitude–depth bin. Mechanisms with zero weight
/// contribute no indices, and only finite representations duplicate
/// non-strike-slip mechanisms into footwall/hanging-wall pairs.
#[derive(Debug, Clone, Copy)]
pub struct MechIndexing {
    mag_depth_count: usize,
    ss_count: usize,
    rev_count: usize,
    nor_count: usize,
    fw_idx_lo: usize,
    fw_idx_hi: usize,
    finite: bool,
}

impl MechIndexing {
    /// Index layout for `mag_depth_count` magnitude–depth bins under
    /// `mechs`. `finite` selects footwall/hanging-wall duplication.
    pub fn new(mechs: &FocalMechMap, mag_depth_count: usize, finite: bool) -> Self {
        let present = |w: f64| usize::from(w > 0.0);
        let dup = if finite { 2 } else { 1 };
        let ss_count = present(mechs.strike_slip) * mag_depth_count;
        let rev_count = present(mechs.reverse) * mag_depth_count * dup;
        let nor_count = present(mechs.normal) * mag_depth_count * dup;
        Self {
            mag_depth_count,
            ss_count,
            rev_count,
            nor_count,
            fw_idx_lo: ss_count + rev_count / 2,
            fw_idx_hi: ss_count + rev_count + nor_count / 2,
            finite,
        }
    }

    /// Total rupture count.
    pub fn size(&self) -> usize {
        self.ss_count + self.rev_count + self.nor_count
    }

    /// Mechanism of rupture `index`.
    pub fn mech(&self, index: usize) -> FocalMech {
        if index < self.ss_count {
            FocalMech::StrikeSlip
        } else if index < self.ss_count + self.rev_count {
            FocalMech::Reverse
        } else {
            FocalMech::Normal
        }
    }

    /// Magnitude–depth bin of rupture `index`.
    pub fn mag_depth_index(&self, index: usize) -> usize {
        let block_local = if index < self.ss_count {
            index
        } else if index < self.ss_count + self.rev_count {
            index - self.ss_count
        } else {
            index - self.ss_count - self.rev_count
        };
        block_local % self.mag_depth_count
    }

    /// `true` if rupture `index` is a footwall representation. All
    /// non-finite representations are footwall.
    pub fn is_on_footwall(&self, index: usize) -> bool {
        if !self.finite {
            return true;
        }
        index < self.fw_idx_lo || {
            let i = index - self.ss_count;
            self.rev_count <= i && i < self.rev_count + self.nor_count / 2
        }
    }

    /// Mechanism weight applied to rupture `index`, halved for finite
    /// non-strike-slip representations.
    pub fn mech_weight(&self, mechs: &FocalMechMap, index: usize) -> f64 {
        let mech = self.mech(index);
        let w = mechs.weight(mech);
        if self.finite && mech != FocalMech::StrikeSlip {
            w * 0.5
        } else {
            w
        }
    }
}

/// Rupture length in kilometers from the Wells & Coppersmith (1994)
/// magnitude–length relation.
pub fn rupture_length(m: f64) -> f64 {
    MagScalingType::Wc94Length.relation().value(m)
}

/// Down-dip rupture width in kilometers for a point rupture of
/// magnitude `m` with top at depth `z_top` and dip `dip_rad` (radians):
/// the lesser of the aspect-ratio width `L / 1.5` and the width
/// remaining above the bottom of the seismogenic zone.
pub fn rupture_width(m: f64, z_top: f64, dip_rad: f64) -> f64 {
    let w_aspect = rupture_length(m) / 1.5;
    // intraslab tops below the seismogenic zone collapse to zero width
    let w_dd = ((SEISMOGENIC_DEPTH - z_top) / dip_rad.sin()).max(0.0);
    w_aspect.min(w_dd)
}

/// Point-source distance correction selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceCorrection {
    /// Use the epicentral distance unmodified.
    None,
    /// NSHMP08-style lookup: scales epicentral distance by the mean
    /// `rJB / r` ratio of a random-strike line source of
    /// magnitude-dependent length.
    #[default]
    Nshmp08,
}

const CORR_STEP: f64 = 0.1;
const CORR_MAX: f64 = 10.0;

static CORR_TABLE: OnceLock<Vec<f64>> = OnceLock::new();

/// Mean `rJB / r` over uniformly distributed strike for a site at
/// normalized distance `u = r / L` from the center of a unit-length
/// line source.
fn mean_ratio(u: f64) -> f64 {
    let n = 256;
    let step = FRAC_PI_2 / n as f64;
    let mut sum = 0.0;
    for i in 0..n {
        let theta = (i as f64 + 0.5) * step;
        let x = u * theta.cos();
        let y = u * theta.sin();
        let d = if x <= 0.5 {
            y
        } else {
            let dx = x - 0.5;
            (dx * dx + y * y).sqrt()
        };
        sum += d;
    }
    sum / n as f64 / u
}

fn correction_table() -> &'static Vec<f64> {
    CORR_TABLE.get_or_init(|| {
        let n = (CORR_MAX / CORR_STEP) as usize;
        (1..=n).map(|i| mean_ratio(i as f64 * CORR_STEP)).collect()
    })
}

impl DistanceCorrection {
    /// Effective `rJB` for epicentral distance `r` (km) and magnitude
    /// `m`.
    pub fn apply(&self, r: f64, m: f64) -> f64 {
        match self {
            Self::None => r,
            Self::Nshmp08 => {
                if r <= 0.0 {
                    return 0.0;
                }
                let u = r / rupture_length(m);
                if u >= CORR_MAX {
                    return r;
                }
                let table = correction_table();
                let pos = (u / CORR_STEP).max(1.0) - 1.0;
                let i = (pos.floor() as usize).min(table.len() - 2);
                let f = pos - i as f64;
                let ratio = table[i] + f * (table[i + 1] - table[i]);
                r * ratio
            }
        }
    }
}

/// The surface variant a point source exposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointSurfaceKind {
    /// Degenerate point: all distance metrics collapse to the corrected
    /// epicentral distance.
    Point,
    /// Finite rectangle with no preferred strike; footwall and
    /// hanging-wall representations are modeled explicitly.
    Finite,
    /// Finite rectangle along an explicit strike (degrees); the two
    /// representations mirror each other across the point.
    FixedStrike(f64),
}

/// The mutable, reusable surface of a gridded-seismicity rupture.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSurface {
    /// Grid node the surface represents.
    pub loc: Location,
    /// Magnitude, used by the distance correction and width rules.
    pub mag: f64,
    /// Dip in degrees.
    pub dip: f64,
    /// Depth to the top of the rupture in kilometers.
    pub z_top: f64,
    /// Depth to the bottom of the rupture in kilometers.
    pub z_bot: f64,
    /// Down-dip width in kilometers.
    pub width_dd: f64,
    /// Rupture length in kilometers.
    pub length: f64,
    /// `true` for the footwall representation.
    pub footwall: bool,
    /// Surface variant.
    pub kind: PointSurfaceKind,
    /// Distance correction applied to the degenerate variant.
    pub correction: DistanceCorrection,
}

impl PointSurface {
    /// Placeholder surface, overwritten on each iterator advance.
    pub fn empty(loc: Location, kind: PointSurfaceKind) -> Self {
        Self {
            loc,
            mag: 0.0,
            dip: 90.0,
            z_top: 0.0,
            z_bot: 0.0,
            width_dd: 0.0,
            length: 0.0,
            footwall: true,
            kind,
            correction: DistanceCorrection::default(),
        }
    }

    /// Site-to-surface distance triple `(rJB, rRup, rX)` in kilometers.
    pub fn distances(&self, site: &Location) -> Distances {
        match self.kind {
            PointSurfaceKind::Point => {
                let r = self.correction.apply(site.horz_distance(&self.loc), self.mag);
                Distances::new(r, r, r)
            }
            PointSurfaceKind::Finite => {
                let r_jb = site.horz_distance(&self.loc);
                self.finite_distances(r_jb, self.footwall)
            }
            PointSurfaceKind::FixedStrike(strike) => {
                let r_jb = self.segment_distance(site, strike);
                let angle = (self.loc.azimuth(site) - strike).to_radians();
                let site_positive = angle.sin() >= 0.0;
                // the footwall representation dips away from the
                // positive (strike + 90°) side, its mirror toward it
                let on_footwall = site_positive == self.footwall;
                self.finite_distances(r_jb, on_footwall)
            }
        }
    }

    /// Footwall / hanging-wall distance metrics for a finite surface at
    /// horizontal distance `r_jb` from the site.
    fn finite_distances(&self, r_jb: f64, footwall: bool) -> Distances {
        let dip_rad = self.dip.to_radians();
        let w_h = self.width_dd * dip_rad.cos();

        if footwall {
            let r_rup = (r_jb * r_jb + self.z_top * self.z_top).sqrt();
            return Distances::new(r_jb, r_rup, -r_jb);
        }

        let r_x = r_jb + w_h;
        let r_cut = self.z_bot * dip_rad.tan();
        let r_rup = if !r_cut.is_finite() || r_jb > r_cut {
            (r_jb * r_jb + self.z_bot * self.z_bot).sqrt()
        } else {
            let r_rup_0 = (w_h * w_h + self.z_top * self.z_top)
                .sqrt()
                .min(self.z_bot * dip_rad.cos());
            let r_rup_c = self.z_bot / dip_rad.cos();
            r_rup_0 + (r_rup_c - r_rup_0) * r_jb / r_cut
        };
        Distances::new(r_jb, r_rup, r_x)
    }

    /// Horizontal distance from `site` to a `length`-km segment through
    /// the source point along `strike`, using a local flat projection.
    fn segment_distance(&self, site: &Location, strike: f64) -> f64 {
        let x = (site.lon - self.loc.lon).to_radians()
            * self.loc.lat.to_radians().cos()
            * EARTH_RADIUS;
        let y = (site.lat - self.loc.lat).to_radians() * EARTH_RADIUS;
        let sr = strike.to_radians();
        let (ux, uy) = (sr.sin(), sr.cos());
        let half = self.length / 2.0;
        let along = (x * ux + y * uy).clamp(-half, half);
        let dx = x - along * ux;
        let dy = y - along * uy;
        (dx * dx + dy * dy).sqrt()
    }
}
