//! # Gridded Rupture Surfaces
//!
//! Evenly discretized fault surfaces and the floating-subset arithmetic
//! used by the rupture generators.
//!
//! A [`GriddedSurface`] is a row-major grid of [`Location`]s: columns run
//! along strike, rows run down dip, both at a uniform spacing in
//! kilometers. Surfaces are built either from an upper trace plus dip and
//! down-dip width ([`GriddedSurface::from_trace`]) or approximated from
//! an upper and a lower trace of a subduction interface
//! ([`GriddedSurface::approx_from_traces`]), in which case dip and width
//! are derived from the trace geometry.
//!
//! ## Distance metrics
//!
//! Site-to-surface distances are computed over the discretized grid:
//! `rRup` and `rJB` are minimum 3-D and horizontal node distances at the
//! working grid spacing, and `rX` is the horizontal distance to the top
//! edge signed by side of strike (positive on the hanging wall).

use crate::error::ValidationError;
use crate::geodesy::{Location, LocationList};
use crate::magnitudes::check_dip;
use crate::rupture::Distances;

/// An evenly discretized rupture surface.
#[derive(Debug, Clone)]
pub struct GriddedSurface {
    /// Row-major grid: `grid[row * n_cols + col]`.
    grid: Vec<Location>,
    n_rows: usize,
    n_cols: usize,
    /// Grid spacing in kilometers, both along strike and down dip.
    spacing: f64,
    strike: f64,
    dip: f64,
}

impl GriddedSurface {
    /// Build a surface from an upper trace, dip (degrees), down-dip
    /// width (km), and grid spacing (km).
    ///
    /// The depth of the top row is the depth of the first trace point;
    /// the surface extends `width · sin(dip)` below it. Columns follow
    /// the resampled trace; rows step down dip in the direction
    /// `strike + 90°`.
    pub fn from_trace(
        trace: &LocationList,
        dip: f64,
        width: f64,
        spacing: f64,
    ) -> Result<Self, ValidationError> {
        trace.validate_trace()?;
        check_dip(dip)?;

        let top = trace.resample(spacing);
        let n_cols = top.len();
        let n_rows = (width / spacing).round().max(1.0) as usize + 1;

        let strike = top.strike();
        let dip_dir = (strike + 90.0) % 360.0;
        let dip_rad = dip.to_radians();

        let mut grid = Vec::with_capacity(n_rows * n_cols);
        for row in 0..n_rows {
            let dd = row as f64 * spacing;
            let h = dd * dip_rad.cos();
            let v = dd * dip_rad.sin();
            for col in &top {
                grid.push(col.move_along(dip_dir, h, v));
            }
        }

        Ok(Self {
            grid,
            n_rows,
            n_cols,
            spacing,
            strike,
            dip,
        })
    }

    /// Approximate a surface between an upper and a lower trace, as used
    /// by subduction interface sources.
    ///
    /// Both traces are resampled to a common column count; rows are
    /// interpolated linearly between them. Dip and width are derived
    /// from the resulting geometry rather than supplied by the caller.
    pub fn approx_from_traces(
        upper: &LocationList,
        lower: &LocationList,
        spacing: f64,
    ) -> Result<Self, ValidationError> {
        upper.validate_trace()?;
        lower.validate_trace()?;

        let n_cols = (upper.length() / spacing).round().max(1.0) as usize + 1;
        let top = resample_to(upper, n_cols);
        let bottom = resample_to(lower, n_cols);

        // mean 3-D separation between the traces sets the row count
        let width: f64 = top
            .iter()
            .zip(bottom.iter())
            .map(|(t, b)| t.distance_3d(b))
            .sum::<f64>()
            / n_cols as f64;
        let n_rows = (width / spacing).round().max(1.0) as usize + 1;

        let mut grid = Vec::with_capacity(n_rows * n_cols);
        for row in 0..n_rows {
            let f = row as f64 / (n_rows - 1).max(1) as f64;
            for (t, b) in top.iter().zip(bottom.iter()) {
                grid.push(Location::new(
                    t.lat + f * (b.lat - t.lat),
                    t.lon + f * (b.lon - t.lon),
                    t.depth + f * (b.depth - t.depth),
                ));
            }
        }

        // average dip from the mean vertical and horizontal separation
        let dz: f64 = top
            .iter()
            .zip(bottom.iter())
            .map(|(t, b)| b.depth - t.depth)
            .sum::<f64>()
            / n_cols as f64;
        let dh: f64 = top
            .iter()
            .zip(bottom.iter())
            .map(|(t, b)| t.horz_distance(b))
            .sum::<f64>()
            / n_cols as f64;
        let dip = dz.atan2(dh).to_degrees().clamp(0.0, 90.0);

        Ok(Self {
            grid,
            n_rows,
            n_cols,
            spacing,
            strike: upper.strike(),
            dip,
        })
    }

    /// Number of rows (down dip).
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns (along strike).
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Grid node at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> &Location {
        &self.grid[row * self.n_cols + col]
    }

    /// Grid spacing in kilometers.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Strike of the top edge in degrees.
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Dip in degrees.
    pub fn dip(&self) -> f64 {
        self.dip
    }

    /// Depth to the top of the surface in kilometers.
    pub fn z_top(&self) -> f64 {
        self.grid[0].depth
    }

    /// Depth to the bottom of the surface in kilometers.
    pub fn z_bot(&self) -> f64 {
        self.grid[(self.n_rows - 1) * self.n_cols].depth
    }

    /// Along-strike length of the discretized surface in kilometers.
    pub fn length(&self) -> f64 {
        (self.n_cols - 1) as f64 * self.spacing
    }

    /// Down-dip width of the discretized surface in kilometers.
    pub fn width(&self) -> f64 {
        (self.n_rows - 1) as f64 * self.spacing
    }

    /// Mean of all grid node coordinates.
    pub fn centroid(&self) -> Location {
        let n = self.grid.len() as f64;
        let (lat, lon, depth) = self.grid.iter().fold((0.0, 0.0, 0.0), |acc, l| {
            (acc.0 + l.lat, acc.1 + l.lon, acc.2 + l.depth)
        });
        Location::new(lat / n, lon / n, depth / n)
    }

    /// Iterator over all grid nodes.
    pub fn locations(&self) -> std::slice::Iter<'_, Location> {
        self.grid.iter()
    }

    /// Top edge of the surface as a location list.
    pub fn upper_edge(&self) -> LocationList {
        LocationList::from(self.grid[..self.n_cols].to_vec())
    }

    // ---- floating subset windows -------------------------------------

    /// Number of columns a rupture of length `len` spans, capped at the
    /// surface extent.
    fn cols_spanning(&self, len: f64) -> usize {
        (((len / self.spacing).floor() as usize) + 1).min(self.n_cols)
    }

    /// Number of rows a rupture of down-dip width `width` spans, capped
    /// at the surface extent.
    fn rows_spanning(&self, width: f64) -> usize {
        (((width / self.spacing).floor() as usize) + 1).min(self.n_rows)
    }

    /// Window step in columns for a floating offset in kilometers.
    fn col_step(&self, offset: f64) -> usize {
        ((offset / self.spacing).round() as usize).max(1)
    }

    /// Number of floating positions along strike for a rupture of length
    /// `len` floated at `offset` kilometers.
    pub fn num_subset_surfaces_along_length(&self, len: f64, offset: f64) -> usize {
        let span = self.cols_spanning(len);
        (self.n_cols - span) / self.col_step(offset) + 1
    }

    /// Number of floating positions down dip for a rupture of width
    /// `width` floated at `offset` kilometers.
    pub fn num_subset_surfaces_down_dip(&self, width: f64, offset: f64) -> usize {
        let span = self.rows_spanning(width);
        (self.n_rows - span) / self.col_step(offset) + 1
    }

    /// Total number of floating positions for a `len × width` rupture.
    pub fn num_subset_surfaces(&self, len: f64, width: f64, offset: f64) -> usize {
        self.num_subset_surfaces_along_length(len, offset)
            * self.num_subset_surfaces_down_dip(width, offset)
    }

    /// The `index`-th floating subset surface of a `len × width`
    /// rupture. Positions advance along strike first, then down dip.
    pub fn subset_surface(
        &self,
        len: f64,
        width: f64,
        offset: f64,
        index: usize,
    ) -> GriddedSurface {
        let n_along = self.num_subset_surfaces_along_length(len, offset);
        let step = self.col_step(offset);
        let col0 = (index % n_along) * step;
        let row0 = (index / n_along) * step;
        self.window(row0, col0, self.rows_spanning(width), self.cols_spanning(len))
    }

    /// The `index`-th floating subset surface along strike, centered
    /// down dip.
    pub fn centered_subset_surface(
        &self,
        len: f64,
        width: f64,
        offset: f64,
        index: usize,
    ) -> GriddedSurface {
        let step = self.col_step(offset);
        let rows = self.rows_spanning(width);
        let row0 = (self.n_rows - rows) / 2;
        self.window(row0, index * step, rows, self.cols_spanning(len))
    }

    fn window(&self, row0: usize, col0: usize, n_rows: usize, n_cols: usize) -> GriddedSurface {
        let mut grid = Vec::with_capacity(n_rows * n_cols);
        for r in row0..row0 + n_rows {
            for c in col0..col0 + n_cols {
                grid.push(*self.get(r, c));
            }
        }
        GriddedSurface {
            grid,
            n_rows,
            n_cols,
            spacing: self.spacing,
            strike: self.strike,
            dip: self.dip,
        }
    }

    // ---- distances ----------------------------------------------------

    /// Site-to-surface distance triple `(rJB, rRup, rX)` in kilometers.
    pub fn distances(&self, site: &Location) -> Distances {
        let mut r_jb = f64::INFINITY;
        let mut r_rup = f64::INFINITY;
        for node in &self.grid {
            let h = site.horz_distance(node);
            let d = (h * h + node.depth * node.depth).sqrt();
            if h < r_jb {
                r_jb = h;
            }
            if d < r_rup {
                r_rup = d;
            }
        }

        // distance to the top edge, signed by side of strike
        let mut r_edge = f64::INFINITY;
        for node in &self.grid[..self.n_cols] {
            let h = site.horz_distance(node);
            if h < r_edge {
                r_edge = h;
            }
        }
        let first = &self.grid[0];
        let angle = (first.azimuth(site) - self.strike).to_radians();
        let r_x = if angle.sin() >= 0.0 { r_edge } else { -r_edge };

        Distances::new(r_jb, r_rup, r_x)
    }

    /// Minimum fast horizontal distance from `site` to any node.
    pub fn min_distance_fast(&self, site: &Location) -> f64 {
        self.grid
            .iter()
            .map(|l| site.horz_distance_fast(l))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Resample `trace` to exactly `n` points.
fn resample_to(trace: &LocationList, n: usize) -> LocationList {
    if n < 2 {
        return trace.clone();
    }
    let spacing = trace.length() / (n - 1) as f64;
    trace.resample(spacing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxilary::approx_equal;

    fn test_trace() -> LocationList {
        let a = Location::surface(34.0, -118.0);
        let b = a.move_along(0.0, 20.0, 0.0);
        LocationList::from(vec![a, b])
    }

    #[test]
    fn test_vertical_surface_dimensions() {
        let surf = GriddedSurface::from_trace(&test_trace(), 90.0, 15.0, 1.0).unwrap();
        assert_eq!(surf.n_cols(), 21);
        assert_eq!(surf.n_rows(), 16);
        assert!(approx_equal(surf.length(), 20.0, 1e-9));
        assert!(approx_equal(surf.width(), 15.0, 1e-9));
        assert!(approx_equal(surf.z_top(), 0.0, 1e-12));
        assert!(approx_equal(surf.z_bot(), 15.0, 1e-9));
    }

    #[test]
    fn test_dipping_surface_depth() {
        let surf = GriddedSurface::from_trace(&test_trace(), 30.0, 10.0, 1.0).unwrap();
        // bottom depth = width * sin(dip)
        assert!(approx_equal(surf.z_bot(), 10.0 * 30_f64.to_radians().sin(), 0.01));
    }

    #[test]
    fn test_subset_counts() {
        let surf = GriddedSurface::from_trace(&test_trace(), 90.0, 15.0, 1.0).unwrap();
        // L = 8.318 km spans floor(8.318) + 1 = 9 columns of 21
        assert_eq!(surf.num_subset_surfaces_along_length(8.318, 1.0), 13);
        // full-width window floats only along strike
        assert_eq!(surf.num_subset_surfaces(8.318, 30.0, 1.0), 13);
        // oversize length clamps to a single position
        assert_eq!(surf.num_subset_surfaces_along_length(25.0, 1.0), 1);
    }

    #[test]
    fn test_subset_surface_window() {
        let surf = GriddedSurface::from_trace(&test_trace(), 90.0, 15.0, 1.0).unwrap();
        let sub = surf.subset_surface(5.0, 7.0, 1.0, 0);
        assert_eq!(sub.n_cols(), 6);
        assert_eq!(sub.n_rows(), 8);
        assert_eq!(sub.get(0, 0), surf.get(0, 0));

        let last = surf.num_subset_surfaces_along_length(5.0, 1.0) - 1;
        let sub = surf.subset_surface(5.0, 7.0, 1.0, last);
        assert_eq!(sub.get(0, sub.n_cols() - 1), surf.get(0, surf.n_cols() - 1));
    }

    #[test]
    fn test_centered_subset_rows() {
        let surf = GriddedSurface::from_trace(&test_trace(), 90.0, 15.0, 1.0).unwrap();
        let sub = surf.centered_subset_surface(5.0, 7.0, 1.0, 0);
        assert_eq!(sub.n_rows(), 8);
        // 16 rows, 8-row window centers at row 4
        assert!(approx_equal(sub.z_top(), 4.0, 1e-9));
    }

    #[test]
    fn test_distances_off_end() {
        let surf = GriddedSurface::from_trace(&test_trace(), 90.0, 15.0, 1.0).unwrap();
        // site 10 km north of the far (north) end of a south-north trace
        let site = surf.get(0, 20).move_along(0.0, 10.0, 0.0);
        let d = surf.distances(&site);
        assert!(approx_equal(d.r_jb, 10.0, 0.05));
        assert!(approx_equal(d.r_rup, 10.0, 0.05));
    }

    #[test]
    fn test_rx_sign() {
        let surf = GriddedSurface::from_trace(&test_trace(), 50.0, 10.0, 1.0).unwrap();
        // trace strikes north; hanging wall is east (strike + 90)
        let mid = *surf.get(0, 10);
        let east = mid.move_along(90.0, 15.0, 0.0);
        let west = mid.move_along(270.0, 15.0, 0.0);
        assert!(surf.distances(&east).r_x > 0.0);
        assert!(surf.distances(&west).r_x < 0.0);
    }

    #[test]
    fn test_approx_surface_from_traces() {
        let ua = Location::new(50.0, 155.0, 10.0);
        let ub = ua.move_along(0.0, 60.0, 0.0);
        let la = Location::new(50.0, 155.4, 40.0);
        let lb = la.move_along(0.0, 60.0, 0.0);
        let surf = GriddedSurface::approx_from_traces(
            &LocationList::from(vec![ua, ub]),
            &LocationList::from(vec![la, lb]),
            5.0,
        )
        .unwrap();
        assert!(approx_equal(surf.z_top(), 10.0, 1e-9));
        assert!(approx_equal(surf.z_bot(), 40.0, 1e-9));
        assert!(surf.dip() > 20.0 && surf.dip() < 60.0);
    }
}
