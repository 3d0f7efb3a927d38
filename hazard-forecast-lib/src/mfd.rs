//! # Magnitude–Frequency Distributions
//!
//! Discrete tables of `(magnitude, annual rate)` pairs and the factory
//! operations that build them: Gutenberg–Richter (plain and
//! moment-balanced), single-magnitude, Gaussian, and caller-supplied
//! incremental distributions.
//!
//! ## Conventions
//!
//! - Magnitudes are moment magnitudes at **bin centers**, strictly
//!   increasing. Uniform spacing is assumed by the factories; only
//!   caller-supplied incremental distributions may be non-uniform.
//! - Rates are annual occurrence rates, never negative.
//! - The `floats` flag marks distributions whose bins produce floating
//!   subset-surface ruptures rather than full-surface ruptures.
//!
//! ## Moment balancing
//!
//! The moment-balanced factories guarantee that the summed scalar moment
//! of the distribution, `Σ rate(mᵢ)·10^(1.5·mᵢ + 9.05)`, equals the
//! target moment rate up to rounding.

use crate::error::ValidationError;
use crate::magnitudes::{check_magnitude, moment};

/// Number of magnitude bins between `m_min` and `m_max` at spacing
/// `d_mag`. Bins are centered, so `mag_count(5.0, 7.0, 0.1) == 20`.
pub fn mag_count(m_min: f64, m_max: f64, d_mag: f64) -> usize {
    if m_max <= m_min || d_mag <= 0.0 {
        return 0;
    }
    ((m_max - m_min) / d_mag).round() as usize
}

/// A finite ordered magnitude–rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalMfd {
    mags: Vec<f64>,
    rates: Vec<f64>,
    floats: bool,
}

impl IncrementalMfd {
    /// Create a distribution from caller-supplied magnitude and rate
    /// arrays. This is the only factory that admits non-uniform spacing.
    pub fn incremental(
        mags: Vec<f64>,
        rates: Vec<f64>,
        floats: bool,
    ) -> Result<Self, ValidationError> {
        if mags.is_empty() {
            return Err(ValidationError::EmptyMfd);
        }
        if mags.len() != rates.len() {
            return Err(ValidationError::LengthMismatch(mags.len(), rates.len()));
        }
        if mags.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ValidationError::MagnitudeOrder);
        }
        for &m in &mags {
            check_magnitude(m)?;
        }
        if let Some(&bad) = rates.iter().find(|&&r| r < 0.0) {
            return Err(ValidationError::NegativeRate(bad));
        }
        Ok(Self { mags, rates, floats })
    }

    /// Create a single `(magnitude, rate)` pair.
    pub fn single(m: f64, rate: f64, floats: bool) -> Result<Self, ValidationError> {
        Self::incremental(vec![m], vec![rate], floats)
    }

    /// Create a Gutenberg–Richter distribution from `a` and `b` values.
    ///
    /// Bins are centered: the first magnitude is `m_min + d_mag / 2` and
    /// there are [`mag_count`]`(m_min, m_max, d_mag)` bins. The
    /// incremental rate of bin `mᵢ` is `10^(a − b·mᵢ)`.
    pub fn gutenberg_richter(
        a: f64,
        b: f64,
        m_min: f64,
        m_max: f64,
        d_mag: f64,
        floats: bool,
    ) -> Result<Self, ValidationError> {
        let n = mag_count(m_min, m_max, d_mag);
        if n == 0 {
            return Err(ValidationError::EmptyMfd);
        }
        let mut mags = Vec::with_capacity(n);
        let mut rates = Vec::with_capacity(n);
        for i in 0..n {
            let m = m_min + d_mag / 2.0 + i as f64 * d_mag;
            mags.push(m);
            rates.push(10_f64.powf(a - b * m));
        }
        Self::incremental(mags, rates, floats)
    }

    /// Create a moment-balanced Gutenberg–Richter distribution.
    ///
    /// `m_min` is the first bin center; `n_mag` bins follow at spacing
    /// `d_mag`. Relative rates follow the G-R shape `10^(−b·m)` and are
    /// scaled so that the summed scalar moment equals `total_mo_rate`
    /// (N·m per year).
    pub fn gutenberg_richter_mo_balanced(
        m_min: f64,
        d_mag: f64,
        n_mag: usize,
        b: f64,
        total_mo_rate: f64,
        floats: bool,
    ) -> Result<Self, ValidationError> {
        if n_mag == 0 {
            return Err(ValidationError::EmptyMfd);
        }
        let mut mags = Vec::with_capacity(n_mag);
        let mut shape = Vec::with_capacity(n_mag);
        for i in 0..n_mag {
            let m = m_min + i as f64 * d_mag;
            mags.push(m);
            shape.push(10_f64.powf(-b * m));
        }
        let shape_moment: f64 = mags
            .iter()
            .zip(&shape)
            .map(|(&m, &s)| s * moment(m))
            .sum();
        let factor = total_mo_rate / shape_moment;
        let rates = shape.iter().map(|s| s * factor).collect();
        Self::incremental(mags, rates, floats)
    }

    /// Create a Gaussian distribution preserving total event rate.
    ///
    /// `count` (odd) equally spaced bins span `[m − 3σ, m + 3σ]` so the
    /// distribution centers on `m`. Bin rates follow the Gaussian density
    /// at bin centers, normalized to sum to `total_rate`.
    pub fn gaussian(
        m: f64,
        sigma: f64,
        count: usize,
        total_rate: f64,
        floats: bool,
    ) -> Result<Self, ValidationError> {
        let (mags, weights) = gaussian_bins(m, sigma, count)?;
        let rates = weights.iter().map(|w| w * total_rate).collect();
        Self::incremental(mags, rates, floats)
    }

    /// Create a Gaussian distribution preserving total moment rate.
    ///
    /// As [`IncrementalMfd::gaussian`], but rates are scaled so the
    /// summed scalar moment equals `total_mo_rate`.
    pub fn gaussian_mo_balanced(
        m: f64,
        sigma: f64,
        count: usize,
        total_mo_rate: f64,
        floats: bool,
    ) -> Result<Self, ValidationError> {
        let (mags, weights) = gaussian_bins(m, sigma, count)?;
        let weight_moment: f64 = mags
            .iter()
            .zip(&weights)
            .map(|(&mi, &w)| w * moment(mi))
            .sum();
        let factor = total_mo_rate / weight_moment;
        let rates = weights.iter().map(|w| w * factor).collect();
        Self::incremental(mags, rates, floats)
    }

    /// Number of magnitude bins.
    pub fn len(&self) -> usize {
        self.mags.len()
    }

    /// `true` if the distribution has no bins. Factories reject this
    /// state, so a built distribution always returns `false`.
    pub fn is_empty(&self) -> bool {
        self.mags.is_empty()
    }

    /// Magnitude of bin `index`.
    pub fn mag(&self, index: usize) -> f64 {
        self.mags[index]
    }

    /// Annual rate of bin `index`.
    pub fn rate(&self, index: usize) -> f64 {
        self.rates[index]
    }

    /// Magnitude array.
    pub fn mags(&self) -> &[f64] {
        &self.mags
    }

    /// Rate array.
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// `true` if each bin produces floating subset-surface ruptures.
    pub fn floats(&self) -> bool {
        self.floats
    }

    /// Largest magnitude of the distribution.
    pub fn max_mag(&self) -> f64 {
        self.mags[self.mags.len() - 1]
    }

    /// Iterator over `(magnitude, rate)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mags.iter().copied().zip(self.rates.iter().copied())
    }

    /// Sum of all bin rates.
    pub fn total_rate(&self) -> f64 {
        self.rates.iter().sum()
    }

    /// Summed scalar moment rate, `Σ rate(mᵢ)·Mo(mᵢ)`, in N·m per year.
    pub fn total_moment_rate(&self) -> f64 {
        self.iter().map(|(m, r)| r * moment(m)).sum()
    }

    /// Multiply all rates by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for r in &mut self.rates {
            *r *= factor;
        }
    }

    /// Rescale all rates so the bin nearest magnitude `m` has rate
    /// `rate`.
    pub fn scale_to_incr_rate(&mut self, m: f64, rate: f64) {
        let idx = self.nearest_bin(m);
        let current = self.rates[idx];
        if current > 0.0 {
            self.scale(rate / current);
        }
    }

    /// Rescale all rates so the cumulative rate at and above the bin
    /// nearest magnitude `m` equals `rate`.
    pub fn scale_to_cumulative_rate(&mut self, m: f64, rate: f64) {
        let idx = self.nearest_bin(m);
        let current: f64 = self.rates[idx..].iter().sum();
        if current > 0.0 {
            self.scale(rate / current);
        }
    }

    /// Cumulative-rate view: for each bin, the summed rate of that bin
    /// and all larger-magnitude bins.
    pub fn cumulative(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(self.mags.len());
        let mut sum = 0.0;
        for i in (0..self.mags.len()).rev() {
            sum += self.rates[i];
            out.push((self.mags[i], sum));
        }
        out.reverse();
        out
    }

    fn nearest_bin(&self, m: f64) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, &mi) in self.mags.iter().enumerate() {
            let d = (mi - m).abs();
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best
    }
}

/// Centered Gaussian bin layout shared by the two Gaussian factories:
/// bin magnitudes on `[m − 3σ, m + 3σ]` and normalized density weights.
fn gaussian_bins(
    m: f64,
    sigma: f64,
    count: usize,
) -> Result<(Vec<f64>, Vec<f64>), ValidationError> {
    if count == 0 {
        return Err(ValidationError::EmptyMfd);
    }
    if count % 2 == 0 {
        return Err(ValidationError::AleatoryCount(count));
    }
    if count == 1 {
        return Ok((vec![m], vec![1.0]));
    }
    let spacing = 6.0 * sigma / (count - 1) as f64;
    let m0 = m - 3.0 * sigma;
    let mut mags = Vec::with_capacity(count);
    let mut weights = Vec::with_capacity(count);
    for i in 0..count {
        let mi = m0 + i as f64 * spacing;
        let x = (mi - m) / sigma;
        mags.push(mi);
        weights.push((-0.5 * x * x).exp());
    }
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    Ok((mags, weights))
}
