//! # Magnitude Uncertainty
//!
//! Configuration describing how a nominal magnitude is expanded into
//! epistemic branches (discrete magnitude shifts with weights) and
//! aleatory variability (a Gaussian spread about each branch magnitude),
//! plus the expansion operations the XML parsers invoke.
//!
//! ## Cutoff semantics
//!
//! Both components carry a cutoff magnitude below which branching is
//! suppressed: a nominal distribution whose (shifted) magnitude falls
//! below the cutoff yields a single, unbranched MFD carrying the full
//! weight.

use crate::error::ValidationError;
use crate::magnitudes::{check_weight_sum, moment};
use crate::mfd::{mag_count, IncrementalMfd};

/// Epistemic magnitude uncertainty: signed magnitude shifts and their
/// branch weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Epistemic {
    /// Signed magnitude shifts, one per branch.
    pub deltas: Vec<f64>,
    /// Branch weights, summing to 1.
    pub weights: Vec<f64>,
    /// Magnitude below which epistemic branching is suppressed.
    pub cutoff: f64,
}

impl Epistemic {
    /// Create and validate an epistemic description.
    pub fn new(deltas: Vec<f64>, weights: Vec<f64>, cutoff: f64) -> Result<Self, ValidationError> {
        if deltas.len() != weights.len() {
            return Err(ValidationError::LengthMismatch(deltas.len(), weights.len()));
        }
        check_weight_sum(&weights)?;
        Ok(Self { deltas, weights, cutoff })
    }

    /// `true` if branching applies at magnitude `m`: the lowest branch
    /// magnitude `m + deltas[0]` must not fall below the cutoff.
    pub fn applies(&self, m: f64) -> bool {
        !self.deltas.is_empty() && m + self.deltas[0] >= self.cutoff
    }
}

/// Aleatory magnitude variability: a Gaussian spread about the nominal
/// magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Aleatory {
    /// Standard deviation of the Gaussian, in magnitude units.
    pub sigma: f64,
    /// Number of discretization bins; odd, so the Gaussian centers on
    /// the nominal magnitude.
    pub count: usize,
    /// `true` preserves total moment across the spread; `false`
    /// preserves total event rate.
    pub mo_balance: bool,
    /// Magnitude below which the spread is suppressed.
    pub cutoff: f64,
}

impl Aleatory {
    /// Create and validate an aleatory description.
    pub fn new(
        sigma: f64,
        count: usize,
        mo_balance: bool,
        cutoff: f64,
    ) -> Result<Self, ValidationError> {
        if count % 2 == 0 {
            return Err(ValidationError::AleatoryCount(count));
        }
        Ok(Self { sigma, count, mo_balance, cutoff })
    }

    /// `true` if the spread applies at magnitude `m`.
    pub fn applies(&self, m: f64) -> bool {
        m >= self.cutoff
    }
}

/// Combined magnitude-uncertainty configuration attached to a source set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagUncertainty {
    /// Epistemic branching, if enabled.
    pub epistemic: Option<Epistemic>,
    /// Aleatory variability, if enabled.
    pub aleatory: Option<Aleatory>,
}

impl MagUncertainty {
    /// Configuration with no uncertainty: expansions pass nominal MFDs
    /// through unchanged.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Expand a nominal SINGLE distribution into its branch MFDs.
///
/// With epistemic branching, each branch magnitude is `m + deltaᵢ` and
/// branch rates are `weightᵢ · R` where the common rate `R` is chosen so
/// that the summed scalar moment of all branches equals the nominal
/// moment `rate · Mo(m)`. With aleatory variability, each branch
/// magnitude is further replaced by a Gaussian spread, moment- or
/// rate-balanced per the `mo_balance` flag.
pub fn expand_single(
    m: f64,
    rate: f64,
    floats: bool,
    unc: &MagUncertainty,
) -> Result<Vec<IncrementalMfd>, ValidationError> {
    let branches: Vec<(f64, f64)> = match &unc.epistemic {
        Some(epi) if epi.applies(m) => {
            let weighted_moment: f64 = epi
                .deltas
                .iter()
                .zip(&epi.weights)
                .map(|(&d, &w)| w * moment(m + d))
                .sum();
            let common_rate = rate * moment(m) / weighted_moment;
            epi.deltas
                .iter()
                .zip(&epi.weights)
                .map(|(&d, &w)| (m + d, w * common_rate))
                .collect()
        }
        _ => vec![(m, rate)],
    };

    branches
        .into_iter()
        .map(|(mb, rb)| match &unc.aleatory {
            Some(al) if al.applies(mb) => {
                if al.mo_balance {
                    IncrementalMfd::gaussian_mo_balanced(
                        mb,
                        al.sigma,
                        al.count,
                        rb * moment(mb),
                        floats,
                    )
                } else {
                    IncrementalMfd::gaussian(mb, al.sigma, al.count, rb, floats)
                }
            }
            _ => IncrementalMfd::single(mb, rb, floats),
        })
        .collect()
}

/// Expand a nominal Gutenberg–Richter distribution into its branch MFDs.
///
/// Epistemic branches shift `m_max` by each delta; every branch is
/// rebuilt moment-balanced to `weightᵢ` times the nominal total moment
/// rate, so the summed moment across branches equals the nominal moment.
/// Branches whose shifted `m_max` leaves no bins above `m_min` are
/// dropped; if every branch drops, the expansion fails with `EmptyMfd`.
/// Aleatory variability does not apply to Gutenberg–Richter
/// distributions.
#[allow(clippy::too_many_arguments)]
pub fn expand_gutenberg_richter(
    a: f64,
    b: f64,
    m_min: f64,
    m_max: f64,
    d_mag: f64,
    weight: f64,
    floats: bool,
    unc: &MagUncertainty,
) -> Result<Vec<IncrementalMfd>, ValidationError> {
    let mut nominal = IncrementalMfd::gutenberg_richter(a, b, m_min, m_max, d_mag, floats)?;
    nominal.scale(weight);

    let epi = match &unc.epistemic {
        Some(epi) if epi.applies(m_max) => epi,
        _ => return Ok(vec![nominal]),
    };

    let total_mo = nominal.total_moment_rate();
    let mut out = Vec::with_capacity(epi.deltas.len());
    for (&d, &w) in epi.deltas.iter().zip(&epi.weights) {
        let n = mag_count(m_min, m_max + d, d_mag);
        if n == 0 {
            continue;
        }
        out.push(IncrementalMfd::gutenberg_richter_mo_balanced(
            m_min + d_mag / 2.0,
            d_mag,
            n,
            b,
            w * total_mo,
            floats,
        )?);
    }
    if out.is_empty() {
        return Err(ValidationError::EmptyMfd);
    }
    Ok(out)
}
