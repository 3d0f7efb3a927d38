//! # Ground Motion Model Assignment
//!
//! The forecast core does not implement ground-motion models; it carries
//! their identifiers and the weight maps that assign them to source
//! sets. A [`GmmSet`] maps GMM identifiers to logic-tree weights,
//! optionally split into a primary (shorter-distance) and a secondary
//! (longer-distance) map sharing the same key domain, and may carry an
//! additional epistemic uncertainty on ground motion: either a single
//! scalar or a 3 × 3 grid indexed by magnitude and distance band.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::magnitudes::{check_weight, check_weight_sum};

/// Identifiers of the ground-motion models a forecast may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gmm {
    // active crust
    Ask14,
    Bssa14,
    Cb14,
    Cy14,
    Idriss14,
    // stable crust
    Ab06,
    Campbell03,
    Frankel96,
    Toro97,
    // subduction
    Ab03Global,
    Zhao06Interface,
    Youngs97Slab,
}

impl Gmm {
    /// The identifier string used in `gmm.xml` files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask14 => "ASK_14",
            Self::Bssa14 => "BSSA_14",
            Self::Cb14 => "CB_14",
            Self::Cy14 => "CY_14",
            Self::Idriss14 => "IDRISS_14",
            Self::Ab06 => "AB_06",
            Self::Campbell03 => "CAMPBELL_03",
            Self::Frankel96 => "FRANKEL_96",
            Self::Toro97 => "TORO_97",
            Self::Ab03Global => "AB_03_GLOBAL",
            Self::Zhao06Interface => "ZHAO_06_INTERFACE",
            Self::Youngs97Slab => "YOUNGS_97_SLAB",
        }
    }
}

impl FromStr for Gmm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASK_14" => Ok(Self::Ask14),
            "BSSA_14" => Ok(Self::Bssa14),
            "CB_14" => Ok(Self::Cb14),
            "CY_14" => Ok(Self::Cy14),
            "IDRISS_14" => Ok(Self::Idriss14),
            "AB_06" => Ok(Self::Ab06),
            "CAMPBELL_03" => Ok(Self::Campbell03),
            "FRANKEL_96" => Ok(Self::Frankel96),
            "TORO_97" => Ok(Self::Toro97),
            "AB_03_GLOBAL" => Ok(Self::Ab03Global),
            "ZHAO_06_INTERFACE" => Ok(Self::Zhao06Interface),
            "YOUNGS_97_SLAB" => Ok(Self::Youngs97Slab),
            other => Err(format!("unknown ground motion model: {other}")),
        }
    }
}

/// Epistemic uncertainty on ground motion attached to a [`GmmSet`]:
/// either a single scalar or a 3 × 3 grid over magnitude bands
/// `{M<6, 6≤M<7, 7≤M}` and distance bands `{D<10, 10≤D<30, 30≤D}` km,
/// plus a 3-element branch weight array.
#[derive(Debug, Clone, PartialEq)]
pub struct GmmUncertainty {
    values: Vec<f64>,
    weights: [f64; 3],
}

impl GmmUncertainty {
    /// Create and validate: `values` has 1 or 9 entries, `weights` has
    /// 3 entries summing to 1.
    pub fn new(values: Vec<f64>, weights: Vec<f64>) -> Result<Self, ValidationError> {
        if values.len() != 1 && values.len() != 9 {
            return Err(ValidationError::GmmUncertaintySize(values.len()));
        }
        if weights.len() != 3 {
            return Err(ValidationError::LengthMismatch(weights.len(), 3));
        }
        check_weight_sum(&weights)?;
        Ok(Self {
            values,
            weights: [weights[0], weights[1], weights[2]],
        })
    }

    /// Uncertainty value for magnitude `m` and distance `d` (km).
    pub fn value(&self, m: f64, d: f64) -> f64 {
        if self.values.len() == 1 {
            return self.values[0];
        }
        let mi = if m < 6.0 {
            0
        } else if m < 7.0 {
            1
        } else {
            2
        };
        let di = if d < 10.0 {
            0
        } else if d < 30.0 {
            1
        } else {
            2
        };
        self.values[mi * 3 + di]
    }

    /// Branch weights.
    pub fn weights(&self) -> &[f64; 3] {
        &self.weights
    }
}

/// A distance-banded GMM weight assignment shared by the source sets it
/// configures.
#[derive(Debug, Clone, PartialEq)]
pub struct GmmSet {
    primary: BTreeMap<Gmm, f64>,
    max_dist_primary: f64,
    secondary: Option<(BTreeMap<Gmm, f64>, f64)>,
    uncertainty: Option<GmmUncertainty>,
}

impl GmmSet {
    /// Start building a GMM set from the primary (shorter-distance)
    /// weight map and its maximum applicable distance in kilometers.
    pub fn builder(primary: BTreeMap<Gmm, f64>, max_distance: f64) -> GmmSetBuilder {
        GmmSetBuilder {
            primary,
            max_dist_primary: max_distance,
            secondary: None,
            uncertainty: None,
        }
    }

    /// GMM weight map applicable at distance `d` km.
    pub fn gmms(&self, d: f64) -> &BTreeMap<Gmm, f64> {
        match &self.secondary {
            Some((map, _)) if d > self.max_dist_primary => map,
            _ => &self.primary,
        }
    }

    /// Primary weight map.
    pub fn primary(&self) -> &BTreeMap<Gmm, f64> {
        &self.primary
    }

    /// Maximum applicable distance of the primary map, km.
    pub fn max_dist_lo(&self) -> f64 {
        self.max_dist_primary
    }

    /// Overall maximum applicable distance, km. This is the cutoff the
    /// source-set location filters use.
    pub fn max_dist_hi(&self) -> f64 {
        match &self.secondary {
            Some((_, d)) => *d,
            None => self.max_dist_primary,
        }
    }

    /// Epistemic ground-motion uncertainty, if configured.
    pub fn uncertainty(&self) -> Option<&GmmUncertainty> {
        self.uncertainty.as_ref()
    }
}

/// Single-use builder for [`GmmSet`].
pub struct GmmSetBuilder {
    primary: BTreeMap<Gmm, f64>,
    max_dist_primary: f64,
    secondary: Option<(BTreeMap<Gmm, f64>, f64)>,
    uncertainty: Option<GmmUncertainty>,
}

impl GmmSetBuilder {
    /// Attach the secondary (longer-distance) weight map and its
    /// maximum applicable distance in kilometers.
    pub fn secondary(mut self, map: BTreeMap<Gmm, f64>, max_distance: f64) -> Self {
        self.secondary = Some((map, max_distance));
        self
    }

    /// Attach epistemic ground-motion uncertainty.
    pub fn uncertainty(mut self, unc: GmmUncertainty) -> Self {
        self.uncertainty = Some(unc);
        self
    }

    /// Validate and build. Weights of each map must lie in `[0, 1]` and
    /// sum to 1; secondary keys must be a subset of primary keys.
    pub fn build(self) -> Result<GmmSet, ValidationError> {
        validate_weight_map(&self.primary)?;
        if let Some((map, _)) = &self.secondary {
            validate_weight_map(map)?;
            if !map.keys().all(|k| self.primary.contains_key(k)) {
                return Err(ValidationError::GmmSubset);
            }
        }
        Ok(GmmSet {
            primary: self.primary,
            max_dist_primary: self.max_dist_primary,
            secondary: self.secondary,
            uncertainty: self.uncertainty,
        })
    }
}

fn validate_weight_map(map: &BTreeMap<Gmm, f64>) -> Result<(), ValidationError> {
    for &w in map.values() {
        check_weight(w)?;
    }
    let weights: Vec<f64> = map.values().copied().collect();
    check_weight_sum(&weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(Gmm, f64)]) -> BTreeMap<Gmm, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_distance_banded_selection() {
        let set = GmmSet::builder(map(&[(Gmm::Ask14, 0.5), (Gmm::Cb14, 0.5)]), 200.0)
            .secondary(map(&[(Gmm::Ask14, 1.0)]), 500.0)
            .build()
            .unwrap();
        assert_eq!(set.gmms(100.0).len(), 2);
        assert_eq!(set.gmms(300.0).len(), 1);
        assert_eq!(set.max_dist_hi(), 500.0);
        assert_eq!(set.max_dist_lo(), 200.0);
    }

    #[test]
    fn test_secondary_subset_enforced() {
        let res = GmmSet::builder(map(&[(Gmm::Ask14, 1.0)]), 200.0)
            .secondary(map(&[(Gmm::Cb14, 1.0)]), 500.0)
            .build();
        assert!(matches!(res, Err(ValidationError::GmmSubset)));
    }

    #[test]
    fn test_weight_sum_enforced() {
        let res = GmmSet::builder(map(&[(Gmm::Ask14, 0.5), (Gmm::Cb14, 0.4)]), 200.0).build();
        assert!(matches!(res, Err(ValidationError::WeightSum(_))));
    }

    #[test]
    fn test_uncertainty_grid() {
        let unc = GmmUncertainty::new(
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9],
            vec![0.185, 0.63, 0.185],
        )
        .unwrap();
        assert_eq!(unc.value(5.5, 5.0), 0.1);
        assert_eq!(unc.value(6.5, 20.0), 0.5);
        assert_eq!(unc.value(7.5, 50.0), 0.9);

        let scalar = GmmUncertainty::new(vec![0.4], vec![0.2, 0.6, 0.2]).unwrap();
        assert_eq!(scalar.value(7.5, 50.0), 0.4);
    }

    #[test]
    fn test_uncertainty_size_enforced() {
        assert!(matches!(
            GmmUncertainty::new(vec![0.1, 0.2], vec![0.2, 0.6, 0.2]),
            Err(ValidationError::GmmUncertaintySize(2))
        ));
    }
}
