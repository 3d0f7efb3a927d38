//! # Cluster Sources
//!
//! A cluster source groups faults that may each rupture with independent
//! events but share a single cluster rate, the annual rate of the whole
//! cluster sequence. Cluster hazard is computed with a joint-probability
//! formula by a separate module, so per-rupture iteration over a cluster
//! is intentionally unsupported; the wrapped fault set and the cluster
//! rate are exposed instead.
//!
//! Every wrapped fault carries exactly one SINGLE-magnitude MFD; cluster
//! sources support neither uncertainty branching nor Gutenberg–Richter
//! distributions.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::fault::FaultSourceSet;
use crate::geodesy::Location;
use crate::gmm::GmmSet;
use crate::magnitudes::check_weight;
use crate::rupture::Rupture;
use crate::sourceset::SourceType;

/// A cluster source: a named fault group with a shared cluster rate.
#[derive(Debug)]
pub struct ClusterSource {
    name: String,
    rate: f64,
    faults: FaultSourceSet,
}

impl ClusterSource {
    /// Create a cluster source. Every fault in `faults` must hold
    /// ruptures of a single magnitude (the SINGLE-MFD restriction).
    pub fn new(name: &str, rate: f64, faults: FaultSourceSet) -> Result<Self, ValidationError> {
        if rate < 0.0 {
            return Err(ValidationError::NegativeRate(rate));
        }
        for fault in faults.iter() {
            let mut mags = fault.iter().map(|r| r.mag);
            let first = mags.next();
            if first.is_none() || mags.any(|m| m != first.unwrap_or(f64::NAN)) {
                return Err(ValidationError::ClusterMfd);
            }
        }
        Ok(Self {
            name: name.to_string(),
            rate,
            faults,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Annual rate of the whole cluster sequence.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The wrapped fault group.
    pub fn faults(&self) -> &FaultSourceSet {
        &self.faults
    }

    /// Number of faults in the cluster.
    pub fn size(&self) -> usize {
        self.faults.size()
    }

    /// Unsupported. Cluster hazard is computed with a joint-probability
    /// formula over the wrapped faults, never by flattening the cluster
    /// into a rupture stream.
    pub fn iter(&self) -> std::slice::Iter<'_, Rupture> {
        unimplemented!("cluster sources are processed by the joint-probability cluster model")
    }
}

/// A group of cluster sources sharing a weight and GMM assignment.
#[derive(Debug)]
pub struct ClusterSourceSet {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    sources: Vec<ClusterSource>,
}

impl ClusterSourceSet {
    /// Start building a cluster source set.
    pub fn builder(name: &str, weight: f64, gmms: Arc<GmmSet>) -> ClusterSourceSetBuilder {
        ClusterSourceSetBuilder {
            name: name.to_string(),
            weight,
            gmms,
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
        SourceType::Cluster
    }

    pub fn gmms(&self) -> &Arc<GmmSet> {
        &self.gmms
    }

    pub fn size(&self) -> usize {
        self.sources.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClusterSource> {
        self.sources.iter()
    }

    /// `true` if any wrapped fault passes the fault distance filter.
    pub fn distance_filter(
        &self,
        site: &Location,
        distance: f64,
        source: &ClusterSource,
    ) -> bool {
        source
            .faults()
            .iter()
            .any(|f| source.faults().distance_filter(site, distance, f))
    }

    /// Sources passing the distance pre-filter at the GMM set's maximum
    /// applicable distance.
    pub fn location_sources(&self, site: &Location) -> Vec<&ClusterSource> {
        let d = self.gmms.max_dist_hi();
        self.sources
            .iter()
            .filter(|s| self.distance_filter(site, d, s))
            .collect()
    }
}

/// Single-use builder for [`ClusterSourceSet`].
pub struct ClusterSourceSetBuilder {
    name: String,
    weight: f64,
    gmms: Arc<GmmSet>,
    sources: Vec<ClusterSource>,
}

impl ClusterSourceSetBuilder {
    /// Add a built cluster to the set.
    pub fn source(mut self, source: ClusterSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Validate and build. A set with zero clusters fails.
    pub fn build(self) -> Result<ClusterSourceSet, ValidationError> {
        check_weight(self.weight)?;
        if self.sources.is_empty() {
            return Err(ValidationError::EmptySourceSet(self.name));
        }
        Ok(ClusterSourceSet {
            name: self.name,
            weight: self.weight,
            gmms: self.gmms,
            sources: self.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxilary::approx_equal;
    use crate::fault::FaultSource;
    use crate::geodesy::LocationList;
    use crate::gmm::Gmm;
    use crate::mfd::IncrementalMfd;
    use crate::msr::MagScalingType;

    fn test_gmms() -> Arc<GmmSet> {
        let map = [(Gmm::Ask14, 1.0)].into_iter().collect();
        Arc::new(GmmSet::builder(map, 300.0).build().unwrap())
    }

    fn single_fault(name: &str, lat: f64, mfd: IncrementalMfd) -> FaultSource {
        let a = Location::surface(lat, -118.0);
        let b = a.move_along(0.0, 15.0, 0.0);
        FaultSource::builder()
            .name(name)
            .trace(LocationList::from(vec![a, b]))
            .dip(90.0)
            .width(12.0)
            .rake(0.0)
            .mfds(vec![mfd])
            .mag_scaling(MagScalingType::Wc94Length)
            .build()
            .unwrap()
    }

    fn test_cluster() -> ClusterSource {
        let rate = 1.0 / 5000.0;
        let faults = FaultSourceSet::builder("New Madrid faults", 1.0, test_gmms(), MagScalingType::Wc94Length)
            .source(single_fault("A", 34.0, IncrementalMfd::single(7.2, rate, false).unwrap()))
            .source(single_fault("B", 34.2, IncrementalMfd::single(7.4, rate, false).unwrap()))
            .source(single_fault("C", 34.4, IncrementalMfd::single(7.6, rate, false).unwrap()))
            .build()
            .unwrap();
        ClusterSource::new("New Madrid cluster", rate, faults).unwrap()
    }

    #[test]
    fn test_cluster_accessors() {
        let cluster = test_cluster();
        assert_eq!(cluster.size(), 3);
        assert!(approx_equal(cluster.rate(), 1.0 / 5000.0, 1e-15));
        assert_eq!(cluster.faults().size(), 3);
    }

    #[test]
    #[should_panic(expected = "joint-probability")]
    fn test_cluster_iteration_unsupported() {
        let cluster = test_cluster();
        let _ = cluster.iter();
    }

    #[test]
    fn test_multi_magnitude_fault_rejected() {
        let gr = IncrementalMfd::gutenberg_richter(3.0, 1.0, 6.0, 7.0, 0.1, false).unwrap();
        let faults = FaultSourceSet::builder("Bad", 1.0, test_gmms(), MagScalingType::Wc94Length)
            .source(single_fault("A", 34.0, gr))
            .build()
            .unwrap();
        assert!(matches!(
            ClusterSource::new("Bad cluster", 0.001, faults),
            Err(ValidationError::ClusterMfd)
        ));
    }

    #[test]
    fn test_cluster_filter_delegates_to_faults() {
        let set = ClusterSourceSet::builder("Cluster set", 1.0, test_gmms())
            .source(test_cluster())
            .build()
            .unwrap();
        assert_eq!(set.location_sources(&Location::surface(34.1, -118.0)).len(), 1);
        assert_eq!(set.location_sources(&Location::surface(20.0, -100.0)).len(), 0);
        assert_eq!(set.source_type(), SourceType::Cluster);
    }
}
