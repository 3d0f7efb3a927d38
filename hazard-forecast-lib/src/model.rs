//! # The Hazard Model
//!
//! The top-level forecast container: source sets keyed by type, in
//! insertion order. One model may hold several source sets of the same
//! type, e.g. multiple logic-tree branches of a fault model.

use std::fmt;

use crate::cluster::ClusterSourceSet;
use crate::error::ValidationError;
use crate::fault::{FaultSource, FaultSourceSet};
use crate::grid::GridSourceSet;
use crate::interface::InterfaceSourceSet;
use crate::sourceset::SourceType;
use crate::system::SystemSourceSet;

/// A source set of any type.
#[derive(Debug)]
pub enum SourceSets {
    Fault(FaultSourceSet),
    Interface(InterfaceSourceSet),
    Cluster(ClusterSourceSet),
    /// Grid and slab sets share one implementation; the tag
    /// distinguishes them.
    Grid(GridSourceSet),
    System(SystemSourceSet),
}

impl SourceSets {
    /// The set's type tag.
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Fault(s) => s.source_type(),
            Self::Interface(s) => s.source_type(),
            Self::Cluster(s) => s.source_type(),
            Self::Grid(s) => s.source_type(),
            Self::System(s) => s.source_type(),
        }
    }

    /// The set name.
    pub fn name(&self) -> &str {
        match self {
            Self::Fault(s) => s.name(),
            Self::Interface(s) => s.name(),
            Self::Cluster(s) => s.name(),
            Self::Grid(s) => s.name(),
            Self::System(s) => s.name(),
        }
    }

    /// The set weight.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Fault(s) => s.weight(),
            Self::Interface(s) => s.weight(),
            Self::Cluster(s) => s.weight(),
            Self::Grid(s) => s.weight(),
            Self::System(s) => s.weight(),
        }
    }

    /// Number of sources in the set (ruptures, for a system set).
    pub fn size(&self) -> usize {
        match self {
            Self::Fault(s) => s.size(),
            Self::Interface(s) => s.size(),
            Self::Cluster(s) => s.size(),
            Self::Grid(s) => s.size(),
            Self::System(s) => s.size(),
        }
    }

    /// Total rupture count of the set. Cluster ruptures are counted
    /// across the wrapped faults even though cluster iteration is
    /// unsupported.
    pub fn total_ruptures(&self) -> usize {
        match self {
            Self::Fault(s) => s.total_ruptures(),
            Self::Interface(s) => s.total_ruptures(),
            Self::Cluster(s) => s
                .iter()
                .map(|c| c.faults().iter().map(FaultSource::size).sum::<usize>())
                .sum(),
            Self::Grid(s) => s.total_ruptures(),
            Self::System(s) => s.size(),
        }
    }
}

/// A complete, immutable earthquake rupture forecast.
#[derive(Debug)]
pub struct HazardModel {
    name: String,
    sets: Vec<SourceSets>,
}

impl HazardModel {
    /// Start building a model.
    pub fn builder(name: &str) -> HazardModelBuilder {
        HazardModelBuilder {
            name: name.to_string(),
            sets: Vec::new(),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of source sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// `true` if the model holds no source sets. Construction rejects
    /// this state.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterator over all source sets in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceSets> {
        self.sets.iter()
    }

    /// Iterator over the source sets of one type, in insertion order.
    pub fn sets_of_type(&self, t: SourceType) -> impl Iterator<Item = &SourceSets> {
        self.sets.iter().filter(move |s| s.source_type() == t)
    }

    /// Per-set summary rows for logging and the CLI.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            model: self.name.clone(),
            rows: self
                .sets
                .iter()
                .map(|s| SummaryRow {
                    source_type: s.source_type(),
                    name: s.name().to_string(),
                    weight: s.weight(),
                    sources: s.size(),
                    ruptures: s.total_ruptures(),
                })
                .collect(),
        }
    }
}

/// One row of a model summary.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub source_type: SourceType,
    pub name: String,
    pub weight: f64,
    pub sources: usize,
    pub ruptures: usize,
}

/// Per-set counts of a built model.
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub model: String,
    pub rows: Vec<SummaryRow>,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast: {}", self.model)?;
        writeln!(
            f,
            "{:<10} {:<40} {:>7} {:>9} {:>10}",
            "Type", "Name", "Weight", "Sources", "Ruptures"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<10} {:<40} {:>7.3} {:>9} {:>10}",
                row.source_type.dir_name(),
                row.name,
                row.weight,
                row.sources,
                row.ruptures
            )?;
        }
        Ok(())
    }
}

/// Single-use builder for [`HazardModel`].
pub struct HazardModelBuilder {
    name: String,
    sets: Vec<SourceSets>,
}

impl HazardModelBuilder {
    /// Append a source set. Insertion order is iteration order.
    pub fn source_set(mut self, set: SourceSets) -> Self {
        self.sets.push(set);
        self
    }

    /// Validate and build. A model with zero source sets fails.
    pub fn build(self) -> Result<HazardModel, ValidationError> {
        if self.sets.is_empty() {
            return Err(ValidationError::EmptySourceSet(self.name));
        }
        Ok(HazardModel {
            name: self.name,
            sets: self.sets,
        })
    }
}
