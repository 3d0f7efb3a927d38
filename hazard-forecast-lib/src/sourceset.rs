//! Source-type tags and the filter conventions shared by every source
//! set.
//!
//! Each source set exposes a cheap distance pre-filter over its sources:
//! `location_sources(site)` returns the sources whose filter passes at
//! the governing GMM set's maximum applicable distance. Exact distance
//! calculation happens later, per rupture.

use std::fmt;
use std::str::FromStr;

/// The kind of a source set. One set has exactly one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Fault,
    Interface,
    Cluster,
    Grid,
    Slab,
    System,
    Area,
}

impl SourceType {
    /// The forecast directory name for this type.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Fault => "Fault",
            Self::Interface => "Interface",
            Self::Cluster => "Cluster",
            Self::Grid => "Grid",
            Self::Slab => "Slab",
            Self::System => "System",
            Self::Area => "Area",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fault" => Ok(Self::Fault),
            "Interface" => Ok(Self::Interface),
            "Cluster" => Ok(Self::Cluster),
            "Grid" => Ok(Self::Grid),
            "Slab" => Ok(Self::Slab),
            "System" => Ok(Self::System),
            "Area" => Ok(Self::Area),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}
