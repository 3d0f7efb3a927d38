//! # Data Readers for Site Input Files
//!
//! This module provides utilities for reading site lists into the
//! forecast library. It focuses on deserializing tabular files into
//! [`Site`] instances for use in distance filtering and rupture
//! listings.
//!
//! ## Example File Format (tab-delimited)
//!
//! ```text
//! -118.25 34.05   Los Angeles
//! -122.42 37.77   San Francisco
//! ```
//!
//! Columns are interpreted as:
//!
//! 1. longitude (f64)
//! 2. latitude (f64)
//! 3. site name (optional, string)
//!
//! The file is assumed to have **no header row**, and the delimiter can
//! be specified to support flexible file formats (e.g., tab, comma).
//!
//! ## Errors
//!
//! This module returns boxed errors for I/O issues or data
//! deserialization failures.

use crate::geodesy::Location;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// A hazard site: a surface location with an optional name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Optional site name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Site {
    /// The site as a surface [`Location`].
    pub fn location(&self) -> Location {
        Location::surface(self.lat, self.lon)
    }
}

/// Reads a list of [`Site`] instances from a delimited text file.
///
/// # Arguments
///
/// * `path` — Path to the input file.
/// * `delim` — Delimiter character (e.g., `b'\t'` for tab, `b','` for comma).
///
/// # Returns
///
/// A `Result` containing a vector of [`Site`] instances if successful,
/// or a boxed error if file I/O or parsing fails.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened.
/// - Any row in the file fails to deserialize into a [`Site`].
pub fn read_sites<P: AsRef<Path>>(path: P, delim: u8) -> Result<Vec<Site>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut sites = Vec::new();

    for result in rdr.deserialize() {
        let record: Site = result?;
        sites.push(record);
    }

    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_sites_with_names() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "-118.25\t34.05\tLos Angeles")?;
        writeln!(file, "-122.42\t37.77\tSan Francisco")?;

        let sites = read_sites(file.path(), b'\t')?;
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name.as_deref(), Some("Los Angeles"));
        assert_eq!(sites[1].location().lat, 37.77);
        Ok(())
    }

    #[test]
    fn test_read_sites_without_names() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "-118.25\t34.05")?;

        let sites = read_sites(file.path(), b'\t')?;
        assert_eq!(sites.len(), 1);
        assert!(sites[0].name.is_none());
        Ok(())
    }
}
