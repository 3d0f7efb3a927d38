//! # Data Writers for Forecast Output Files
//!
//! This module provides utilities for writing forecast diagnostics to
//! delimited text files: per-set summary rows and per-rupture distance
//! listings for a site.
//!
//! ## Example Output Format (tab-delimited)
//!
//! ```text
//! source_set	source	mag	rate	r_jb	r_rup	r_x
//! Loader faults	Alpha	6.5	0.001	12.4	13.1	12.4
//! ```
//!
//! ## Errors
//!
//! This module returns boxed errors for I/O issues or serialization
//! failures.

use crate::model::ModelSummary;
use csv::WriterBuilder;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// One rupture row of a site listing.
#[derive(Debug, Serialize)]
pub struct RuptureRecord {
    /// Owning source set name.
    pub source_set: String,
    /// Source name.
    pub source: String,
    /// Moment magnitude.
    pub mag: f64,
    /// Annual rate.
    pub rate: f64,
    /// Closest horizontal distance to the surface projection, km.
    pub r_jb: f64,
    /// Closest 3-D distance to the rupture, km.
    pub r_rup: f64,
    /// Signed distance across strike, km.
    pub r_x: f64,
}

/// One summary row of a built model.
#[derive(Debug, Serialize)]
struct SummaryRecord {
    source_type: String,
    name: String,
    weight: f64,
    sources: usize,
    ruptures: usize,
}

/// Writes a list of [`RuptureRecord`] instances to a delimited text
/// file, including a header row.
///
/// # Errors
///
/// Returns an error if the file cannot be created or any record fails
/// to serialize.
pub fn write_rupture_records<P: AsRef<Path>>(
    path: P,
    delim: u8,
    records: &[RuptureRecord],
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut wtr = WriterBuilder::new()
        .delimiter(delim)
        .has_headers(true)
        .from_writer(file);

    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the per-set summary of a built model to a delimited text
/// file, including a header row.
///
/// # Errors
///
/// Returns an error if the file cannot be created or any row fails to
/// serialize.
pub fn write_summary<P: AsRef<Path>>(
    path: P,
    delim: u8,
    summary: &ModelSummary,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut wtr = WriterBuilder::new()
        .delimiter(delim)
        .has_headers(true)
        .from_writer(file);

    for row in &summary.rows {
        wtr.serialize(SummaryRecord {
            source_type: row.source_type.dir_name().to_string(),
            name: row.name.clone(),
            weight: row.weight,
            sources: row.sources,
            ruptures: row.ruptures,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_rupture_records() -> Result<(), Box<dyn Error>> {
        let file = tempfile::NamedTempFile::new()?;
        let records = vec![RuptureRecord {
            source_set: "Set".to_string(),
            source: "Alpha".to_string(),
            mag: 6.5,
            rate: 0.001,
            r_jb: 12.4,
            r_rup: 13.1,
            r_x: 12.4,
        }];
        write_rupture_records(file.path(), b'\t', &records)?;

        let content = std::fs::read_to_string(file.path())?;
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("source_set\tsource\tmag\trate\tr_jb\tr_rup\tr_x")
        );
        assert!(lines.next().unwrap_or_default().starts_with("Set\tAlpha\t6.5"));
        Ok(())
    }
}
