//! Error types for forecast loading and model construction.
//!
//! Two layers of failure exist. [`ValidationError`] covers everything a
//! builder can reject at `build()` time: bad angles, bad weights, empty
//! collections. [`ForecastError`] covers whole-forecast concerns: missing
//! or empty forecast paths, I/O, zip archives, and XML parse failures with
//! file/line/column/element context.
//!
//! Local recovery is never attempted: the loader logs the failure and
//! re-raises it, aborting the whole forecast load.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for forecast loading operations.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Top-level error for forecast loading.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Forecast path does not exist on disk
    #[error("forecast path does not exist: {0}")]
    MissingPath(PathBuf),

    /// Forecast directory or archive contained no source files
    #[error("forecast contains no source files: {0}")]
    EmptyForecast(PathBuf),

    /// Source files present but no gmm.xml governs them
    #[error("missing gmm.xml for source files under: {0}")]
    MissingGmms(PathBuf),

    /// First-level directory does not name a known source type
    #[error("unknown source type directory: {0}")]
    UnknownSourceType(String),

    /// XML parse failure with positional context
    #[error("parse error in {path} at {line}:{column} <{element}>: {reason}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        element: String,
        reason: String,
    },

    /// Builder-level validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Zip archive failure
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// Validation failures raised by builders at `build()`.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("magnitude {0} outside supported range [4.0, 10.0]")]
    MagnitudeRange(f64),

    #[error("dip {0} outside [0°, 90°]")]
    DipRange(f64),

    #[error("rake {0} outside [-180°, 180°]")]
    RakeRange(f64),

    #[error("depth {0} outside supported range [0, 700] km")]
    DepthRange(f64),

    #[error("weight {0} outside [0, 1]")]
    WeightRange(f64),

    #[error("weights sum to {0}, expected 1.0")]
    WeightSum(f64),

    #[error("array length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("MFD has no magnitude bins")]
    EmptyMfd,

    #[error("MFD magnitudes are not strictly increasing")]
    MagnitudeOrder,

    #[error("negative annual rate {0}")]
    NegativeRate(f64),

    #[error("trace requires at least 2 points, got {0}")]
    TraceSize(usize),

    #[error("trace depths are not monotonically non-decreasing")]
    TraceDepthOrder,

    #[error("aleatory bin count {0} must be odd")]
    AleatoryCount(usize),

    #[error("mag-depth map does not cover magnitude {0}")]
    MagDepthCoverage(f64),

    #[error("secondary GMM keys are not a subset of primary keys")]
    GmmSubset,

    #[error("GMM uncertainty requires 1 or 9 values, got {0}")]
    GmmUncertaintySize(usize),

    #[error("cluster sources accept exactly one SINGLE magnitude MFD")]
    ClusterMfd,

    #[error("source set '{0}' contains no sources")]
    EmptySourceSet(String),

    #[error("source '{0}' produced no ruptures")]
    EmptySource(String),

    #[error("system rupture {index} spans {count} sections, need at least 2")]
    SystemSectionCount { index: usize, count: usize },

    #[error("section index {0} out of range for {1} sections")]
    SectionIndex(usize, usize),

    #[error("missing '{0}' required by {1}")]
    MissingElement(String, String),
}
