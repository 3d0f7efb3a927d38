//! # Forecast Loader
//!
//! Traverses a forecast on disk — a directory tree or a ZIP archive —
//! and assembles a [`HazardModel`]. First-level subdirectories name
//! source types; each contains one or more source XML files governed by
//! the nearest `gmm.xml` at or above the file's directory. Hidden
//! files, names starting with `~`, and macOS `__MACOSX` resource forks
//! are skipped.
//!
//! Loading is single-threaded and fail-fast: the first configuration,
//! parse or validation error is logged and re-raised, aborting the
//! whole forecast.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::{ForecastError, ForecastResult, ValidationError};
use crate::gmm::GmmSet;
use crate::model::{HazardModel, SourceSets};
use crate::parsers;
use crate::sourceset::SourceType;

/// The type-directory processing order; model iteration follows it.
const TYPE_ORDER: [SourceType; 6] = [
    SourceType::Fault,
    SourceType::Interface,
    SourceType::Cluster,
    SourceType::Grid,
    SourceType::Slab,
    SourceType::System,
];

/// Load a forecast from a directory tree or `.zip` archive.
///
/// On success the per-set summary block is logged at `info`; on failure
/// the error is logged at `error` and re-raised.
pub fn load<P: AsRef<Path>>(path: P) -> ForecastResult<HazardModel> {
    let path = path.as_ref();
    match load_inner(path) {
        Ok(model) => {
            info!("\n{}", model.summary());
            Ok(model)
        }
        Err(e) => {
            error!(path = %path.display(), "forecast load failed: {e}");
            Err(e)
        }
    }
}

fn load_inner(path: &Path) -> ForecastResult<HazardModel> {
    if !path.exists() {
        return Err(ForecastError::MissingPath(path.to_path_buf()));
    }
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "forecast".to_string());

    let entries = if path.is_dir() {
        read_dir_entries(path)?
    } else {
        read_zip_entries(path)?
    };
    if entries.is_empty() {
        return Err(ForecastError::EmptyForecast(path.to_path_buf()));
    }
    build_model(&name, entries, path)
}

/// One XML file of the forecast, keyed by its path relative to the
/// forecast root.
struct ForecastEntry {
    rel: PathBuf,
    content: String,
}

fn skip_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('~') || name == "__MACOSX"
}

fn read_dir_entries(root: &Path) -> ForecastResult<Vec<ForecastEntry>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        // the forecast root itself is exempt from the skip rules
        e.depth() == 0
            || e.file_name()
                .to_str()
                .map(|n| !skip_name(n))
                .unwrap_or(false)
    });
    for entry in walker {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("forecast walk failed: {e}"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_path_buf();
        debug!(file = %rel.display(), "reading forecast file");
        out.push(ForecastEntry {
            rel,
            content: std::fs::read_to_string(path)?,
        });
    }
    Ok(out)
}

fn read_zip_entries(path: &Path) -> ForecastResult<Vec<ForecastEntry>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut out = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.is_file() || !entry.name().ends_with(".xml") {
            continue;
        }
        let rel = PathBuf::from(entry.name());
        if rel.components().any(|c| match c {
            Component::Normal(n) => n.to_str().map(skip_name).unwrap_or(true),
            _ => false,
        }) {
            continue;
        }
        debug!(file = %rel.display(), "reading archive entry");
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        out.push(ForecastEntry { rel, content });
    }
    Ok(strip_archive_root(out))
}

/// Archives often wrap the forecast in a single root folder; strip it
/// when the first path component is shared and is not a source type.
fn strip_archive_root(entries: Vec<ForecastEntry>) -> Vec<ForecastEntry> {
    let first: Option<String> = entries.first().and_then(|e| first_component(&e.rel));
    let Some(first) = first else {
        return entries;
    };
    if SourceType::from_str(&first).is_ok() {
        return entries;
    }
    if !entries
        .iter()
        .all(|e| first_component(&e.rel).as_deref() == Some(first.as_str()))
    {
        return entries;
    }
    entries
        .into_iter()
        .map(|e| {
            let rel = e.rel.components().skip(1).collect();
            ForecastEntry { rel, content: e.content }
        })
        .collect()
}

fn first_component(path: &Path) -> Option<String> {
    path.components().next().and_then(|c| match c {
        Component::Normal(n) => n.to_str().map(str::to_string),
        _ => None,
    })
}

fn build_model(
    name: &str,
    entries: Vec<ForecastEntry>,
    root: &Path,
) -> ForecastResult<HazardModel> {
    // group entries by their first-level (type) directory
    let mut by_type: HashMap<String, Vec<ForecastEntry>> = HashMap::new();
    for entry in entries {
        let Some(first) = first_component(&entry.rel) else {
            // loose files at the forecast root are not source files
            continue;
        };
        if entry.rel.components().count() < 2 {
            continue;
        }
        by_type.entry(first).or_default().push(entry);
    }

    for type_name in by_type.keys() {
        if SourceType::from_str(type_name).is_err() {
            return Err(ForecastError::UnknownSourceType(type_name.clone()));
        }
    }

    let mut builder = HazardModel::builder(name);
    let mut set_count = 0usize;

    for source_type in TYPE_ORDER {
        let Some(mut group) = by_type.remove(source_type.dir_name()) else {
            continue;
        };
        group.sort_by(|a, b| a.rel.cmp(&b.rel));

        let gmm_cache = GmmCache::new(&group, root)?;
        let sets = match source_type {
            SourceType::System => {
                parse_system_group(&group, &gmm_cache, root)?
            }
            _ => parse_plain_group(source_type, &group, &gmm_cache, root)?,
        };
        for set in sets {
            info!(
                source_type = %set.source_type(),
                name = set.name(),
                sources = set.size(),
                ruptures = set.total_ruptures(),
                "built source set"
            );
            builder = builder.source_set(set);
            set_count += 1;
        }
    }

    if let Some(area) = by_type.get(SourceType::Area.dir_name()) {
        warn!(files = area.len(), "area sources are not supported; skipping");
    }

    if set_count == 0 {
        return Err(ForecastError::EmptyForecast(root.to_path_buf()));
    }
    builder.build().map_err(ForecastError::Validation)
}

/// Nearest-`gmm.xml` resolution within one type directory, with each
/// file parsed at most once.
struct GmmCache {
    /// parsed sets keyed by the directory of their gmm.xml
    by_dir: HashMap<PathBuf, Arc<GmmSet>>,
    type_root: PathBuf,
}

impl GmmCache {
    fn new(group: &[ForecastEntry], _root: &Path) -> ForecastResult<Self> {
        let mut by_dir = HashMap::new();
        let mut type_root = PathBuf::new();
        for entry in group {
            if let Some(first) = first_component(&entry.rel) {
                type_root = PathBuf::from(first);
            }
            if entry.rel.file_name().and_then(|n| n.to_str()) == Some("gmm.xml") {
                let dir = entry.rel.parent().unwrap_or(Path::new("")).to_path_buf();
                let set = parsers::parse_gmm_set(&entry.content, &entry.rel.display().to_string())?;
                by_dir.insert(dir, Arc::new(set));
            }
        }
        Ok(Self { by_dir, type_root })
    }

    /// The GMM set governing `file`: the nearest `gmm.xml` at or above
    /// its directory, within the type directory.
    fn resolve(&self, file: &Path) -> ForecastResult<Arc<GmmSet>> {
        let mut dir = file.parent();
        while let Some(d) = dir {
            if let Some(set) = self.by_dir.get(d) {
                return Ok(set.clone());
            }
            dir = d.parent();
        }
        Err(ForecastError::MissingGmms(self.type_root.clone()))
    }
}

fn parse_plain_group(
    source_type: SourceType,
    group: &[ForecastEntry],
    gmms: &GmmCache,
    _root: &Path,
) -> ForecastResult<Vec<SourceSets>> {
    let mut sets = Vec::new();
    for entry in group {
        if entry.rel.file_name().and_then(|n| n.to_str()) == Some("gmm.xml") {
            continue;
        }
        let path = entry.rel.display().to_string();
        let gmm_set = gmms.resolve(&entry.rel)?;
        debug!(file = %path, "parsing source file");
        let set = match source_type {
            SourceType::Fault => SourceSets::Fault(parsers::parse_fault_source_set(
                &entry.content,
                &path,
                gmm_set,
            )?),
            SourceType::Interface => SourceSets::Interface(
                parsers::parse_interface_source_set(&entry.content, &path, gmm_set)?,
            ),
            SourceType::Cluster => SourceSets::Cluster(parsers::parse_cluster_source_set(
                &entry.content,
                &path,
                gmm_set,
            )?),
            SourceType::Grid | SourceType::Slab => SourceSets::Grid(
                parsers::parse_grid_source_set(&entry.content, &path, gmm_set, source_type)?,
            ),
            SourceType::System | SourceType::Area => continue,
        };
        sets.push(set);
    }
    Ok(sets)
}

fn parse_system_group(
    group: &[ForecastEntry],
    gmms: &GmmCache,
    _root: &Path,
) -> ForecastResult<Vec<SourceSets>> {
    // pair fault_sections.xml and fault_ruptures.xml per directory
    let mut dirs: HashMap<PathBuf, (Option<&ForecastEntry>, Option<&ForecastEntry>)> =
        HashMap::new();
    for entry in group {
        let file_name = entry.rel.file_name().and_then(|n| n.to_str());
        if !matches!(file_name, Some("fault_sections.xml" | "fault_ruptures.xml")) {
            continue;
        }
        let dir = entry.rel.parent().unwrap_or(Path::new("")).to_path_buf();
        let slot = dirs.entry(dir).or_default();
        match file_name {
            Some("fault_sections.xml") => slot.0 = Some(entry),
            _ => slot.1 = Some(entry),
        }
    }

    let mut keys: Vec<PathBuf> = dirs.keys().cloned().collect();
    keys.sort();

    let mut sets = Vec::new();
    for dir in keys {
        let (sections, ruptures) = &dirs[&dir];
        let sections = sections.ok_or_else(|| {
            ForecastError::Validation(ValidationError::MissingElement(
                "fault_sections.xml".to_string(),
                dir.display().to_string(),
            ))
        })?;
        let ruptures = ruptures.ok_or_else(|| {
            ForecastError::Validation(ValidationError::MissingElement(
                "fault_ruptures.xml".to_string(),
                dir.display().to_string(),
            ))
        })?;
        let gmm_set = gmms.resolve(&sections.rel)?;
        let set = parsers::parse_system_source_set(
            &sections.content,
            &sections.rel.display().to_string(),
            &ruptures.content,
            &ruptures.rel.display().to_string(),
            gmm_set,
        )?;
        sets.push(SourceSets::System(set));
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GMM_XML: &str = r#"
<GroundMotionModels>
  <ModelSet maxDistance="300.0">
    <Model id="ASK_14" weight="1.0"/>
  </ModelSet>
</GroundMotionModels>"#;

    const FAULT_XML: &str = r#"
<FaultSourceSet name="Loader faults" weight="1.0">
  <SourceProperties magScaling="WC1994_LENGTH"/>
  <Source name="Alpha">
    <MagFreqDist type="SINGLE" m="6.5" a="0.001" floats="false"/>
    <Geometry dip="90.0" width="15.0" rake="0.0" depth="0.0"/>
    <Trace>
      34.0,-118.0,0.0
      34.2,-118.0,0.0
    </Trace>
  </Source>
</FaultSourceSet>"#;

    #[test]
    fn test_missing_path() {
        let res = load("no/such/forecast");
        assert!(matches!(res, Err(ForecastError::MissingPath(_))));
    }

    #[test]
    fn test_directory_forecast() {
        let dir = tempfile::tempdir().unwrap();
        let fault_dir = dir.path().join("Fault");
        fs::create_dir_all(&fault_dir).unwrap();
        fs::write(fault_dir.join("gmm.xml"), GMM_XML).unwrap();
        fs::write(fault_dir.join("faults.xml"), FAULT_XML).unwrap();
        // skipped files
        fs::write(fault_dir.join("~backup.xml"), "junk").unwrap();
        fs::write(fault_dir.join(".hidden.xml"), "junk").unwrap();

        let model = load(dir.path()).unwrap();
        assert_eq!(model.len(), 1);
        let set = model.iter().next().unwrap();
        assert_eq!(set.name(), "Loader faults");
        assert_eq!(set.size(), 1);
    }

    #[test]
    fn test_missing_gmm() {
        let dir = tempfile::tempdir().unwrap();
        let fault_dir = dir.path().join("Fault");
        fs::create_dir_all(&fault_dir).unwrap();
        fs::write(fault_dir.join("faults.xml"), FAULT_XML).unwrap();
        let res = load(dir.path());
        assert!(matches!(res, Err(ForecastError::MissingGmms(_))));
    }

    #[test]
    fn test_unknown_type_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("Faults");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join("faults.xml"), FAULT_XML).unwrap();
        let res = load(dir.path());
        assert!(matches!(res, Err(ForecastError::UnknownSourceType(_))));
    }

    #[test]
    fn test_nested_gmm_override() {
        let dir = tempfile::tempdir().unwrap();
        let fault_dir = dir.path().join("Fault");
        let nested = fault_dir.join("branch");
        fs::create_dir_all(&nested).unwrap();
        fs::write(fault_dir.join("gmm.xml"), GMM_XML).unwrap();
        fs::write(fault_dir.join("faults.xml"), FAULT_XML).unwrap();
        let override_gmm = r#"
<GroundMotionModels>
  <ModelSet maxDistance="150.0">
    <Model id="CB_14" weight="1.0"/>
  </ModelSet>
</GroundMotionModels>"#;
        fs::write(nested.join("gmm.xml"), override_gmm).unwrap();
        fs::write(nested.join("faults.xml"), FAULT_XML).unwrap();

        let model = load(dir.path()).unwrap();
        assert_eq!(model.len(), 2);
        let max_dists: Vec<f64> = model
            .iter()
            .map(|s| match s {
                SourceSets::Fault(f) => f.gmms().max_dist_hi(),
                _ => unreachable!(),
            })
            .collect();
        assert!(max_dists.contains(&300.0));
        assert!(max_dists.contains(&150.0));
    }

    #[test]
    fn test_zip_forecast() {
        use std::io::Write;
        use zip::write::FileOptions;

        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("forecast.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = FileOptions::default();
        writer
            .start_file("forecast/Fault/gmm.xml", options)
            .unwrap();
        writer.write_all(GMM_XML.as_bytes()).unwrap();
        writer
            .start_file("forecast/Fault/faults.xml", options)
            .unwrap();
        writer.write_all(FAULT_XML.as_bytes()).unwrap();
        writer.finish().unwrap();

        let model = load(&zip_path).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.iter().next().unwrap().name(), "Loader faults");
    }
}
