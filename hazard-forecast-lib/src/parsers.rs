//! # Forecast XML Parsers
//!
//! One parse function per source-set grammar, plus the attribute
//! encodings forecast files use (`magDepthMap`, `focalMechMap`, integer
//! range strings, trace text) and the `gmm.xml` grammar.
//!
//! Files are read in a single forward pass with
//! [`quick-xml`](https://docs.rs/quick-xml/) into a lightweight
//! positioned element tree; every failure reports file, line, column
//! and offending element. Errors are fatal: the loader aborts the whole
//! forecast on the first one.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::cluster::{ClusterSource, ClusterSourceSet};
use crate::error::{ForecastError, ForecastResult};
use crate::fault::{FaultSource, FaultSourceSet};
use crate::geodesy::{Location, LocationList};
use crate::gmm::{Gmm, GmmSet, GmmUncertainty};
use crate::grid::{GridSourceSet, MagDepthMap};
use crate::interface::{InterfaceSource, InterfaceSourceSet};
use crate::mfd::IncrementalMfd;
use crate::msr::MagScalingType;
use crate::pointsource::{FocalMech, FocalMechMap};
use crate::sourceset::SourceType;
use crate::system::SystemSourceSet;
use crate::uncertainty::{expand_gutenberg_richter, expand_single, Aleatory, Epistemic, MagUncertainty};

// ---------------------------------------------------------------------
// positioned element tree
// ---------------------------------------------------------------------

/// A parsed XML element with source position.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
    pub line: usize,
    pub column: usize,
}

impl XmlNode {
    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Attribute value, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn err(&self, path: &str, reason: impl Into<String>) -> ForecastError {
        ForecastError::Parse {
            path: path.to_string(),
            line: self.line,
            column: self.column,
            element: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn req_attr(&self, key: &str, path: &str) -> ForecastResult<&str> {
        self.attr(key)
            .ok_or_else(|| self.err(path, format!("missing required attribute '{key}'")))
    }

    fn req_f64(&self, key: &str, path: &str) -> ForecastResult<f64> {
        let raw = self.req_attr(key, path)?;
        raw.parse()
            .map_err(|_| self.err(path, format!("unparseable attribute {key}=\"{raw}\"")))
    }

    fn opt_f64(&self, key: &str, path: &str) -> ForecastResult<Option<f64>> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| self.err(path, format!("unparseable attribute {key}=\"{raw}\""))),
        }
    }

    fn req_child<'a>(&'a self, name: &str, path: &str) -> ForecastResult<&'a XmlNode> {
        self.child(name)
            .ok_or_else(|| self.err(path, format!("missing required element <{name}>")))
    }

    /// Validate: build the validation error into a positioned parse
    /// error at this element.
    fn check<T>(
        &self,
        path: &str,
        result: Result<T, crate::error::ValidationError>,
    ) -> ForecastResult<T> {
        result.map_err(|e| self.err(path, e.to_string()))
    }
}

fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let clamped = offset.min(text.len());
    let upto = &text[..clamped];
    let line = upto.matches('\n').count() + 1;
    let column = clamped - upto.rfind('\n').map_or(0, |i| i + 1) + 1;
    (line, column)
}

fn node_from(
    e: &BytesStart<'_>,
    xml: &str,
    path: &str,
    offset: usize,
) -> ForecastResult<XmlNode> {
    let (line, column) = line_col(xml, offset);
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ForecastError::Parse {
            path: path.to_string(),
            line,
            column,
            element: name.clone(),
            reason: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ForecastError::Parse {
                path: path.to_string(),
                line,
                column,
                element: name.clone(),
                reason: err.to_string(),
            })?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(XmlNode {
        name,
        attrs,
        text: String::new(),
        children: Vec::new(),
        line,
        column,
    })
}

/// Parse an XML document into its positioned root element.
pub fn parse_tree(xml: &str, path: &str) -> ForecastResult<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            // positions are taken at the end of each event, which stays
            // on the event's line for the single-line elements of the
            // forecast grammars
            Ok(Event::Start(e)) => {
                let offset = reader.buffer_position();
                stack.push(node_from(&e, xml, path, offset)?);
            }
            Ok(Event::Empty(e)) => {
                let offset = reader.buffer_position();
                let node = node_from(&e, xml, path, offset)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Ok(Event::End(_)) => {
                if let Some(node) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let offset = reader.buffer_position();
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().map_err(|err| {
                        let (line, column) = line_col(xml, offset);
                        ForecastError::Parse {
                            path: path.to_string(),
                            line,
                            column,
                            element: top.name.clone(),
                            reason: err.to_string(),
                        }
                    })?;
                    if !top.text.is_empty() {
                        top.text.push(' ');
                    }
                    top.text.push_str(text.trim());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                let (line, column) = line_col(xml, reader.buffer_position());
                return Err(ForecastError::Parse {
                    path: path.to_string(),
                    line,
                    column,
                    element: stack.last().map_or_else(String::new, |n| n.name.clone()),
                    reason: err.to_string(),
                });
            }
        }
    }

    root.ok_or_else(|| ForecastError::Parse {
        path: path.to_string(),
        line: 1,
        column: 1,
        element: String::new(),
        reason: "no root element".to_string(),
    })
}

// ---------------------------------------------------------------------
// attribute encodings
// ---------------------------------------------------------------------

fn strip_brackets(s: &str) -> &str {
    s.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
}

/// Parse a bracketed double array: `[-0.2, 0.0, 0.2]`.
pub fn parse_double_array(s: &str) -> Result<Vec<f64>, String> {
    strip_brackets(s)
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            t.trim()
                .parse()
                .map_err(|_| format!("unparseable number '{}'", t.trim()))
        })
        .collect()
}

/// Parse a magnitude–depth map:
/// `[m1 :: [d1:w1, d2:w2]; m2 :: [d3:w3]]`. Outer keys are magnitude
/// cutoffs (strict upper bounds), inner maps give depth → weight.
pub fn parse_mag_depth_map(s: &str) -> Result<Vec<(f64, Vec<(f64, f64)>)>, String> {
    let body = strip_brackets(s);
    let mut out = Vec::new();
    for entry in body.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (mag, depths) = entry
            .split_once("::")
            .ok_or_else(|| format!("missing '::' in magDepthMap entry '{entry}'"))?;
        let mag: f64 = mag
            .trim()
            .parse()
            .map_err(|_| format!("unparseable magnitude cutoff '{}'", mag.trim()))?;
        let mut dist = Vec::new();
        for pair in strip_brackets(depths).split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (d, w) = pair
                .split_once(':')
                .ok_or_else(|| format!("missing ':' in depth:weight pair '{pair}'"))?;
            dist.push((
                d.trim()
                    .parse()
                    .map_err(|_| format!("unparseable depth '{}'", d.trim()))?,
                w.trim()
                    .parse()
                    .map_err(|_| format!("unparseable weight '{}'", w.trim()))?,
            ));
        }
        if dist.is_empty() {
            return Err(format!("empty depth distribution for cutoff {mag}"));
        }
        out.push((mag, dist));
    }
    if out.is_empty() {
        return Err("empty magDepthMap".to_string());
    }
    Ok(out)
}

/// Parse a focal mechanism map:
/// `[STRIKE_SLIP:0.5, REVERSE:0.5, NORMAL:0.0]`. Missing mechanisms
/// default to zero weight.
pub fn parse_focal_mech_map(s: &str) -> Result<(f64, f64, f64), String> {
    let mut ss = 0.0;
    let mut rev = 0.0;
    let mut nor = 0.0;
    for pair in strip_brackets(s).split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (mech, w) = pair
            .split_once(':')
            .ok_or_else(|| format!("missing ':' in focalMechMap pair '{pair}'"))?;
        let weight: f64 = w
            .trim()
            .parse()
            .map_err(|_| format!("unparseable weight '{}'", w.trim()))?;
        match FocalMech::from_str(mech.trim())? {
            FocalMech::StrikeSlip => ss = weight,
            FocalMech::Reverse => rev = weight,
            FocalMech::Normal => nor = weight,
        }
    }
    Ok((ss, rev, nor))
}

/// Parse an integer range string: `[[a:b], c, [d:e]]`. A bracketed
/// `[a:b]` is an inclusive range, ascending or descending, decoded in
/// the order given.
pub fn parse_index_ranges(s: &str) -> Result<Vec<usize>, String> {
    let body = strip_brackets(s);
    let mut out = Vec::new();
    for token in body.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some(range) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            let (a, b) = range
                .split_once(':')
                .ok_or_else(|| format!("missing ':' in range '{token}'"))?;
            let a: usize = a
                .trim()
                .parse()
                .map_err(|_| format!("unparseable index '{}'", a.trim()))?;
            let b: usize = b
                .trim()
                .parse()
                .map_err(|_| format!("unparseable index '{}'", b.trim()))?;
            if a <= b {
                out.extend(a..=b);
            } else {
                out.extend((b..=a).rev());
            }
        } else {
            out.push(
                token
                    .parse()
                    .map_err(|_| format!("unparseable index '{token}'"))?,
            );
        }
    }
    Ok(out)
}

/// Parse trace text: whitespace-delimited `lat,lon,depth` triples.
pub fn parse_trace(text: &str) -> Result<LocationList, String> {
    let mut locs = Vec::new();
    for token in text.split_whitespace() {
        let parts: Vec<&str> = token.split(',').collect();
        if parts.len() != 3 {
            return Err(format!("trace point '{token}' is not a lat,lon,depth triple"));
        }
        let lat: f64 = parts[0]
            .parse()
            .map_err(|_| format!("unparseable latitude '{}'", parts[0]))?;
        let lon: f64 = parts[1]
            .parse()
            .map_err(|_| format!("unparseable longitude '{}'", parts[1]))?;
        let depth: f64 = parts[2]
            .parse()
            .map_err(|_| format!("unparseable depth '{}'", parts[2]))?;
        locs.push(Location::new(lat, lon, depth));
    }
    if locs.is_empty() {
        return Err("empty trace".to_string());
    }
    Ok(LocationList::from(locs))
}

// ---------------------------------------------------------------------
// MFD attribute handling
// ---------------------------------------------------------------------

fn merged_attrs(defaults: &HashMap<String, String>, node: &XmlNode) -> HashMap<String, String> {
    let mut merged = defaults.clone();
    for (k, v) in &node.attrs {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

fn merged_req<'a>(
    merged: &'a HashMap<String, String>,
    key: &str,
    node: &XmlNode,
    path: &str,
) -> ForecastResult<&'a str> {
    merged
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| node.err(path, format!("missing required attribute '{key}'")))
}

fn merged_f64(
    merged: &HashMap<String, String>,
    key: &str,
    node: &XmlNode,
    path: &str,
) -> ForecastResult<f64> {
    let raw = merged_req(merged, key, node, path)?;
    raw.parse()
        .map_err(|_| node.err(path, format!("unparseable attribute {key}=\"{raw}\"")))
}

fn merged_f64_or(
    merged: &HashMap<String, String>,
    key: &str,
    default: f64,
    node: &XmlNode,
    path: &str,
) -> ForecastResult<f64> {
    match merged.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| node.err(path, format!("unparseable attribute {key}=\"{raw}\""))),
    }
}

fn merged_bool_or(
    merged: &HashMap<String, String>,
    key: &str,
    default: bool,
    node: &XmlNode,
    path: &str,
) -> ForecastResult<bool> {
    match merged.get(key).map(String::as_str) {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(raw) => Err(node.err(path, format!("unparseable attribute {key}=\"{raw}\""))),
    }
}

/// Build the branch MFDs of one `<MagFreqDist>` element, merging its
/// attributes over the `<MagFreqDistRef>` defaults, applying the set
/// weight and expanding magnitude uncertainty.
fn build_mfds(
    defaults: &HashMap<String, String>,
    node: &XmlNode,
    set_weight: f64,
    unc: &MagUncertainty,
    path: &str,
) -> ForecastResult<Vec<IncrementalMfd>> {
    let merged = merged_attrs(defaults, node);
    let mfd_type = merged_req(&merged, "type", node, path)?;
    match mfd_type {
        "GR" => {
            let a = merged_f64(&merged, "a", node, path)?;
            let b = merged_f64(&merged, "b", node, path)?;
            let m_min = merged_f64(&merged, "mMin", node, path)?;
            let m_max = merged_f64(&merged, "mMax", node, path)?;
            let d_mag = merged_f64(&merged, "dMag", node, path)?;
            let weight = merged_f64_or(&merged, "weight", 1.0, node, path)?;
            let floats = merged_bool_or(&merged, "floats", true, node, path)?;
            node.check(
                path,
                expand_gutenberg_richter(a, b, m_min, m_max, d_mag, weight * set_weight, floats, unc),
            )
        }
        "SINGLE" => {
            let m = merged_f64(&merged, "m", node, path)?;
            let rate = merged_f64(&merged, "a", node, path)?;
            let weight = merged_f64_or(&merged, "weight", 1.0, node, path)?;
            let floats = merged_bool_or(&merged, "floats", false, node, path)?;
            node.check(path, expand_single(m, rate * weight * set_weight, floats, unc))
        }
        "INCR" => {
            let mags = parse_double_array(merged_req(&merged, "mags", node, path)?)
                .map_err(|e| node.err(path, e))?;
            let rates = parse_double_array(merged_req(&merged, "rates", node, path)?)
                .map_err(|e| node.err(path, e))?;
            let weight = merged_f64_or(&merged, "weight", 1.0, node, path)?;
            let floats = merged_bool_or(&merged, "floats", false, node, path)?;
            let scaled = rates.iter().map(|r| r * weight * set_weight).collect();
            node.check(path, IncrementalMfd::incremental(mags, scaled, floats).map(|m| vec![m]))
        }
        other => Err(node.err(path, format!("unknown MFD type '{other}'"))),
    }
}

/// Parse the `<Settings>` block shared by the source-set grammars:
/// MFD defaults and magnitude uncertainty.
fn parse_settings(
    root: &XmlNode,
    path: &str,
) -> ForecastResult<(HashMap<String, String>, MagUncertainty)> {
    let mut defaults = HashMap::new();
    let mut unc = MagUncertainty::none();

    let Some(settings) = root.child("Settings") else {
        return Ok((defaults, unc));
    };
    if let Some(mfd_ref) = settings.child("MagFreqDistRef") {
        if let Some(mfd) = mfd_ref.child("MagFreqDist") {
            defaults = mfd.attrs.clone();
        }
    }
    if let Some(mag_unc) = settings.child("MagUncertainty") {
        if let Some(epi) = mag_unc.child("Epistemic") {
            let deltas = parse_double_array(epi.req_attr("deltas", path)?)
                .map_err(|e| epi.err(path, e))?;
            let weights = parse_double_array(epi.req_attr("weights", path)?)
                .map_err(|e| epi.err(path, e))?;
            let cutoff = epi.req_f64("cutoff", path)?;
            unc.epistemic = Some(epi.check(path, Epistemic::new(deltas, weights, cutoff))?);
        }
        if let Some(al) = mag_unc.child("Aleatory") {
            let sigma = al.req_f64("sigma", path)?;
            let count = al.req_f64("count", path)? as usize;
            let mo_balance = match al.attr("moBalance") {
                Some("true") | None => true,
                Some("false") => false,
                Some(raw) => {
                    return Err(al.err(path, format!("unparseable attribute moBalance=\"{raw}\"")))
                }
            };
            let cutoff = al.req_f64("cutoff", path)?;
            unc.aleatory = Some(al.check(path, Aleatory::new(sigma, count, mo_balance, cutoff))?);
        }
    }
    Ok((defaults, unc))
}

fn parse_mag_scaling(root: &XmlNode, path: &str) -> ForecastResult<MagScalingType> {
    let props = root.req_child("SourceProperties", path)?;
    let raw = props.req_attr("magScaling", path)?;
    MagScalingType::from_str(raw).map_err(|e| props.err(path, e))
}

// ---------------------------------------------------------------------
// fault / interface / cluster
// ---------------------------------------------------------------------

fn parse_fault_source(
    node: &XmlNode,
    defaults: &HashMap<String, String>,
    unc: &MagUncertainty,
    set_weight: f64,
    msr: MagScalingType,
    path: &str,
) -> ForecastResult<FaultSource> {
    let name = node.req_attr("name", path)?;
    let geometry = node.req_child("Geometry", path)?;
    let trace_node = node.req_child("Trace", path)?;
    let trace = parse_trace(&trace_node.text).map_err(|e| trace_node.err(path, e))?;

    let mut mfds = Vec::new();
    for mfd_node in node.children_named("MagFreqDist") {
        mfds.extend(build_mfds(defaults, mfd_node, set_weight, unc, path)?);
    }

    let mut builder = FaultSource::builder()
        .name(name)
        .trace(trace)
        .dip(geometry.req_f64("dip", path)?)
        .width(geometry.req_f64("width", path)?)
        .rake(geometry.req_f64("rake", path)?)
        .mfds(mfds)
        .mag_scaling(msr);
    if let Some(depth) = geometry.opt_f64("depth", path)? {
        builder = builder.depth(depth);
    }
    node.check(path, builder.build())
}

/// Parse a `<FaultSourceSet>` document.
pub fn parse_fault_source_set(
    xml: &str,
    path: &str,
    gmms: Arc<GmmSet>,
) -> ForecastResult<FaultSourceSet> {
    let root = parse_tree(xml, path)?;
    if root.name != "FaultSourceSet" {
        return Err(root.err(path, "expected <FaultSourceSet> root"));
    }
    let name = root.req_attr("name", path)?;
    let weight = root.req_f64("weight", path)?;
    let (defaults, unc) = parse_settings(&root, path)?;
    let msr = parse_mag_scaling(&root, path)?;

    let mut builder = FaultSourceSet::builder(name, weight, gmms, msr);
    for source in root.children_named("Source") {
        builder = builder.source(parse_fault_source(source, &defaults, &unc, weight, msr, path)?);
    }
    root.check(path, builder.build())
}

/// Parse an `<InterfaceSourceSet>` document.
pub fn parse_interface_source_set(
    xml: &str,
    path: &str,
    gmms: Arc<GmmSet>,
) -> ForecastResult<InterfaceSourceSet> {
    let root = parse_tree(xml, path)?;
    if root.name != "InterfaceSourceSet" {
        return Err(root.err(path, "expected <InterfaceSourceSet> root"));
    }
    let name = root.req_attr("name", path)?;
    let weight = root.req_f64("weight", path)?;
    let (defaults, unc) = parse_settings(&root, path)?;
    let msr = parse_mag_scaling(&root, path)?;

    let mut builder = InterfaceSourceSet::builder(name, weight, gmms, msr);
    for source in root.children_named("Source") {
        let src_name = source.req_attr("name", path)?;
        let geometry = source.req_child("Geometry", path)?;
        let upper_node = source.req_child("Trace", path)?;
        let lower_node = source.req_child("LowerTrace", path)?;
        let upper = parse_trace(&upper_node.text).map_err(|e| upper_node.err(path, e))?;
        let lower = parse_trace(&lower_node.text).map_err(|e| lower_node.err(path, e))?;

        let mut mfds = Vec::new();
        for mfd_node in source.children_named("MagFreqDist") {
            mfds.extend(build_mfds(&defaults, mfd_node, weight, &unc, path)?);
        }

        let src = InterfaceSource::builder()
            .name(src_name)
            .upper_trace(upper)
            .lower_trace(lower)
            .rake(geometry.req_f64("rake", path)?)
            .mfds(mfds)
            .mag_scaling(msr)
            .build();
        builder = builder.source(source.check(path, src)?);
    }
    root.check(path, builder.build())
}

/// Parse a `<ClusterSourceSet>` document. Each `<Cluster>` carries a
/// SINGLE MFD giving the cluster rate and wraps fault-grammar sources
/// restricted to SINGLE MFDs.
pub fn parse_cluster_source_set(
    xml: &str,
    path: &str,
    gmms: Arc<GmmSet>,
) -> ForecastResult<ClusterSourceSet> {
    let root = parse_tree(xml, path)?;
    if root.name != "ClusterSourceSet" {
        return Err(root.err(path, "expected <ClusterSourceSet> root"));
    }
    let name = root.req_attr("name", path)?;
    let weight = root.req_f64("weight", path)?;
    let (defaults, _) = parse_settings(&root, path)?;
    // clusters do not branch magnitudes
    let unc = MagUncertainty::none();
    let msr = match root.child("SourceProperties") {
        Some(props) => {
            let raw = props.req_attr("magScaling", path)?;
            MagScalingType::from_str(raw).map_err(|e| props.err(path, e))?
        }
        None => MagScalingType::Wc94Length,
    };

    let mut builder = ClusterSourceSet::builder(name, weight, gmms.clone());
    for cluster_node in root.children_named("Cluster") {
        let cluster_name = cluster_node.req_attr("name", path)?;
        let cluster_weight = cluster_node.req_f64("weight", path)?;
        let rate_node = cluster_node.req_child("MagFreqDist", path)?;
        if rate_node.attr("type") != Some("SINGLE") {
            return Err(rate_node.err(path, "cluster rate requires a SINGLE MFD"));
        }
        let rate = rate_node.req_f64("a", path)?;

        let mut faults = FaultSourceSet::builder(cluster_name, cluster_weight, gmms.clone(), msr);
        for source in cluster_node.children_named("Source") {
            for mfd_node in source.children_named("MagFreqDist") {
                let merged = merged_attrs(&defaults, mfd_node);
                if merged.get("type").map(String::as_str) != Some("SINGLE") {
                    return Err(mfd_node.err(path, "cluster sources accept only SINGLE MFDs"));
                }
            }
            faults = faults.source(parse_fault_source(
                source,
                &defaults,
                &unc,
                weight * cluster_weight,
                msr,
                path,
            )?);
        }
        let faults = cluster_node.check(path, faults.build())?;
        let cluster = cluster_node.check(path, ClusterSource::new(cluster_name, rate, faults))?;
        builder = builder.source(cluster);
    }
    root.check(path, builder.build())
}

// ---------------------------------------------------------------------
// grid / slab
// ---------------------------------------------------------------------

/// Parse a `<GridSourceSet>` document into a grid or slab source set,
/// per `source_type`.
pub fn parse_grid_source_set(
    xml: &str,
    path: &str,
    gmms: Arc<GmmSet>,
    source_type: SourceType,
) -> ForecastResult<GridSourceSet> {
    let root = parse_tree(xml, path)?;
    if root.name != "GridSourceSet" {
        return Err(root.err(path, "expected <GridSourceSet> root"));
    }
    let name = root.req_attr("name", path)?;
    let weight = root.req_f64("weight", path)?;
    let (defaults, _) = parse_settings(&root, path)?;

    let props = root.req_child("SourceProperties", path)?;
    let raw_depth_map = props.req_attr("magDepthMap", path)?;
    let entries = parse_mag_depth_map(raw_depth_map).map_err(|e| props.err(path, e))?;
    let mag_depth_map = props.check(path, MagDepthMap::new(entries))?;
    let raw_mechs = props.req_attr("focalMechMap", path)?;
    let (ss, rev, nor) = parse_focal_mech_map(raw_mechs).map_err(|e| props.err(path, e))?;
    let mechs = props.check(path, FocalMechMap::new(ss, rev, nor))?;
    let strike = props.opt_f64("strike", path)?;

    let mut builder = GridSourceSet::builder(name, weight, gmms, source_type)
        .mag_depth_map(mag_depth_map)
        .mechs(mechs)
        .strike(strike)
        // intraslab sources are deep; they use degenerate point surfaces
        .finite(source_type != SourceType::Slab);

    for node in root.children_named("Node") {
        let loc_list = parse_trace(&node.text).map_err(|e| node.err(path, e))?;
        let loc = *loc_list
            .first()
            .ok_or_else(|| node.err(path, "empty node location"))?;
        let mfds = build_mfds(&defaults, node, weight, &MagUncertainty::none(), path)?;
        let mfd = mfds
            .into_iter()
            .next()
            .ok_or_else(|| node.err(path, "node MFD expanded to no distributions"))?;
        let node_mechs = match node.attr("focalMechMap") {
            Some(raw) => {
                let (ss, rev, nor) = parse_focal_mech_map(raw).map_err(|e| node.err(path, e))?;
                Some(node.check(path, FocalMechMap::new(ss, rev, nor))?)
            }
            None => None,
        };
        builder = builder.node(loc, mfd, node_mechs);
    }
    root.check(path, builder.build())
}

// ---------------------------------------------------------------------
// indexed system
// ---------------------------------------------------------------------

/// Parse the two-file indexed source set: `fault_sections.xml`
/// (geometry per section) and `fault_ruptures.xml` (per-rupture section
/// indices and scalar properties).
pub fn parse_system_source_set(
    sections_xml: &str,
    sections_path: &str,
    ruptures_xml: &str,
    ruptures_path: &str,
    gmms: Arc<GmmSet>,
) -> ForecastResult<SystemSourceSet> {
    let sections_root = parse_tree(sections_xml, sections_path)?;
    if sections_root.name != "SystemFaultSections" {
        return Err(sections_root.err(sections_path, "expected <SystemFaultSections> root"));
    }

    let mut sections: Vec<(usize, crate::surface::GriddedSurface)> = Vec::new();
    for section in sections_root.children_named("Section") {
        let index = section.req_f64("index", sections_path)? as usize;
        let geometry = section.req_child("Geometry", sections_path)?;
        let trace_node = section.req_child("Trace", sections_path)?;
        let trace =
            parse_trace(&trace_node.text).map_err(|e| trace_node.err(sections_path, e))?;
        let dip = geometry.req_f64("dip", sections_path)?;
        let width = geometry.req_f64("width", sections_path)?;
        let surface = section.check(
            sections_path,
            crate::surface::GriddedSurface::from_trace(&trace, dip, width, 1.0),
        )?;
        sections.push((index, surface));
    }
    sections.sort_by_key(|(i, _)| *i);

    let ruptures_root = parse_tree(ruptures_xml, ruptures_path)?;
    if ruptures_root.name != "SystemRuptureSet" {
        return Err(ruptures_root.err(ruptures_path, "expected <SystemRuptureSet> root"));
    }
    let name = ruptures_root.req_attr("name", ruptures_path)?;
    let weight = ruptures_root.req_f64("weight", ruptures_path)?;

    let mut builder = SystemSourceSet::builder(name, weight, gmms);
    for (_, surface) in sections {
        builder = builder.section(surface);
    }
    for rupture in ruptures_root.children_named("Rupture") {
        let indices = parse_index_ranges(rupture.req_attr("indices", ruptures_path)?)
            .map_err(|e| rupture.err(ruptures_path, e))?;
        builder = builder.rupture(
            indices,
            rupture.req_f64("mag", ruptures_path)?,
            rupture.req_f64("rate", ruptures_path)? * weight,
            rupture.req_f64("depth", ruptures_path)?,
            rupture.req_f64("dip", ruptures_path)?,
            rupture.req_f64("width", ruptures_path)?,
            rupture.req_f64("rake", ruptures_path)?,
        );
    }
    ruptures_root.check(ruptures_path, builder.build())
}

// ---------------------------------------------------------------------
// gmm.xml
// ---------------------------------------------------------------------

/// Parse a `<GroundMotionModels>` document: one or two distance-banded
/// `<ModelSet>`s with `<Model id weight>` children and an optional
/// `<Uncertainty values weights>`.
pub fn parse_gmm_set(xml: &str, path: &str) -> ForecastResult<GmmSet> {
    let root = parse_tree(xml, path)?;
    if root.name != "GroundMotionModels" {
        return Err(root.err(path, "expected <GroundMotionModels> root"));
    }

    let model_sets: Vec<&XmlNode> = root.children_named("ModelSet").collect();
    if model_sets.is_empty() || model_sets.len() > 2 {
        return Err(root.err(
            path,
            format!("expected 1 or 2 <ModelSet> elements, found {}", model_sets.len()),
        ));
    }

    let mut maps: Vec<(BTreeMap<Gmm, f64>, f64)> = Vec::new();
    for set in &model_sets {
        let max_distance = set.req_f64("maxDistance", path)?;
        let mut map = BTreeMap::new();
        for model in set.children_named("Model") {
            let id = model.req_attr("id", path)?;
            let gmm = Gmm::from_str(id).map_err(|e| model.err(path, e))?;
            map.insert(gmm, model.req_f64("weight", path)?);
        }
        if map.is_empty() {
            return Err(set.err(path, "empty <ModelSet>"));
        }
        maps.push((map, max_distance));
    }

    // primary is the shorter-distance set
    maps.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut iter = maps.into_iter();
    let Some((primary, primary_dist)) = iter.next() else {
        return Err(root.err(path, "no <ModelSet> elements"));
    };

    let mut builder = GmmSet::builder(primary, primary_dist);
    if let Some((secondary, secondary_dist)) = iter.next() {
        builder = builder.secondary(secondary, secondary_dist);
    }
    if let Some(unc) = root.child("Uncertainty") {
        let values = parse_double_array(unc.req_attr("values", path)?)
            .map_err(|e| unc.err(path, e))?;
        let weights = parse_double_array(unc.req_attr("weights", path)?)
            .map_err(|e| unc.err(path, e))?;
        builder = builder.uncertainty(unc.check(path, GmmUncertainty::new(values, weights))?);
    }
    root.check(path, builder.build())
}
