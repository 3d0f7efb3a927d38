//! # `hazard_forecast_lib`
//!
//! **A modular Rust library for building and querying probabilistic
//! earthquake rupture forecasts (ERF) from XML source models.**
//!
//! This crate ingests a hierarchical, XML-serialized description of an
//! earthquake rupture forecast and yields an immutable in-memory model
//! from which a hazard calculator can enumerate individual ruptures,
//! their geometry, and their annual rate of occurrence.
//!
//! ## Features
//!
//! - Fault, subduction interface, cluster, gridded-seismicity and
//!   indexed (system) source representations with a shared distance
//!   filter protocol.
//! - Magnitude–frequency distribution factories (Gutenberg–Richter,
//!   single, Gaussian, incremental) with moment balancing and
//!   epistemic/aleatory uncertainty expansion ([`mfd`], [`uncertainty`]).
//! - The floating-rupture generator for sub-fault-surface events
//!   ([`fault`], [`surface`]).
//! - On-the-fly finite-rupture expansion of gridded seismicity with
//!   hanging-wall/footwall duplication and self-consistent distance
//!   metrics ([`grid`], [`pointsource`]).
//! - Bit-set indexed multi-section ruptures with bulk site filtering
//!   ([`system`]) and Rayon-parallel section distances ([`vectorized`]).
//! - A fail-fast forecast loader over directory trees and zip archives
//!   with positioned XML errors ([`loader`], [`parsers`]).
//!
//! ## Module Overview
//!
//! - [`auxilary`] — Supporting constants and utility functions.
//! - [`geodesy`] — Locations, traces, and distance math.
//! - [`magnitudes`] — Moment conversions and range checks.
//! - [`mfd`] — Magnitude–frequency distributions.
//! - [`uncertainty`] — Epistemic/aleatory magnitude uncertainty.
//! - [`msr`] — Magnitude-scaling relations.
//! - [`surface`] — Gridded rupture surfaces and floating subsets.
//! - [`pointsource`] — Point-source surfaces and distance corrections.
//! - [`rupture`] — Ruptures and site distance triples.
//! - [`gmm`] — Ground-motion model assignment.
//! - [`fault`], [`interface`], [`cluster`], [`grid`], [`system`] —
//!   Source and source-set types.
//! - [`sourceset`] — Source-type tags.
//! - [`model`] — The top-level hazard model.
//! - [`parsers`], [`loader`] — Forecast XML parsing and traversal.
//! - [`readers`], [`writers`] — Delimited site input and diagnostic
//!   output.
//! - [`vectorized`] — Parallel distance routines.
//!
//! ## Example
//!
//! ```no_run
//! use hazard_forecast_lib::geodesy::Location;
//! use hazard_forecast_lib::loader;
//! use hazard_forecast_lib::model::SourceSets;
//!
//! let model = loader::load("forecasts/2008-conus").unwrap();
//! println!("{}", model.summary());
//!
//! let site = Location::surface(34.05, -118.25);
//! for set in model.iter() {
//!     if let SourceSets::Fault(faults) = set {
//!         for source in faults.location_sources(&site) {
//!             for rupture in source.iter() {
//!                 let d = rupture.distances(&site);
//!                 println!("{} M{:.1} rRup {:.1} km", source.name(), rupture.mag, d.r_rup);
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Concurrency
//!
//! Construction is single-threaded; a built model is immutable shared
//! state that can be read concurrently. Grid-source rupture iterators
//! reuse a single buffer and are not thread-safe — obtain one per
//! thread, or use the allocating `get(index)` accessor. Section
//! distance fan-out uses [`Rayon`](https://docs.rs/rayon/latest/rayon/)
//! with thread count controlled by `RAYON_NUM_THREADS`.
//!
//! ## Future Work
//!
//! Planned extensions include:
//!
//! - Area source representations
//! - Hazard curve integration over the rupture stream
//! - Disaggregation support
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0
//! ([Apache-2.0](http://www.apache.org/licenses/LICENSE-2.0))
//!
//! ---
//!
//! ```text
//! Copyright 2025 Andrey Stepnov, GEOPHYSTECH LLC
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.
//! ```
//! ---

pub mod auxilary;
pub mod cluster;
pub mod error;
pub mod fault;
pub mod geodesy;
pub mod gmm;
pub mod grid;
pub mod interface;
pub mod loader;
pub mod magnitudes;
pub mod mfd;
pub mod model;
pub mod msr;
pub mod parsers;
pub mod pointsource;
pub mod readers;
pub mod rupture;
pub mod sourceset;
pub mod surface;
pub mod system;
pub mod uncertainty;
pub mod vectorized;
pub mod writers;
