mod cmd_args;

use clap::Parser;
use hazard_forecast_lib::geodesy::Location;
use hazard_forecast_lib::loader;
use hazard_forecast_lib::model::{HazardModel, SourceSets};
use hazard_forecast_lib::readers::read_sites;
use hazard_forecast_lib::vectorized::{aggregate_rupture_distances, calc_section_distances};
use hazard_forecast_lib::writers::{write_rupture_records, write_summary, RuptureRecord};

use crate::cmd_args::CmdArgs;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cmd_args = CmdArgs::parse();

    let model = loader::load(&cmd_args.forecast)?;
    println!("{}", model.summary());

    if let Some(ref out) = cmd_args.summary_out {
        println!("Write summary to {out}...");
        write_summary(out, cmd_args.delimeter as u8, &model.summary())?;
    }

    let mut sites: Vec<(Option<String>, Location)> = Vec::new();
    if let Some(ref coords) = cmd_args.site {
        sites.push((None, Location::surface(coords[1], coords[0])));
    }
    if let Some(ref sites_file) = cmd_args.sites_file {
        println!("Use {sites_file} as site list...");
        for site in read_sites(sites_file, cmd_args.delimeter as u8)? {
            sites.push((site.name.clone(), site.location()));
        }
    }

    if !sites.is_empty() {
        let mut records = Vec::new();
        for (name, site) in &sites {
            let found = collect_records(&model, site, cmd_args.max_distance, &mut records);
            match name {
                Some(n) => println!("{n}: {found} ruptures in range"),
                None => println!(
                    "({:.3}, {:.3}): {found} ruptures in range",
                    site.lon, site.lat
                ),
            }
        }
        let out_file = &cmd_args.out_file;
        println!("Write rupture listing to {out_file}...");
        write_rupture_records(out_file, cmd_args.delimeter as u8, &records)?;
        println!("Done");
    }

    Ok(())
}

/// Collect the rupture listing for one site across every source set,
/// returning the number of appended records.
fn collect_records(
    model: &HazardModel,
    site: &Location,
    max_distance: Option<f64>,
    records: &mut Vec<RuptureRecord>,
) -> usize {
    let start = records.len();
    for set in model.iter() {
        match set {
            SourceSets::Fault(faults) => {
                let d = max_distance.unwrap_or_else(|| faults.gmms().max_dist_hi());
                for source in faults.iter() {
                    if !faults.distance_filter(site, d, source) {
                        continue;
                    }
                    for rupture in source.iter() {
                        let dist = rupture.distances(site);
                        records.push(RuptureRecord {
                            source_set: faults.name().to_string(),
                            source: source.name().to_string(),
                            mag: rupture.mag,
                            rate: rupture.rate,
                            r_jb: dist.r_jb,
                            r_rup: dist.r_rup,
                            r_x: dist.r_x,
                        });
                    }
                }
            }
            SourceSets::Interface(interfaces) => {
                let d = max_distance.unwrap_or_else(|| interfaces.gmms().max_dist_hi());
                for source in interfaces.iter() {
                    if !interfaces.distance_filter(site, d, source) {
                        continue;
                    }
                    for rupture in source.iter() {
                        let dist = rupture.distances(site);
                        records.push(RuptureRecord {
                            source_set: interfaces.name().to_string(),
                            source: source.name().to_string(),
                            mag: rupture.mag,
                            rate: rupture.rate,
                            r_jb: dist.r_jb,
                            r_rup: dist.r_rup,
                            r_x: dist.r_x,
                        });
                    }
                }
            }
            SourceSets::Cluster(clusters) => {
                // cluster hazard combines ruptures jointly; list the
                // wrapped fault ruptures for inspection only
                let d = max_distance.unwrap_or_else(|| clusters.gmms().max_dist_hi());
                for cluster in clusters.iter() {
                    if !clusters.distance_filter(site, d, cluster) {
                        continue;
                    }
                    for source in cluster.faults().iter() {
                        for rupture in source.iter() {
                            let dist = rupture.distances(site);
                            records.push(RuptureRecord {
                                source_set: format!("{} ({})", clusters.name(), cluster.name()),
                                source: source.name().to_string(),
                                mag: rupture.mag,
                                rate: cluster.rate(),
                                r_jb: dist.r_jb,
                                r_rup: dist.r_rup,
                                r_x: dist.r_x,
                            });
                        }
                    }
                }
            }
            SourceSets::Grid(grid) => {
                let d = max_distance.unwrap_or_else(|| grid.gmms().max_dist_hi());
                for source in grid.iter() {
                    if !grid.distance_filter(site, d, source) {
                        continue;
                    }
                    let mut it = source.ruptures();
                    while let Some(rupture) = it.next() {
                        let dist = rupture.distances(site);
                        records.push(RuptureRecord {
                            source_set: grid.name().to_string(),
                            source: format!(
                                "node ({:.3}, {:.3})",
                                source.location().lon,
                                source.location().lat
                            ),
                            mag: rupture.mag,
                            rate: rupture.rate,
                            r_jb: dist.r_jb,
                            r_rup: dist.r_rup,
                            r_x: dist.r_x,
                        });
                    }
                }
            }
            SourceSets::System(system) => {
                let d = max_distance.unwrap_or_else(|| system.gmms().max_dist_hi());
                let bits = system.section_bits_within(site, d);
                let table = calc_section_distances(system, &bits, site);
                for index in system.filtered_indices(&bits) {
                    let rupture = system.rupture(index);
                    let dist = aggregate_rupture_distances(system, index, &table);
                    records.push(RuptureRecord {
                        source_set: system.name().to_string(),
                        source: format!("rupture {index}"),
                        mag: rupture.mag,
                        rate: rupture.rate,
                        r_jb: dist.r_jb,
                        r_rup: dist.r_rup,
                        r_x: dist.r_x,
                    });
                }
            }
        }
    }
    records.len() - start
}
