use clap::Parser;

/// Input command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CmdArgs {
    /// Forecast to load: a directory tree or a .zip archive.
    #[arg(short, long)]
    pub forecast: String,

    /// Site coordinates e.g. --site -118.25 34.05.
    ///
    /// Lists the ruptures within range of the site.
    #[arg(short, long, num_args = 2, value_names = ["lon", "lat"])]
    pub site: Option<Vec<f64>>,

    /// Input CSV file of sites (lon, lat, optional name).
    ///
    /// Each site produces a rupture listing like `--site`.
    #[arg(long)]
    pub sites_file: Option<String>,

    /// Override the maximum source-to-site distance in km.
    ///
    /// Defaults to each source set's GMM distance cutoff.
    #[arg(short, long)]
    pub max_distance: Option<f64>,

    /// Output CSV file for per-set summary rows.
    #[arg(long)]
    pub summary_out: Option<String>,

    /// Output CSV file for the site rupture listing.
    ///
    /// Defaults to `out_ruptures.txt` when a site is given.
    #[arg(short, long, default_value = "out_ruptures.txt")]
    pub out_file: String,

    /// Delimiter character for input and output CSV files.
    ///
    /// Defaults to tab (`'\t'`).
    #[arg(short, long, default_value = "\t")]
    pub delimeter: char,
}
