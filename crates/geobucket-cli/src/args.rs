use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for geobucket
#[derive(Debug, Parser)]
#[command(
    name = "geobucket",
    version,
    about = "Normalize, bucket and search property listing locations"
)]
pub struct CliArgs {
    /// Snapshot file holding buckets and listings between runs
    #[arg(short = 's', long = "snapshot", global = true, default_value = "geobucket.bin")]
    pub snapshot: PathBuf,

    /// Optional JSON config file (grid_size, fuzzy_threshold, stop_words, ...)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Assign the built-in Lagos seed listings (or a JSON file of them)
    Seed {
        /// JSON array of {title, location_name, lat, lng}
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },

    /// Create one listing
    Add {
        #[arg(long)]
        title: String,
        /// Location name as a user would type it (e.g. "Sangotedo, Ajah")
        #[arg(long)]
        location: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Find listings by location name, optionally near a coordinate
    Search {
        query: String,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Show one bucket
    Show {
        /// Numeric bucket id
        bucket_id: u64,
    },

    /// Show aggregate bucket statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
