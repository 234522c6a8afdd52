//! geobucket: command-line interface for geobucket-core
//!
//! Keeps buckets and listings in a snapshot file between runs and exposes
//! the engine's operations as subcommands.
//!
//! Usage examples
//! --------------
//!
//! - Seed the bundled Lagos listings
//!   $ geobucket seed
//!
//! - Add a listing
//!   $ geobucket add --title "2 bed flat" --location "Sangotedo, Ajah" --lat 6.4712 --lng 3.6293
//!
//! - Search by name, with an optional coordinate for the proximity fallback
//!   $ geobucket search sangotedo
//!   $ geobucket search "lekki" --lat 6.437 --lng 3.470
//!
//! - Inspect buckets
//!   $ geobucket show 1
//!   $ geobucket stats --json
mod args;

use crate::args::{CliArgs, Commands};
use anyhow::Context;
use clap::Parser;
use geobucket_core::loader::{load_seed_file, parse_seed};
use geobucket_core::{
    BucketId, BucketStats, GeoBucketConfig, GeoBuckets, GeoPoint, Listing, MemoryStore,
    SeedListing, Snapshot,
};
use std::path::Path;
use tracing::Level;

const BUILTIN_SEED: &str = include_str!("../../geobucket-core/data/seed.json");

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref())?;
    let snapshot = Snapshot::load_or_default(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let mut next_id = snapshot.next_listing_id();
    let (store, mut listings) = snapshot.into_store()?;
    let svc = GeoBuckets::new(store, config)?;

    match args.command {
        Commands::Seed { file } => {
            let seed: Vec<SeedListing> = match file {
                Some(path) => load_seed_file(&path)?,
                None => parse_seed(BUILTIN_SEED)?,
            };
            for item in &seed {
                let listing =
                    svc.create_listing(next_id, &item.title, &item.location_name, item.lat, item.lng)?;
                next_id += 1;
                listings.push(listing);
            }
            save(&svc, listings, &args.snapshot)?;
            println!("Seeded {} listings.", seed.len());
        }

        Commands::Add {
            title,
            location,
            lat,
            lng,
        } => {
            let listing = svc.create_listing(next_id, &title, &location, lat, lng)?;
            println!(
                "Listing {} -> bucket {}",
                listing.id, listing.geo_bucket_id
            );
            print_bucket(&svc.describe(listing.geo_bucket_id)?);
            listings.push(listing);
            save(&svc, listings, &args.snapshot)?;
        }

        Commands::Search { query, lat, lng } => {
            let near = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)?),
                _ => None,
            };
            let found = svc.search_listings(&listings, &query, near)?;
            match &found.bucket {
                Some(bucket) => print_bucket(bucket),
                None => println!("No location matches: {query}"),
            }
            for listing in &found.listings {
                print_listing(listing);
            }
        }

        Commands::Show { bucket_id } => {
            print_bucket(&svc.describe(BucketId(bucket_id))?);
        }

        Commands::Stats { json } => {
            let stats = svc.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Geo bucket statistics:");
                println!("  Buckets: {}", stats.total_buckets);
                println!("  Listings: {}", stats.total_listings);
                println!("  Avg listings/bucket: {:.2}", stats.avg_listings_per_bucket);
                for b in &stats.buckets {
                    println!(
                        "  {} {:<24} {:>4} listing(s), {} alias(es)",
                        b.bucket_key,
                        b.canonical_name,
                        b.listing_count,
                        b.aliases.len()
                    );
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GeoBucketConfig> {
    let base = match path {
        Some(p) => GeoBucketConfig::from_json_path(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => GeoBucketConfig::default(),
    };
    Ok(base.with_env_overrides()?)
}

fn save(svc: &GeoBuckets<MemoryStore>, listings: Vec<Listing>, path: &Path) -> anyhow::Result<()> {
    Snapshot::capture(svc.store(), listings)
        .save(path)
        .with_context(|| format!("writing snapshot {}", path.display()))
}

fn print_bucket(b: &BucketStats) {
    println!("Bucket {} [{}]", b.id, b.bucket_key);
    println!("  Name: {}", b.canonical_name);
    println!("  Aliases: {}", b.aliases.join(", "));
    println!("  Listings: {}", b.listing_count);
    println!("  Centroid: {:.3}, {:.3}", b.centroid_lat, b.centroid_lng);
}

fn print_listing(l: &Listing) {
    println!(
        "- #{} {} ({}) @ {:.4}, {:.4}",
        l.id, l.title, l.location_name_raw, l.lat, l.lng
    );
}
