//! Walk through the Sangotedo scenario end to end.
//!
//! Run with: cargo run --example sangotedo

use geobucket_rs::{GeoBucketConfig, GeoBuckets, GeoPoint, MemoryStore};
use tracing::Level;

fn main() -> geobucket_rs::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let svc = GeoBuckets::new(MemoryStore::new(), GeoBucketConfig::default())?;

    let listings = vec![
        svc.create_listing(1, "3 Bedroom Flat", "Sangotedo", 6.4698, 3.6285)?,
        svc.create_listing(2, "Terrace Duplex", "Sangotedo, Ajah", 6.4720, 3.6301)?,
        svc.create_listing(3, "Mini Flat", "sangotedo lagos", 6.4705, 3.6290)?,
        svc.create_listing(4, "Office Space", "Lekki Phase 1", 6.4371, 3.4698)?,
    ];

    for query in ["sangotedo", "SANGOTEDO", "Sangotedo, Lagos", "Ajah Sangotedo", "Sangotedu"] {
        let found = svc.search_listings(&listings, query, None)?;
        let ids: Vec<u64> = found.listings.iter().map(|l| l.id).collect();
        println!("{query:<20} -> listings {ids:?}");
    }

    let near_lekki = GeoPoint::new(6.4368, 3.4700)?;
    let r = svc.resolve_detailed("somewhere unknown", Some(near_lekki))?;
    println!("proximity fallback    -> {:?} via {:?}", r.bucket_ids, r.stage);

    let stats = svc.stats()?;
    println!(
        "{} buckets, {} listings, {:.2} per bucket",
        stats.total_buckets, stats.total_listings, stats.avg_listings_per_bucket
    );
    for b in stats.buckets {
        println!("  {} {:?} x{}", b.bucket_key, b.aliases, b.listing_count);
    }
    Ok(())
}
