// crates/geobucket-core/tests/scenario.rs
use geobucket_core::{
    GeoBucketConfig, GeoBuckets, GeoPoint, Listing, MatchStage, MemoryStore,
};

fn service() -> GeoBuckets<MemoryStore> {
    GeoBuckets::new(MemoryStore::new(), GeoBucketConfig::default()).unwrap()
}

fn seed(svc: &GeoBuckets<MemoryStore>) -> Vec<Listing> {
    [
        ("3 bed flat", "Sangotedo", 6.4698, 3.6285),
        ("Terrace duplex", "Sangotedo, Ajah", 6.4720, 3.6301),
        ("Mini flat", "sangotedo lagos", 6.4705, 3.6290),
        ("Office space", "Lekki Phase 1", 6.4371, 3.4698),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (title, location, lat, lng))| {
        svc.create_listing(i as u64 + 1, title, location, lat, lng)
            .unwrap()
    })
    .collect()
}

#[test]
fn sangotedo_variants_share_one_bucket() {
    let svc = service();
    let listings = seed(&svc);

    let sango = listings[0].geo_bucket_id;
    assert!(listings[..3].iter().all(|l| l.geo_bucket_id == sango));
    assert_ne!(listings[3].geo_bucket_id, sango);

    let bucket = svc.describe(sango).unwrap();
    assert_eq!(bucket.bucket_key.as_str(), "6.470_3.630");
    assert_eq!(bucket.canonical_name, "sangotedo");
    assert_eq!(bucket.aliases, vec!["sangotedo", "ajah sangotedo"]);
    assert_eq!(bucket.listing_count, 3);
}

#[test]
fn every_spelling_finds_all_three_listings() {
    let svc = service();
    let listings = seed(&svc);

    for query in ["sangotedo", "SANGOTEDO", "Sangotedo, Lagos", "ajah sangotedo", "Sangotedu"] {
        let found = svc.search_listings(&listings, query, None).unwrap();
        let mut ids: Vec<u64> = found.listings.iter().map(|l| l.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3], "query {query:?}");
        assert_eq!(found.bucket.unwrap().listing_count, 3);
    }
}

#[test]
fn stages_are_reported() {
    let svc = service();
    seed(&svc);

    let stage = |q: &str, near: Option<GeoPoint>| svc.resolve_detailed(q, near).unwrap().stage;
    assert_eq!(stage("Sangotedo", None), Some(MatchStage::Exact));
    assert_eq!(stage("Ajah Sangotedo", None), Some(MatchStage::Alias));
    assert_eq!(stage("sangotedoo", None), Some(MatchStage::Fuzzy));
    assert_eq!(stage("xqzwvk", None), None);
    let near_lekki = GeoPoint::new(6.4360, 3.4710).unwrap();
    assert_eq!(stage("xqzwvk", Some(near_lekki)), Some(MatchStage::Proximity));
}

#[test]
fn heavy_misspelling_matches_nothing() {
    let svc = service();
    seed(&svc);
    assert!(svc.resolve("Sxngxtxdx", None).unwrap().is_empty());
}

#[test]
fn proximity_respects_radius() {
    let svc = service();
    let listings = seed(&svc);
    let lekki = listings[3].geo_bucket_id;

    // Centroid is 6.435/3.470; ~200 m away.
    let inside = GeoPoint::new(6.4368, 3.4700).unwrap();
    assert_eq!(svc.resolve("nowhere at all", Some(inside)).unwrap(), vec![lekki]);

    // ~1.1 km away.
    let outside = GeoPoint::new(6.4450, 3.4700).unwrap();
    assert!(svc.resolve("nowhere at all", Some(outside)).unwrap().is_empty());
}

#[test]
fn stats_after_seed() {
    let svc = service();
    seed(&svc);
    let stats = svc.stats().unwrap();
    assert_eq!(stats.total_buckets, 2);
    assert_eq!(stats.total_listings, 4);
    assert_eq!(stats.avg_listings_per_bucket, 2.0);
    let keys: Vec<&str> = stats.buckets.iter().map(|b| b.bucket_key.as_str()).collect();
    assert_eq!(keys, vec!["6.435_3.470", "6.470_3.630"]);
}

#[test]
fn releasing_every_listing_reaps_the_bucket() {
    let svc = service();
    let listings = seed(&svc);
    let lekki = listings[3].geo_bucket_id;

    let released = svc.release(lekki).unwrap();
    assert!(released.deleted);
    assert!(svc.describe(lekki).is_err());
    assert_eq!(svc.stats().unwrap().total_buckets, 1);
}
