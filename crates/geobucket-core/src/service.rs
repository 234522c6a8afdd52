// crates/geobucket-core/src/service.rs

//! # Service Facade
//!
//! [`GeoBuckets`] is the entry point for callers: it validates raw input,
//! names listings with the configured [`Normalizer`], and delegates to the
//! [`BucketRegistry`] and [`MatchEngine`] over a shared store.

use crate::config::GeoBucketConfig;
use crate::error::{GeoBucketError, Result};
use crate::grid::GeoPoint;
use crate::model::{BucketId, BucketStats, Listing, RegistryStats};
use crate::registry::{BucketRegistry, Release};
use crate::search::{MatchEngine, Resolution};
use crate::similarity::{Similarity, TrigramSimilarity};
use crate::text::Normalizer;
use crate::traits::BucketStore;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;

/// Listings found for a location query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSearch<'a> {
    /// Stats of the best-ranked matched bucket, if any bucket matched.
    pub bucket: Option<BucketStats>,
    /// Listings in any matched bucket, newest first.
    pub listings: Vec<&'a Listing>,
}

#[derive(Debug)]
pub struct GeoBuckets<S, M = TrigramSimilarity> {
    config: GeoBucketConfig,
    registry: BucketRegistry<S>,
    engine: MatchEngine<M>,
}

impl<S: BucketStore> GeoBuckets<S, TrigramSimilarity> {
    pub fn new(store: S, config: GeoBucketConfig) -> Result<Self> {
        Self::with_similarity(store, config, TrigramSimilarity)
    }
}

impl<S: BucketStore, M: Similarity> GeoBuckets<S, M> {
    /// Build a facade with a custom fuzzy scorer. Fails on invalid config.
    pub fn with_similarity(store: S, config: GeoBucketConfig, similarity: M) -> Result<Self> {
        config.validate()?;
        Ok(GeoBuckets {
            registry: BucketRegistry::new(store, &config),
            engine: MatchEngine::with_similarity(&config, similarity),
            config,
        })
    }

    pub fn config(&self) -> &GeoBucketConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.registry.store()
    }

    pub fn normalizer(&self) -> &Normalizer {
        self.engine.normalizer()
    }

    /// Attach a listing at (`lat`, `lng`) named `raw_name` to its bucket.
    ///
    /// Input is validated before the store is touched.
    pub fn assign_or_create(&self, lat: f64, lng: f64, raw_name: &str) -> Result<BucketId> {
        let point = GeoPoint::new(lat, lng)?;
        let name = self.normalizer().listing_name(raw_name)?;
        self.registry.assign_or_create(point, &name)
    }

    /// Assign a new listing and return the caller-side record for it.
    pub fn create_listing(
        &self,
        id: u64,
        title: &str,
        raw_location: &str,
        lat: f64,
        lng: f64,
    ) -> Result<Listing> {
        let geo_bucket_id = self.assign_or_create(lat, lng, raw_location)?;
        Ok(Listing {
            id,
            title: title.to_string(),
            location_name_raw: raw_location.to_string(),
            lat,
            lng,
            geo_bucket_id,
            created_at: Utc::now(),
        })
    }

    pub fn resolve(&self, raw_query: &str, near: Option<GeoPoint>) -> Result<Vec<BucketId>> {
        self.engine.resolve(self.store(), raw_query, near)
    }

    pub fn resolve_detailed(&self, raw_query: &str, near: Option<GeoPoint>) -> Result<Resolution> {
        self.engine.resolve_detailed(self.store(), raw_query, near)
    }

    pub fn describe(&self, id: BucketId) -> Result<BucketStats> {
        self.store()
            .get(id)?
            .map(|b| b.describe())
            .ok_or(GeoBucketError::NotFound(id))
    }

    /// Detach one listing from bucket `id`.
    pub fn release(&self, id: BucketId) -> Result<Release> {
        self.registry.release(id)
    }

    pub fn stats(&self) -> Result<RegistryStats> {
        Ok(RegistryStats::from_buckets(self.store().all_buckets()?))
    }

    /// Listings located in any bucket matching `raw_query`.
    pub fn search_listings<'a>(
        &self,
        listings: &'a [Listing],
        raw_query: &str,
        near: Option<GeoPoint>,
    ) -> Result<ListingSearch<'a>> {
        let ids = self.resolve(raw_query, near)?;
        let bucket = match ids.first() {
            // A bucket reaped between resolve and here is reported as no stats.
            Some(id) => self.store().get(*id)?.map(|b| b.describe()),
            None => None,
        };

        let wanted: HashSet<BucketId> = ids.into_iter().collect();
        let mut hits: Vec<&Listing> = listings
            .iter()
            .filter(|l| wanted.contains(&l.geo_bucket_id))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(ListingSearch {
            bucket,
            listings: hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn service() -> GeoBuckets<MemoryStore> {
        GeoBuckets::new(MemoryStore::new(), GeoBucketConfig::default()).unwrap()
    }

    #[test]
    fn validation_happens_before_store_access() {
        let svc = service();
        let err = svc.assign_or_create(91.0, 3.6, "sangotedo").unwrap_err();
        assert!(matches!(
            err,
            GeoBucketError::Validation(ValidationError::InvalidLatitude(_))
        ));
        let err = svc.assign_or_create(6.4, 181.0, "sangotedo").unwrap_err();
        assert!(err.is_validation());
        let err = svc.assign_or_create(6.4, 3.6, " ;; ").unwrap_err();
        assert!(matches!(err, GeoBucketError::Validation(ValidationError::EmptyName)));
        assert!(svc.store().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GeoBucketConfig {
            grid_size: 0.0,
            ..GeoBucketConfig::default()
        };
        assert!(matches!(
            GeoBuckets::new(MemoryStore::new(), config),
            Err(GeoBucketError::InvalidConfig(_))
        ));
    }

    #[test]
    fn describe_unknown_bucket_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.describe(BucketId(7)),
            Err(GeoBucketError::NotFound(BucketId(7)))
        ));
    }

    #[test]
    fn search_returns_newest_first_with_bucket_stats() {
        let svc = service();
        let mut a = svc.create_listing(1, "Flat", "Sangotedo", 6.4698, 3.6285).unwrap();
        let b = svc.create_listing(2, "Duplex", "Sangotedo, Ajah", 6.4720, 3.6301).unwrap();
        let c = svc.create_listing(3, "Office", "Lekki Phase 1", 6.4371, 3.4698).unwrap();
        a.created_at = b.created_at - Duration::seconds(10);
        let listings = vec![a, b, c];

        let found = svc.search_listings(&listings, "sangotedo", None).unwrap();
        let ids: Vec<u64> = found.listings.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let bucket = found.bucket.unwrap();
        assert_eq!(bucket.listing_count, 2);
        assert_eq!(bucket.canonical_name, "sangotedo");

        let none = svc.search_listings(&listings, "xqzwvk", None).unwrap();
        assert!(none.bucket.is_none());
        assert!(none.listings.is_empty());
    }

    #[test]
    fn stats_cover_every_bucket() {
        let svc = service();
        svc.assign_or_create(6.4698, 3.6285, "Sangotedo").unwrap();
        svc.assign_or_create(6.4720, 3.6301, "Ajah").unwrap();
        svc.assign_or_create(6.4371, 3.4698, "Lekki Phase 1").unwrap();
        let stats = svc.stats().unwrap();
        assert_eq!(stats.total_buckets, 2);
        assert_eq!(stats.total_listings, 3);
        assert_eq!(stats.avg_listings_per_bucket, 1.5);
    }
}
