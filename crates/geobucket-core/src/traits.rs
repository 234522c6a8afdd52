// crates/geobucket-core/src/traits.rs
use crate::error::Result;
use crate::grid::GeoPoint;
use crate::model::{BucketId, BucketKey, GeoBucket, InsertOutcome, NewBucket};
use crate::similarity::Similarity;
use std::cmp::Ordering;

/// Result of a conditional alias append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasAppend {
    Appended,
    AlreadyPresent,
    /// The bucket row no longer exists.
    Missing,
}

/// A bucket scored by the fuzzy stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBucket {
    pub id: BucketId,
    pub bucket_key: BucketKey,
    /// Best score over the canonical name and every alias.
    pub score: f64,
}

/// A bucket found by the proximity stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyBucket {
    pub id: BucketId,
    pub bucket_key: BucketKey,
    pub distance_m: f64,
}

/// Persistence contract the registry and match engine are written against.
///
/// Every mutation is a single store-level atomic step. Callers never load a
/// row, change it and write it back.
///
/// Implementations must keep `bucket_key` unique: of any number of
/// concurrent [`BucketStore::insert_if_absent`] calls for one key, exactly
/// one returns [`InsertOutcome::Inserted`]. For stores shared between
/// processes that guarantee has to come from the store itself, not from a
/// lock in this process.
pub trait BucketStore: Send + Sync {
    /// Insert a fresh bucket unless one with the same key exists.
    fn insert_if_absent(&self, draft: &NewBucket) -> Result<InsertOutcome>;

    fn find_by_key(&self, key: &BucketKey) -> Result<Option<GeoBucket>>;

    fn get(&self, id: BucketId) -> Result<Option<GeoBucket>>;

    /// Append `alias` to the bucket's alias list unless it is already there.
    fn append_alias(&self, id: BucketId, alias: &str) -> Result<AliasAppend>;

    /// Add `delta` to `listing_count` in one step and return the new value.
    ///
    /// `Ok(None)` when the bucket does not exist. A delta that would drive
    /// the count below zero is rejected with
    /// [`crate::GeoBucketError::InvalidData`].
    fn adjust_listing_count(&self, id: BucketId, delta: i64) -> Result<Option<u64>>;

    /// Remove the bucket if, and only if, `listing_count == 0`.
    ///
    /// Must be atomic with respect to [`BucketStore::insert_if_absent`] on
    /// the same key.
    fn delete_if_empty(&self, id: BucketId) -> Result<bool>;

    /// Buckets whose canonical name equals `name`, ignoring case.
    fn find_by_canonical_name(&self, name: &str) -> Result<Vec<GeoBucket>>;

    /// Buckets whose alias list contains `alias` exactly.
    fn find_by_alias(&self, alias: &str) -> Result<Vec<GeoBucket>>;

    fn all_buckets(&self) -> Result<Vec<GeoBucket>>;

    /// Buckets whose best similarity to `query` is strictly above
    /// `threshold`, best first, ties by key.
    fn similar_to(
        &self,
        query: &str,
        threshold: f64,
        similarity: &dyn Similarity,
    ) -> Result<Vec<ScoredBucket>> {
        let mut out: Vec<ScoredBucket> = self
            .all_buckets()?
            .into_iter()
            .filter_map(|b| {
                let score = b
                    .names()
                    .map(|name| similarity.score(query, name))
                    .fold(0.0_f64, f64::max);
                (score > threshold).then(|| ScoredBucket {
                    id: b.id,
                    bucket_key: b.bucket_key,
                    score,
                })
            })
            .collect();
        sort_scored(&mut out);
        Ok(out)
    }

    /// Buckets whose centroid lies within `radius_m` meters of `point`,
    /// nearest first, ties by key.
    fn within_radius(&self, point: GeoPoint, radius_m: f64) -> Result<Vec<NearbyBucket>> {
        let mut out: Vec<NearbyBucket> = self
            .all_buckets()?
            .into_iter()
            .filter_map(|b| {
                let distance_m = point.distance_m(&b.centroid);
                (distance_m <= radius_m).then(|| NearbyBucket {
                    id: b.id,
                    bucket_key: b.bucket_key,
                    distance_m,
                })
            })
            .collect();
        sort_nearby(&mut out);
        Ok(out)
    }
}

pub(crate) fn sort_scored(hits: &mut [ScoredBucket]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.bucket_key.cmp(&b.bucket_key))
    });
}

pub(crate) fn sort_nearby(hits: &mut [NearbyBucket]) {
    hits.sort_by(|a, b| {
        a.distance_m
            .partial_cmp(&b.distance_m)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.bucket_key.cmp(&b.bucket_key))
    });
}

impl<S: BucketStore + ?Sized> BucketStore for std::sync::Arc<S> {
    fn insert_if_absent(&self, draft: &NewBucket) -> Result<InsertOutcome> {
        (**self).insert_if_absent(draft)
    }
    fn find_by_key(&self, key: &BucketKey) -> Result<Option<GeoBucket>> {
        (**self).find_by_key(key)
    }
    fn get(&self, id: BucketId) -> Result<Option<GeoBucket>> {
        (**self).get(id)
    }
    fn append_alias(&self, id: BucketId, alias: &str) -> Result<AliasAppend> {
        (**self).append_alias(id, alias)
    }
    fn adjust_listing_count(&self, id: BucketId, delta: i64) -> Result<Option<u64>> {
        (**self).adjust_listing_count(id, delta)
    }
    fn delete_if_empty(&self, id: BucketId) -> Result<bool> {
        (**self).delete_if_empty(id)
    }
    fn find_by_canonical_name(&self, name: &str) -> Result<Vec<GeoBucket>> {
        (**self).find_by_canonical_name(name)
    }
    fn find_by_alias(&self, alias: &str) -> Result<Vec<GeoBucket>> {
        (**self).find_by_alias(alias)
    }
    fn all_buckets(&self) -> Result<Vec<GeoBucket>> {
        (**self).all_buckets()
    }
    fn similar_to(
        &self,
        query: &str,
        threshold: f64,
        similarity: &dyn Similarity,
    ) -> Result<Vec<ScoredBucket>> {
        (**self).similar_to(query, threshold, similarity)
    }
    fn within_radius(&self, point: GeoPoint, radius_m: f64) -> Result<Vec<NearbyBucket>> {
        (**self).within_radius(point, radius_m)
    }
}
