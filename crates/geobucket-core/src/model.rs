// crates/geobucket-core/src/model.rs
use crate::grid::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a [`GeoBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketId(pub u64);

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grid-cell identifier, e.g. `"6.470_3.630"`.
///
/// Only [`crate::grid::quantize`] produces these from coordinates; the
/// ordering is plain string ordering and is used as the deterministic
/// tie-breaker in the match cascade.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey(String);

impl BucketKey {
    pub(crate) fn from_cell(lat: f64, lng: f64) -> Self {
        BucketKey(format!("{lat:.3}_{lng:.3}"))
    }

    /// Rehydrate a key read back from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        BucketKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A grid cell that owns every listing whose coordinates quantize into it.
///
/// `bucket_key`, `canonical_name` and `centroid` never change after
/// creation. `aliases` only grows and always starts with `canonical_name`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBucket {
    pub id: BucketId,
    pub bucket_key: BucketKey,
    pub canonical_name: String,
    pub centroid: GeoPoint,
    pub aliases: Vec<String>,
    pub listing_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GeoBucket {
    pub(crate) fn from_draft(id: BucketId, draft: NewBucket, now: DateTime<Utc>) -> Self {
        GeoBucket {
            id,
            aliases: vec![draft.canonical_name.clone()],
            bucket_key: draft.bucket_key,
            canonical_name: draft.canonical_name,
            centroid: draft.centroid,
            listing_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.canonical_name
    }

    pub fn key(&self) -> &BucketKey {
        &self.bucket_key
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a == name)
    }

    /// Canonical name followed by every alias, without repeating the canonical one.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(
            self.aliases
                .iter()
                .map(String::as_str)
                .filter(move |a| *a != self.canonical_name),
        )
    }

    /// Read-only projection used for reporting.
    pub fn describe(&self) -> BucketStats {
        BucketStats::from(self)
    }
}

/// Everything a store needs to insert a brand-new bucket row.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBucket {
    pub bucket_key: BucketKey,
    pub canonical_name: String,
    pub centroid: GeoPoint,
}

/// Outcome of an insert-if-absent on the unique bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(BucketId),
    /// Another writer owns the key already.
    Conflict,
}

/// Field projection of one bucket, returned by `describe`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub id: BucketId,
    pub bucket_key: BucketKey,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub listing_count: u64,
    pub centroid_lat: f64,
    pub centroid_lng: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&GeoBucket> for BucketStats {
    fn from(b: &GeoBucket) -> Self {
        BucketStats {
            id: b.id,
            bucket_key: b.bucket_key.clone(),
            canonical_name: b.canonical_name.clone(),
            aliases: b.aliases.clone(),
            listing_count: b.listing_count,
            centroid_lat: b.centroid.lat(),
            centroid_lng: b.centroid.lng(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Aggregate statistics over every bucket in a store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_buckets: usize,
    pub total_listings: u64,
    /// Rounded to two decimals; `0.0` for an empty store.
    pub avg_listings_per_bucket: f64,
    /// Ordered by bucket key.
    pub buckets: Vec<BucketStats>,
}

impl RegistryStats {
    pub fn from_buckets(mut buckets: Vec<GeoBucket>) -> Self {
        buckets.sort_by(|a, b| a.bucket_key.cmp(&b.bucket_key));
        let total_buckets = buckets.len();
        let total_listings: u64 = buckets.iter().map(|b| b.listing_count).sum();
        let avg = if total_buckets == 0 {
            0.0
        } else {
            total_listings as f64 / total_buckets as f64
        };
        RegistryStats {
            total_buckets,
            total_listings,
            avg_listings_per_bucket: (avg * 100.0).round() / 100.0,
            buckets: buckets.iter().map(BucketStats::from).collect(),
        }
    }
}

/// A listing as kept by the caller layer. Only `geo_bucket_id` ties it to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: u64,
    pub title: String,
    /// Location name exactly as entered.
    pub location_name_raw: String,
    pub lat: f64,
    pub lng: f64,
    pub geo_bucket_id: BucketId,
    pub created_at: DateTime<Utc>,
}

/// Input record for seeding, as stored in `data/seed.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedListing {
    pub title: String,
    pub location_name: String,
    pub lat: f64,
    pub lng: f64,
}
