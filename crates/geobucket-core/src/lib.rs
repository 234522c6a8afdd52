// crates/geobucket-core/src/lib.rs

pub mod config;
pub mod error;
pub mod grid;
pub mod loader; // Snapshot + seed IO
pub mod model;
pub mod registry; // Find-or-create core
pub mod search; // Match cascade
pub mod service;
pub mod similarity;
pub mod store;
pub mod text;
pub mod traits;

// Re-exports
pub use crate::config::GeoBucketConfig;
pub use crate::error::{GeoBucketError, Result, ValidationError};
pub use crate::grid::{quantize, GeoPoint, GridCell};
pub use crate::loader::Snapshot;
pub use crate::model::{
    BucketId, BucketKey, BucketStats, GeoBucket, InsertOutcome, Listing, NewBucket,
    RegistryStats, SeedListing,
};
pub use crate::registry::{BucketRegistry, Release};
pub use crate::search::{MatchEngine, MatchStage, Resolution};
pub use crate::service::{GeoBuckets, ListingSearch};
pub use crate::similarity::{Similarity, TrigramSimilarity};
pub use crate::store::MemoryStore;
#[cfg(feature = "sqlite")]
pub use crate::store::SqliteStore;
pub use crate::text::{fold_key, Normalizer};
pub use crate::traits::{AliasAppend, BucketStore, NearbyBucket, ScoredBucket};
