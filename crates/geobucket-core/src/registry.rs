// crates/geobucket-core/src/registry.rs

//! # Bucket Registry
//!
//! Find-or-create of geo buckets. The registry holds no locks of its own:
//! the store's insert-if-absent decides which of several racing creators
//! wins a key, and every loser falls back to the merge path.

use crate::config::GeoBucketConfig;
use crate::error::{GeoBucketError, Result};
use crate::grid::{quantize, GeoPoint, GridCell};
use crate::model::{BucketId, InsertOutcome, NewBucket};
use crate::traits::{AliasAppend, BucketStore};
use tracing::{debug, warn};

/// What `release` did to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub remaining: u64,
    pub deleted: bool,
}

#[derive(Debug)]
pub struct BucketRegistry<S> {
    store: S,
    grid_size: f64,
    max_attempts: u32,
    reap_empty: bool,
}

impl<S: BucketStore> BucketRegistry<S> {
    pub fn new(store: S, config: &GeoBucketConfig) -> Self {
        BucketRegistry {
            store,
            grid_size: config.grid_size,
            max_attempts: config.max_create_attempts,
            reap_empty: config.reap_empty_buckets,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Attach one listing at `point` named `normalized_name` to its bucket.
    ///
    /// Creates the bucket when the cell has none, otherwise merges the name
    /// into the bucket's aliases. Either way the bucket's listing count goes
    /// up by exactly one. `normalized_name` must already be normalized and
    /// non-empty.
    ///
    /// A lost create race goes straight to the merge path. Only a bucket
    /// deleted mid-way restarts the loop and counts against
    /// `max_create_attempts`.
    pub fn assign_or_create(&self, point: GeoPoint, normalized_name: &str) -> Result<BucketId> {
        let cell = quantize(point.lat(), point.lng(), self.grid_size);

        for attempt in 1..=self.max_attempts {
            let Some(id) = self.locate_or_create(&cell, normalized_name)? else {
                warn!(key = %cell.key, attempt, "geo bucket vanished during merge");
                continue;
            };

            match self.store.adjust_listing_count(id, 1)? {
                Some(_) => return Ok(id),
                None => {
                    warn!(bucket_id = %id, attempt, "geo bucket vanished before count increment");
                }
            }
        }

        Err(GeoBucketError::Contention {
            key: cell.key,
            attempts: self.max_attempts,
        })
    }

    /// Id of the bucket owning `cell`, with `name` merged in or used to create it.
    ///
    /// `None` when the bucket disappeared between lookup and merge.
    fn locate_or_create(&self, cell: &GridCell, name: &str) -> Result<Option<BucketId>> {
        let existing = match self.store.find_by_key(&cell.key)? {
            Some(existing) => existing,
            None => {
                let draft = NewBucket {
                    bucket_key: cell.key.clone(),
                    canonical_name: name.to_string(),
                    centroid: cell.centroid(),
                };
                match self.store.insert_if_absent(&draft)? {
                    InsertOutcome::Inserted(id) => {
                        debug!(bucket_id = %id, key = %cell.key, name, "created geo bucket");
                        return Ok(Some(id));
                    }
                    InsertOutcome::Conflict => {
                        debug!(key = %cell.key, "lost geo bucket create race, merging");
                        match self.store.find_by_key(&cell.key)? {
                            Some(winner) => winner,
                            None => return Ok(None),
                        }
                    }
                }
            }
        };

        match self.store.append_alias(existing.id, name)? {
            AliasAppend::Appended => {
                debug!(bucket_id = %existing.id, key = %cell.key, alias = name, "merged alias into geo bucket");
            }
            AliasAppend::AlreadyPresent => {}
            AliasAppend::Missing => return Ok(None),
        }
        Ok(Some(existing.id))
    }

    /// Detach one listing from `id`.
    ///
    /// With `reap_empty_buckets` set, a bucket whose count reaches zero is
    /// deleted through the store's guarded delete.
    pub fn release(&self, id: BucketId) -> Result<Release> {
        let remaining = self
            .store
            .adjust_listing_count(id, -1)?
            .ok_or(GeoBucketError::NotFound(id))?;
        let deleted = remaining == 0 && self.reap_empty && self.store.delete_if_empty(id)?;
        if deleted {
            debug!(bucket_id = %id, "reaped empty geo bucket");
        }
        Ok(Release { remaining, deleted })
    }
}
