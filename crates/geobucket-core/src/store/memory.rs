// crates/geobucket-core/src/store/memory.rs

//! In-process bucket store.
//!
//! Two sharded maps: `keys` (bucket key -> id) carries the uniqueness
//! constraint, `rows` (id -> bucket) carries the data. Structural changes
//! lock the `keys` shard first and the `rows` shard second; row updates
//! only ever touch `rows`. Different keys usually live on different shards
//! and never wait on each other.

use crate::error::{GeoBucketError, Result};
use crate::model::{BucketId, BucketKey, GeoBucket, InsertOutcome, NewBucket};
use crate::traits::{AliasAppend, BucketStore};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: DashMap<BucketKey, BucketId>,
    rows: DashMap<BucketId, GeoBucket>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously persisted buckets.
    ///
    /// Fails on duplicate keys or ids; new ids continue after the largest one.
    pub fn from_buckets(buckets: impl IntoIterator<Item = GeoBucket>) -> Result<Self> {
        let store = Self::new();
        let mut max_id = 0;
        for bucket in buckets {
            max_id = max_id.max(bucket.id.0);
            if store.rows.contains_key(&bucket.id) {
                return Err(GeoBucketError::InvalidData(format!(
                    "duplicate bucket id {}",
                    bucket.id
                )));
            }
            match store.keys.entry(bucket.bucket_key.clone()) {
                Entry::Occupied(_) => {
                    return Err(GeoBucketError::InvalidData(format!(
                        "duplicate bucket key {}",
                        bucket.bucket_key
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(bucket.id);
                }
            }
            store.rows.insert(bucket.id, bucket);
        }
        store.next_id.store(max_id, Ordering::SeqCst);
        Ok(store)
    }

    /// Copy of every bucket, ordered by id.
    pub fn buckets(&self) -> Vec<GeoBucket> {
        let mut out: Vec<GeoBucket> = self.rows.iter().map(|r| r.value().clone()).collect();
        out.sort_by_key(|b| b.id);
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn collect_where(&self, pred: impl Fn(&GeoBucket) -> bool) -> Vec<GeoBucket> {
        self.rows
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }
}

impl BucketStore for MemoryStore {
    fn insert_if_absent(&self, draft: &NewBucket) -> Result<InsertOutcome> {
        match self.keys.entry(draft.bucket_key.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::Conflict),
            Entry::Vacant(slot) => {
                let id = BucketId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                // Row first, then publish the key, so a key hit always finds its row.
                self.rows
                    .insert(id, GeoBucket::from_draft(id, draft.clone(), Utc::now()));
                slot.insert(id);
                Ok(InsertOutcome::Inserted(id))
            }
        }
    }

    fn find_by_key(&self, key: &BucketKey) -> Result<Option<GeoBucket>> {
        let id = match self.keys.get(key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }

    fn get(&self, id: BucketId) -> Result<Option<GeoBucket>> {
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }

    fn append_alias(&self, id: BucketId, alias: &str) -> Result<AliasAppend> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(AliasAppend::Missing);
        };
        if row.has_alias(alias) {
            return Ok(AliasAppend::AlreadyPresent);
        }
        row.aliases.push(alias.to_string());
        row.updated_at = Utc::now();
        Ok(AliasAppend::Appended)
    }

    fn adjust_listing_count(&self, id: BucketId, delta: i64) -> Result<Option<u64>> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(None);
        };
        let next = row.listing_count as i64 + delta;
        if next < 0 {
            return Err(GeoBucketError::InvalidData(format!(
                "listing count of bucket {id} would drop below zero"
            )));
        }
        row.listing_count = next as u64;
        row.updated_at = Utc::now();
        Ok(Some(row.listing_count))
    }

    fn delete_if_empty(&self, id: BucketId) -> Result<bool> {
        let key = match self.rows.get(&id) {
            Some(row) => row.bucket_key.clone(),
            None => return Ok(false),
        };
        // Holding the key shard keeps insert_if_absent for this key out
        // until the row and its key are gone together.
        match self.keys.entry(key) {
            Entry::Occupied(slot) if *slot.get() == id => {
                let removed = self
                    .rows
                    .remove_if(&id, |_, row| row.listing_count == 0)
                    .is_some();
                if removed {
                    slot.remove();
                }
                Ok(removed)
            }
            _ => Ok(false),
        }
    }

    fn find_by_canonical_name(&self, name: &str) -> Result<Vec<GeoBucket>> {
        let name = name.to_lowercase();
        Ok(self.collect_where(|b| b.canonical_name.to_lowercase() == name))
    }

    fn find_by_alias(&self, alias: &str) -> Result<Vec<GeoBucket>> {
        Ok(self.collect_where(|b| b.has_alias(alias)))
    }

    fn all_buckets(&self) -> Result<Vec<GeoBucket>> {
        Ok(self.collect_where(|_| true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::quantize;

    fn draft(lat: f64, lng: f64, name: &str) -> NewBucket {
        let cell = quantize(lat, lng, 0.005);
        NewBucket {
            centroid: cell.centroid(),
            bucket_key: cell.key,
            canonical_name: name.into(),
        }
    }

    #[test]
    fn second_insert_for_a_key_conflicts() {
        let store = MemoryStore::new();
        let first = store.insert_if_absent(&draft(6.4698, 3.6285, "sangotedo")).unwrap();
        let second = store.insert_if_absent(&draft(6.4720, 3.6301, "ajah")).unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(BucketId(1))));
        assert_eq!(second, InsertOutcome::Conflict);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn alias_append_is_conditional() {
        let store = MemoryStore::new();
        let InsertOutcome::Inserted(id) =
            store.insert_if_absent(&draft(6.4698, 3.6285, "sangotedo")).unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(store.append_alias(id, "sangotedo").unwrap(), AliasAppend::AlreadyPresent);
        assert_eq!(store.append_alias(id, "ajah sangotedo").unwrap(), AliasAppend::Appended);
        assert_eq!(store.append_alias(id, "ajah sangotedo").unwrap(), AliasAppend::AlreadyPresent);
        assert_eq!(store.append_alias(BucketId(99), "x").unwrap(), AliasAppend::Missing);
        let b = store.get(id).unwrap().unwrap();
        assert_eq!(b.aliases, vec!["sangotedo", "ajah sangotedo"]);
    }

    #[test]
    fn counts_cannot_go_negative() {
        let store = MemoryStore::new();
        let InsertOutcome::Inserted(id) =
            store.insert_if_absent(&draft(1.0, 1.0, "x")).unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(store.adjust_listing_count(id, 2).unwrap(), Some(2));
        assert_eq!(store.adjust_listing_count(id, -2).unwrap(), Some(0));
        assert!(store.adjust_listing_count(id, -1).is_err());
        assert_eq!(store.adjust_listing_count(BucketId(42), 1).unwrap(), None);
    }

    #[test]
    fn delete_only_when_empty_and_frees_the_key() {
        let store = MemoryStore::new();
        let d = draft(1.0, 1.0, "x");
        let InsertOutcome::Inserted(id) = store.insert_if_absent(&d).unwrap() else {
            panic!("expected insert");
        };
        store.adjust_listing_count(id, 1).unwrap();
        assert!(!store.delete_if_empty(id).unwrap());
        store.adjust_listing_count(id, -1).unwrap();
        assert!(store.delete_if_empty(id).unwrap());
        assert!(store.find_by_key(&d.bucket_key).unwrap().is_none());
        assert!(matches!(
            store.insert_if_absent(&d).unwrap(),
            InsertOutcome::Inserted(BucketId(2))
        ));
    }

    #[test]
    fn canonical_lookup_ignores_case() {
        let store = MemoryStore::new();
        store.insert_if_absent(&draft(1.0, 1.0, "Sangotedo")).unwrap();
        assert_eq!(store.find_by_canonical_name("SANGOTEDO").unwrap().len(), 1);
        assert!(store.find_by_alias("sangotedo").unwrap().is_empty());
    }

    #[test]
    fn rebuild_keeps_ids_monotonic() {
        let store = MemoryStore::new();
        store.insert_if_absent(&draft(1.0, 1.0, "a")).unwrap();
        store.insert_if_absent(&draft(2.0, 2.0, "b")).unwrap();
        let rebuilt = MemoryStore::from_buckets(store.buckets()).unwrap();
        let next = rebuilt.insert_if_absent(&draft(3.0, 3.0, "c")).unwrap();
        assert_eq!(next, InsertOutcome::Inserted(BucketId(3)));

        let mut dup = store.buckets();
        dup.push(dup[0].clone());
        assert!(MemoryStore::from_buckets(dup).is_err());
    }
}
