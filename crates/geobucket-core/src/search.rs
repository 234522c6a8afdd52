// crates/geobucket-core/src/search.rs

//! # Match Cascade
//!
//! Resolves a free-text location query to buckets in four stages, cheapest
//! and most exact first. The first stage with any hit wins; later stages
//! are not evaluated at all.
//!
//! 1. exact canonical name (case-insensitive)
//! 2. alias membership
//! 3. fuzzy similarity above the threshold, best first
//! 4. nearest centroid within the radius (only with caller coordinates)

use crate::config::GeoBucketConfig;
use crate::error::Result;
use crate::grid::GeoPoint;
use crate::model::{BucketId, GeoBucket};
use crate::similarity::{Similarity, TrigramSimilarity};
use crate::text::Normalizer;
use crate::traits::{sort_nearby, sort_scored, BucketStore};
use std::collections::HashSet;
use tracing::trace;

/// Which cascade stage produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Exact,
    Alias,
    Fuzzy,
    Proximity,
}

/// Buckets matched by [`MatchEngine::resolve_detailed`], in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// `None` when nothing matched.
    pub stage: Option<MatchStage>,
    pub bucket_ids: Vec<BucketId>,
}

impl Resolution {
    fn none() -> Self {
        Resolution {
            stage: None,
            bucket_ids: Vec::new(),
        }
    }

    fn hit(stage: MatchStage, ids: impl IntoIterator<Item = BucketId>) -> Self {
        let mut seen = HashSet::new();
        Resolution {
            stage: Some(stage),
            bucket_ids: ids.into_iter().filter(|id| seen.insert(*id)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchEngine<M = TrigramSimilarity> {
    normalizer: Normalizer,
    similarity: M,
    fuzzy_threshold: f64,
    proximity_radius_m: f64,
}

impl MatchEngine<TrigramSimilarity> {
    pub fn new(config: &GeoBucketConfig) -> Self {
        Self::with_similarity(config, TrigramSimilarity)
    }
}

impl<M: Similarity> MatchEngine<M> {
    pub fn with_similarity(config: &GeoBucketConfig, similarity: M) -> Self {
        MatchEngine {
            normalizer: Normalizer::from_config(config),
            similarity,
            fuzzy_threshold: config.fuzzy_threshold,
            proximity_radius_m: config.proximity_radius_m,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn similarity(&self) -> &M {
        &self.similarity
    }

    /// Matching bucket ids, possibly empty. "No match" is not an error.
    pub fn resolve<S: BucketStore + ?Sized>(
        &self,
        store: &S,
        raw_query: &str,
        near: Option<GeoPoint>,
    ) -> Result<Vec<BucketId>> {
        Ok(self.resolve_detailed(store, raw_query, near)?.bucket_ids)
    }

    /// Like [`MatchEngine::resolve`], also reporting the winning stage.
    pub fn resolve_detailed<S: BucketStore + ?Sized>(
        &self,
        store: &S,
        raw_query: &str,
        near: Option<GeoPoint>,
    ) -> Result<Resolution> {
        let query = self.normalizer.query_form(raw_query);

        if !query.is_empty() {
            let exact = store.find_by_canonical_name(&query)?;
            trace!(query = %query, hits = exact.len(), "exact stage");
            if !exact.is_empty() {
                return Ok(Resolution::hit(MatchStage::Exact, ids_by_key(exact)));
            }

            let alias = store.find_by_alias(&query)?;
            trace!(query = %query, hits = alias.len(), "alias stage");
            if !alias.is_empty() {
                return Ok(Resolution::hit(MatchStage::Alias, ids_by_key(alias)));
            }

            let mut fuzzy = store.similar_to(&query, self.fuzzy_threshold, &self.similarity)?;
            trace!(query = %query, hits = fuzzy.len(), "fuzzy stage");
            if !fuzzy.is_empty() {
                sort_scored(&mut fuzzy);
                return Ok(Resolution::hit(
                    MatchStage::Fuzzy,
                    fuzzy.into_iter().map(|hit| hit.id),
                ));
            }
        }

        if let Some(point) = near {
            let mut nearby = store.within_radius(point, self.proximity_radius_m)?;
            trace!(hits = nearby.len(), radius_m = self.proximity_radius_m, "proximity stage");
            sort_nearby(&mut nearby);
            if let Some(nearest) = nearby.into_iter().next() {
                return Ok(Resolution::hit(MatchStage::Proximity, [nearest.id]));
            }
        }

        Ok(Resolution::none())
    }
}

fn ids_by_key(mut buckets: Vec<GeoBucket>) -> Vec<BucketId> {
    buckets.sort_by(|a, b| a.bucket_key.cmp(&b.bucket_key));
    buckets.into_iter().map(|b| b.id).collect()
}
