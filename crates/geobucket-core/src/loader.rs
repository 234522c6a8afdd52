// crates/geobucket-core/src/loader.rs

//! Snapshot persistence and seed loading.
//!
//! A snapshot is the bincode encoding of [`Snapshot`]. With the `compact`
//! feature (on by default) the stream is gzip-wrapped on both read and
//! write, so snapshots written with and without the feature are not
//! interchangeable.

use crate::error::{GeoBucketError, Result};
use crate::model::{GeoBucket, Listing, SeedListing};
use crate::store::MemoryStore;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

#[cfg(feature = "compact")]
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

/// Everything the CLI persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub buckets: Vec<GeoBucket>,
    pub listings: Vec<Listing>,
}

impl Snapshot {
    /// Capture the current contents of `store` along with `listings`.
    pub fn capture(store: &MemoryStore, listings: Vec<Listing>) -> Self {
        Snapshot {
            buckets: store.buckets(),
            listings,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut stream = open_stream(path)?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)?;
        info!(
            path = %path.display(),
            buckets = snapshot.buckets.len(),
            listings = snapshot.listings.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Like [`Snapshot::load`], but an absent file yields an empty snapshot.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "no snapshot yet, starting empty");
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = bincode::serialize(self)?;
        write_stream(path, &bytes)?;
        info!(
            path = %path.display(),
            buckets = self.buckets.len(),
            listings = self.listings.len(),
            "saved snapshot"
        );
        Ok(())
    }

    /// Rebuild an in-memory store from the captured buckets.
    pub fn into_store(self) -> Result<(MemoryStore, Vec<Listing>)> {
        let store = MemoryStore::from_buckets(self.buckets)?;
        Ok((store, self.listings))
    }

    /// Next free listing id.
    pub fn next_listing_id(&self) -> u64 {
        self.listings.iter().map(|l| l.id).max().unwrap_or(0) + 1
    }
}

/// Parse a JSON array of [`SeedListing`]s.
pub fn parse_seed(json: &str) -> Result<Vec<SeedListing>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<SeedListing>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        GeoBucketError::InvalidData(format!("seed file {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn open_stream(path: &Path) -> Result<Box<dyn Read>> {
    let reader = BufReader::new(File::open(path)?);

    #[cfg(feature = "compact")]
    {
        Ok(Box::new(GzDecoder::new(reader)))
    }

    #[cfg(not(feature = "compact"))]
    {
        Ok(Box::new(reader))
    }
}

fn write_stream(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);

    #[cfg(feature = "compact")]
    {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?.flush()?;
    }

    #[cfg(not(feature = "compact"))]
    {
        let mut writer = writer;
        writer.write_all(bytes)?;
        writer.flush()?;
    }

    Ok(())
}
