// crates/geobucket-core/src/store/mod.rs

//! # Bucket Stores
//!
//! Implementations of [`crate::traits::BucketStore`]:
//! - [`MemoryStore`]: sharded in-process maps; uniqueness holds within one process.
//! - [`SqliteStore`] (feature `sqlite`): uniqueness enforced by the database,
//!   so it also holds across processes sharing a file.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
