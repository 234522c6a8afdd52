//! geobucket-rs
//!
//! Convenience facade over [`geobucket_core`]; see that crate for the API.

pub use geobucket_core::*;
