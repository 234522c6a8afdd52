//! geobucket-cli
//! =============
//!
//! Command-line interface for the `geobucket-core` engine.
//!
//! This crate primarily provides a binary (`geobucket`). The library target
//! only carries this overview page.
//!
//! Basic usage:
//!
//! ```text
//! geobucket seed
//! geobucket search "Sangotedo, Ajah"
//! geobucket search nowhere --lat 6.437 --lng 3.470
//! geobucket stats --json
//! ```
//!
//! Global flags: `--snapshot <path>` (default `geobucket.bin`),
//! `--config <json>` and `-v` (repeatable). Environment variables
//! `GEO_BUCKET_GRID_SIZE`, `FUZZY_MATCH_THRESHOLD`,
//! `GEO_BUCKET_PROXIMITY_RADIUS_M` and `LOCATION_STOP_WORDS` override the
//! config file.
#![cfg_attr(docsrs, feature(doc_cfg))]
