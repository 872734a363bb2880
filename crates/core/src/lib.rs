//! Domain types shared by every kbatch crate.
//!
//! Pure data and validation only: no I/O, no async runtime. The cluster,
//! database and pipeline crates build on these types.

pub mod error;
pub mod outcome;
pub mod params;
pub mod record;
pub mod types;
pub mod workload;
