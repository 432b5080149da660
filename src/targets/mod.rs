//! Target-list ingestion
//!
//! Parses the batch input file into the ordered list of devices a run will
//! scrape. Any malformed row fails the whole load; no partial list is ever
//! produced.

mod loader;

pub use loader::{load_targets, LoadError, Target};
