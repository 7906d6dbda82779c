//! Strata Core - Minimal Time-Series Storage Engine
//!
//! Strata buffers labeled numeric samples in memory and flushes them into
//! immutable, timestamp-sorted chunks on disk that can be queried lazily.
//!
//! # Architecture
//!
//! - **Buffer**: metric → series → samples, held in append-only sequences
//!   whose elements never move
//! - **Chunk**: one directory per commit with a JSON `meta` file and a
//!   plain-text body, one line per series
//! - **Query**: prunes chunks by time range, matches series by exact label
//!   equality and streams samples through two-level iterators
//!
//! ```no_run
//! use strata_core::{label_set, Engine, EngineConfig, Query};
//!
//! # fn main() -> strata_core::Result<()> {
//! let mut engine = Engine::open(EngineConfig::new("ingestion"))?;
//! let mut cpu = engine.create_metric("cpu");
//! for ts in 1..=10 {
//!     cpu.append(&label_set([("host", "mac")]), ts, ts as f64);
//! }
//! engine.flush()?;
//!
//! for series in engine.find(&Query::new().range_start(5))? {
//!     for sample in series {
//!         println!("{:?}", sample?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod chunk;
pub mod query;
pub mod storage;

mod error;
mod types;

pub use error::{Result, StrataError};
pub use query::{Query, SeriesIterator, SeriesSamples};
pub use storage::{CommitOutcome, Engine, EngineConfig, EngineStats, MetricHandle};
pub use types::*;

/// Strata version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod config {
    /// Buffered samples required before a commit writes a chunk
    pub const COMMIT_THRESHOLD: usize = 1000;

    /// Default ingestion root
    pub const DATA_DIR: &str = "ingestion";
}
