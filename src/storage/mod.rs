//! Storage abstractions for gear-set persistence.
//!
//! The store is a row store keyed by gear-set name: one JSON document per gear
//! set plus the report of the last run.
//!
//! ## Directory Structure
//!
//! ```text
//! store/
//! ├── report.json          # Last run report
//! └── gear/                # One row per gear set
//!     ├── bronze.json
//!     └── steel.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{GearTier, RunReport};

// Re-export for convenience
pub use local::LocalStorage;

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of gear-set rows written
    pub written: usize,
    /// Number of those rows that replaced an existing row
    pub replaced: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for gear-set storage backends.
#[async_trait]
pub trait GearStore: Send + Sync {
    /// Insert or fully replace the row of every given gear set. Rows of gear
    /// sets not given are left untouched.
    async fn upsert_all(&self, gear: &[GearTier]) -> Result<WriteMetadata>;

    /// Read every stored gear set, ordered by tier then name.
    async fn load_all(&self) -> Result<Vec<GearTier>>;

    /// Persist the report of the latest run.
    async fn save_report(&self, report: &RunReport) -> Result<()>;

    /// Load the report of the latest run, if any.
    async fn load_report(&self) -> Result<Option<RunReport>>;
}
