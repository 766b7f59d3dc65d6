//! Pipeline entry points.
//!
//! - `run_extract`: Read gear pages into deduplicated gear sets
//! - `run_export`: Write JSON documents from the store
//! - `run_pipeline`: Extract, persist and export in one go
//! - `run_watch`: Re-run the pipeline on input changes
//! - `run_fetch`: Download wiki pages into the input folder

pub mod aggregate;
pub mod export;
pub mod extract;
#[cfg(feature = "fetch")]
pub mod fetch;
#[allow(clippy::module_inception)]
pub mod pipeline;
#[cfg(feature = "watch")]
pub mod watch;

pub use aggregate::{Admission, Aggregator};
pub use export::{ExportSummary, run_export};
pub use extract::{ExtractOutcome, run_extract};
#[cfg(feature = "fetch")]
pub use fetch::run_fetch;
pub use pipeline::{RAW_DUMP_FILE, run_pipeline};
#[cfg(feature = "watch")]
pub use watch::run_watch;
