// src/models/mod.rs

//! Domain models for the extraction pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod gear;
mod lookup;
mod report;

// Re-export all public types
pub use config::{
    Config, ExtractionConfig, FetchConfig, LoggingConfig, PathsConfig, WatchConfig,
};
pub use gear::{
    ArmorPiece, BonusStatTable, BonusStats, Category, GearTier, Quality, StatValues, WeaponEntry,
};
pub use lookup::{LookupConfig, LookupTables, TierLevel};
pub use report::{DocumentReport, DocumentStatus, RunReport};
