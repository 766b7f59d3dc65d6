//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── report.json           # Last run report
//! └── gear/
//!     └── <slug>.json       # One GearTier per file
//! ```
//!
//! Every write goes to a temporary file first and is renamed into place, so a
//! crashed run never leaves a half-written row behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{GearTier, RunReport};
use crate::storage::{GearStore, WriteMetadata};
use crate::utils::slugify;

const GEAR_DIR: &str = "gear";
const REPORT_KEY: &str = "report.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Row key for a gear-set name.
    fn gear_key(name: &str) -> Result<String> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(AppError::validation(format!(
                "gear-set name '{name}' has no usable characters for a row key"
            )));
        }
        Ok(format!("{GEAR_DIR}/{slug}.json"))
    }

    /// Every row key in the store, sorted.
    async fn gear_keys(&self) -> Result<Vec<String>> {
        let dir = self.path(GEAR_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                keys.push(format!("{GEAR_DIR}/{file_name}"));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl GearStore for LocalStorage {
    async fn upsert_all(&self, gear: &[GearTier]) -> Result<WriteMetadata> {
        let mut keys = Vec::with_capacity(gear.len());
        for record in gear {
            let key = Self::gear_key(&record.name)?;
            if keys.contains(&key) {
                return Err(AppError::validation(format!(
                    "gear-set '{}' maps to the same row as another set in this batch",
                    record.name
                )));
            }
            keys.push(key);
        }

        let mut replaced = 0;
        for (record, key) in gear.iter().zip(&keys) {
            if let Some(existing) = self.read_json::<GearTier>(key).await? {
                if existing.name != record.name {
                    log::warn!(
                        "Row {} held '{}', replacing it with '{}'",
                        key,
                        existing.name,
                        record.name
                    );
                }
                replaced += 1;
            }
            self.write_json(key, record).await?;
            log::debug!("Stored {} at {}", record.name, key);
        }

        Ok(WriteMetadata {
            written: gear.len(),
            replaced,
            timestamp: Utc::now(),
        })
    }

    async fn load_all(&self) -> Result<Vec<GearTier>> {
        let mut gear = Vec::new();
        for key in self.gear_keys().await? {
            if let Some(record) = self.read_json::<GearTier>(&key).await? {
                gear.push(record);
            }
        }
        // Unknown tiers sort last.
        gear.sort_by(|a, b| {
            (a.tier.is_none(), a.tier, &a.name).cmp(&(b.tier.is_none(), b.tier, &b.name))
        });
        Ok(gear)
    }

    async fn save_report(&self, report: &RunReport) -> Result<()> {
        self.write_json(REPORT_KEY, report).await
    }

    async fn load_report(&self) -> Result<Option<RunReport>> {
        self.read_json(REPORT_KEY).await
    }
}
