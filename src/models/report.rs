// src/models/report.rs

//! Per-document outcomes and the run-level report built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to one input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// A gear set was extracted and kept
    Extracted {
        gear_set: String,
        armor: usize,
        weapons: usize,
        dropped_rows: usize,
    },
    /// A gear set was extracted but its name was already taken
    Duplicate { gear_set: String, first_file: String },
    /// The document could not be extracted
    Failed { reason: String },
}

/// Outcome for one input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// File name within the input directory
    pub file: String,

    /// SHA-256 of the file contents, when it could be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(flatten)]
    pub status: DocumentStatus,
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub documents: Vec<DocumentReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            documents: Vec::new(),
        }
    }

    pub fn push(&mut self, file: impl Into<String>, digest: Option<String>, status: DocumentStatus) {
        self.documents.push(DocumentReport {
            file: file.into(),
            digest,
            status,
        });
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    pub fn extracted_count(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Extracted { .. }))
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Duplicate { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed { .. }))
    }

    /// Rows dropped across all extracted documents.
    pub fn dropped_rows(&self) -> usize {
        self.documents
            .iter()
            .map(|doc| match doc.status {
                DocumentStatus::Extracted { dropped_rows, .. } => dropped_rows,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.documents.iter().filter(|doc| pred(&doc.status)).count()
    }
}
