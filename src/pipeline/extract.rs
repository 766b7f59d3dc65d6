// src/pipeline/extract.rs

//! Extraction stage: every input document to at most one gear set.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::{AppError, DocumentError, Result};
use crate::models::{Config, DocumentStatus, GearTier, LookupTables, RunReport};
use crate::services::{Extraction, GearExtractor, SourceFormat};
use crate::utils::{log, slugify};

use super::aggregate::{Admission, Aggregator};

/// Deduplicated gear sets plus the per-document report.
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub gear: Vec<GearTier>,
    pub report: RunReport,
}

/// Recognized input files in `input_dir`, sorted by file name.
///
/// A missing folder or one without any recognized file is an error carrying
/// a hint on how to fill it.
pub fn scan_inputs(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(AppError::input_missing(
            input_dir,
            "input folder not found",
            format!(
                "Create it with `mkdir -p {}` and save the gear pages into it \
                 (or run `wikigear fetch <page>...`).",
                input_dir.display()
            ),
        ));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && !is_hidden(path))
        .filter(|path| SourceFormat::from_path(path).is_some())
        .collect();

    if files.is_empty() {
        return Err(AppError::input_missing(
            input_dir,
            "no .html or .json gear pages found",
            "Download the gear pages from the wiki (File > Save Page As, HTML only) \
             into this folder, or run `wikigear fetch <page>...`.",
        ));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Hidden and editor temporary files.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') || name.starts_with('~'))
}

/// Extract every input document, keeping the first gear set per name.
///
/// Document failures are logged and recorded in the report; an invalid
/// config or a missing or empty input folder fails the stage.
pub fn run_extract(config: &Config, lookup: &LookupTables) -> Result<ExtractOutcome> {
    config.validate()?;
    let files = scan_inputs(&config.paths.input_dir)?;
    log::sub_item(&format!(
        "{} document(s) in {}",
        files.len(),
        config.paths.input_dir.display()
    ));

    let extractor = GearExtractor::new(&config.extraction, lookup);
    let mut aggregator = Aggregator::new();
    let mut report = RunReport::new(Utc::now());

    for path in &files {
        let file = file_label(path);
        let (digest, result) = extract_file(&extractor, path);

        let status = match result {
            Ok(extraction) => {
                let gear_set = extraction.gear.name.clone();
                let armor = extraction.gear.armor.len();
                let weapons = extraction.gear.weapons.len();
                match aggregator.admit(&file, extraction.gear) {
                    Admission::Accepted => {
                        log::sub_item(&format!(
                            "{}: {} ({} armor, {} weapons)",
                            file, gear_set, armor, weapons
                        ));
                        DocumentStatus::Extracted {
                            gear_set,
                            armor,
                            weapons,
                            dropped_rows: extraction.dropped_rows,
                        }
                    }
                    Admission::Duplicate { first_file } => DocumentStatus::Duplicate {
                        gear_set,
                        first_file,
                    },
                }
            }
            Err(err) => {
                ::log::warn!("{}: {}", file, err);
                DocumentStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        report.push(file, digest, status);
    }

    report.finish();
    Ok(ExtractOutcome {
        gear: aggregator.into_gear(),
        report,
    })
}

/// Read, decode and extract one file. The digest is returned whenever the
/// file could be read.
pub fn extract_file(
    extractor: &GearExtractor<'_>,
    path: &Path,
) -> (Option<String>, std::result::Result<Extraction, DocumentError>) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => return (None, Err(DocumentError::Read(err))),
    };
    let digest = hex::encode(Sha256::digest(&bytes));
    (Some(digest), extract_bytes(extractor, path, bytes))
}

fn extract_bytes(
    extractor: &GearExtractor<'_>,
    path: &Path,
    bytes: Vec<u8>,
) -> std::result::Result<Extraction, DocumentError> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        DocumentError::UnsupportedFormat(
            path.extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    })?;
    let content = String::from_utf8(bytes)
        .map_err(|e| DocumentError::malformed(format!("not valid UTF-8: {e}")))?;

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let document = format.decode(&stem, &content)?;
    let extraction = extractor.extract(&document)?;

    if slugify(&extraction.gear.name).is_empty() {
        return Err(DocumentError::MissingName);
    }
    Ok(extraction)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ARMOR_PAGE: &str = r#"<html><body>
        <h2>Bonus Stats</h2>
        <table class="wikitable"><tr><th>Type</th><th>Strength</th></tr>
          <tr><td>Armor</td><td>1/2/3</td></tr></table>
        <h2>All Classes Armors</h2>
        <table class="wikitable">
          <tr><th>Guardian / Warrior / Rogue</th><th>Sorcerer</th><th>HP</th></tr>
          <tr><td>Bronze Helm</td><td>Bronze Hood</td><td>120/150/180</td></tr>
        </table></body></html>"#;

    fn config_for(dir: &Path) -> Config {
        let mut config = Config::default();
        config.paths.input_dir = dir.to_path_buf();
        config
    }

    fn lookup(config: &Config) -> LookupTables {
        LookupTables::new(&config.lookup).unwrap()
    }

    #[test]
    fn test_missing_folder_is_input_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan_inputs(&tmp.path().join("manual-download")).unwrap_err();
        assert!(matches!(err, AppError::InputMissing { .. }));
        assert!(err.to_string().contains("mkdir"));
    }

    #[test]
    fn test_folder_without_pages_is_input_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        fs::write(tmp.path().join(".hidden.html"), "x").unwrap();
        let err = scan_inputs(tmp.path()).unwrap_err();
        assert!(matches!(err, AppError::InputMissing { .. }));
    }

    #[test]
    fn test_scan_sorts_and_filters() {
        let tmp = TempDir::new().unwrap();
        for name in ["Steel Gear.html", "Bronze Gear.html", "~lock.html", "raw.json", "a.txt"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }
        let names: Vec<String> = scan_inputs(tmp.path())
            .unwrap()
            .iter()
            .map(|p| file_label(p))
            .collect();
        assert_eq!(names, ["Bronze Gear.html", "Steel Gear.html", "raw.json"]);
    }

    #[test]
    fn test_run_extract_reports_every_document() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Bronze Gear - Eterspire Wiki.html"), ARMOR_PAGE).unwrap();
        fs::write(tmp.path().join("Bronze Gear.html"), ARMOR_PAGE).unwrap();
        fs::write(tmp.path().join("broken.json"), r#"{"title": "Steel"}"#).unwrap();

        let config = config_for(tmp.path());
        let outcome = run_extract(&config, &lookup(&config)).unwrap();

        assert_eq!(outcome.gear.len(), 1);
        assert_eq!(outcome.gear[0].name, "Bronze");
        assert_eq!(outcome.gear[0].armor.len(), 2);

        let report = &outcome.report;
        assert_eq!(report.documents.len(), 3);
        assert_eq!(report.extracted_count(), 1);
        assert_eq!(report.duplicate_count(), 1);
        assert_eq!(report.failed_count(), 1);
        // Sorted order decides which copy wins.
        assert_eq!(report.documents[0].file, "Bronze Gear - Eterspire Wiki.html");
        assert!(matches!(
            report.documents[0].status,
            DocumentStatus::Extracted { .. }
        ));
        assert_eq!(report.documents[0].digest, report.documents[1].digest);
        assert_eq!(
            report.documents[1].status,
            DocumentStatus::Duplicate {
                gear_set: "Bronze".to_string(),
                first_file: "Bronze Gear - Eterspire Wiki.html".to_string(),
            }
        );
        assert!(matches!(
            &report.documents[2].status,
            DocumentStatus::Failed { reason } if reason.contains("source")
        ));
    }

    #[test]
    fn test_invalid_config_stops_before_reading() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Bronze Gear.html"), ARMOR_PAGE).unwrap();

        let mut config = config_for(tmp.path());
        config.extraction.default_class_groups =
            vec![Vec::new(), vec!["Sorcerer".to_string()]];

        let err = run_extract(&config, &lookup(&config)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
