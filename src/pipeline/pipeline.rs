// src/pipeline/pipeline.rs

use crate::error::{AppError, Result};
use crate::models::{Config, LookupTables, RunReport};
use crate::storage::{GearStore, LocalStorage};
use crate::utils::log;

use super::export::run_export;
use super::extract::run_extract;

/// Canonical batch written before persistence.
pub const RAW_DUMP_FILE: &str = "all_gear_raw.json";

/// Run the full pipeline: extract, dump, persist, export.
///
/// Stops before touching the store when no gear set could be extracted.
pub async fn run_pipeline(
    config: &Config,
    lookup: &LookupTables,
    store: &dyn GearStore,
    output: &LocalStorage,
) -> Result<RunReport> {
    log::header("Gear data pipeline");
    let total_steps = 4;

    log::step(1, total_steps, "Extract - Reading gear pages");
    let outcome = run_extract(config, lookup)?;
    let report = outcome.report;

    if outcome.gear.is_empty() {
        log::summary("Extraction", &report_items(&report));
        return Err(AppError::NoData(report.documents.len()));
    }

    log::step(2, total_steps, "Dump - Writing canonical batch");
    output.write_json(RAW_DUMP_FILE, &outcome.gear).await?;
    log::sub_item(&output.path(RAW_DUMP_FILE).display().to_string());

    log::step(3, total_steps, "Persist - Upserting gear sets");
    let meta = store.upsert_all(&outcome.gear).await?;
    store.save_report(&report).await?;
    log::sub_item(&format!(
        "{} written ({} replaced) at {}",
        meta.written,
        meta.replaced,
        meta.timestamp.to_rfc3339()
    ));

    log::step(4, total_steps, "Export - Writing JSON documents");
    let exported = run_export(store, output).await?;

    let mut items = report_items(&report);
    items.push(("Exported gear sets", exported.gear_sets.to_string()));
    items.push(("Exported armor", exported.armor.to_string()));
    items.push(("Exported weapons", exported.weapons.to_string()));
    log::summary("Pipeline", &items);

    log::success("Pipeline complete");
    Ok(report)
}

/// Summary lines for a run report.
pub fn report_items(report: &RunReport) -> Vec<(&'static str, String)> {
    vec![
        ("Documents", report.documents.len().to_string()),
        ("Extracted", report.extracted_count().to_string()),
        ("Duplicates", report.duplicate_count().to_string()),
        ("Failed", report.failed_count().to_string()),
        ("Dropped rows", report.dropped_rows().to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::pipeline::export::GEAR_SETS_FILE;
    use tempfile::TempDir;

    const STEEL_PAGE: &str = r#"<html><body><p>Tier 2</p>
        <h2>All Classes Armors</h2>
        <table class="wikitable">
          <tr><th>Guardian / Warrior / Rogue</th><th>Sorcerer</th><th>HP</th></tr>
          <tr><td>Steel Helm</td><td>Steel Hood</td><td>220/250/280</td></tr>
        </table>
        <h3>Rogue Weapons</h3>
        <table class="wikitable">
          <tr><th>Weapon</th><th>Damage</th></tr>
          <tr><td>Steel Dagger</td><td>8/9/10</td></tr>
        </table></body></html>"#;

    struct Fixture {
        _tmp: TempDir,
        config: Config,
        store: LocalStorage,
        output: LocalStorage,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.input_dir = tmp.path().join("manual-download");
        config.paths.output_dir = tmp.path().join("output");
        config.paths.store_dir = tmp.path().join("store");
        fs::create_dir_all(&config.paths.input_dir).unwrap();
        Fixture {
            store: LocalStorage::new(&config.paths.store_dir),
            output: LocalStorage::new(&config.paths.output_dir),
            config,
            _tmp: tmp,
        }
    }

    #[tokio::test]
    async fn test_pipeline_end_to_end() {
        let f = fixture();
        fs::write(f.config.paths.input_dir.join("Steel Gear.html"), STEEL_PAGE).unwrap();
        let lookup = LookupTables::new(&f.config.lookup).unwrap();

        let report = run_pipeline(&f.config, &lookup, &f.store, &f.output)
            .await
            .unwrap();
        assert_eq!(report.extracted_count(), 1);

        let stored = f.store.load_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tier, Some(2));
        assert_eq!(stored[0].weapons[0].attack_speed, Some(800));

        assert!(f.output.path(RAW_DUMP_FILE).exists());
        assert!(f.output.path(GEAR_SETS_FILE).exists());
        assert!(f.store.load_report().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rerun_replaces_and_keeps_other_sets() {
        let f = fixture();
        let lookup = LookupTables::new(&f.config.lookup).unwrap();
        let mut bronze = crate::models::GearTier::new("Bronze");
        bronze.tier = Some(1);
        f.store.upsert_all(&[bronze]).await.unwrap();

        fs::write(f.config.paths.input_dir.join("Steel Gear.html"), STEEL_PAGE).unwrap();
        run_pipeline(&f.config, &lookup, &f.store, &f.output)
            .await
            .unwrap();
        run_pipeline(&f.config, &lookup, &f.store, &f.output)
            .await
            .unwrap();

        let names: Vec<String> = f
            .store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, ["Bronze", "Steel"]);
    }

    #[tokio::test]
    async fn test_no_data_leaves_store_untouched() {
        let f = fixture();
        fs::write(f.config.paths.input_dir.join("broken.json"), "{}").unwrap();
        let lookup = LookupTables::new(&f.config.lookup).unwrap();

        let err = run_pipeline(&f.config, &lookup, &f.store, &f.output)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoData(1)));
        assert!(f.store.load_report().await.unwrap().is_none());
        assert!(!f.output.path(RAW_DUMP_FILE).exists());
    }
}
