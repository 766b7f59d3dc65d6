//! wikigear CLI
//!
//! Local execution entry point for extraction, persistence and export.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wikigear::{
    error::Result,
    models::{Config, LookupTables},
    pipeline::{self, RAW_DUMP_FILE},
    services::SourceFormat,
    storage::{GearStore, LocalStorage},
    utils::log as progress,
};

/// wikigear - Wiki gear tier extractor
#[derive(Parser, Debug)]
#[command(
    name = "wikigear",
    version,
    about = "Extract gear tier statistics from wiki page exports"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract gear pages and write the canonical batch, without persisting
    Extract,

    /// Run full pipeline: Extract → Persist → Export
    Pipeline,

    /// Re-export JSON documents from the store
    Export,

    /// Watch the input folder and re-run the pipeline on changes
    #[cfg(feature = "watch")]
    Watch,

    /// Download wiki pages into the input folder
    #[cfg(feature = "fetch")]
    Fetch {
        /// Page titles, e.g. "Bronze Gear"
        #[arg(required = true)]
        pages: Vec<String>,

        /// Save raw wikitext in a JSON wrapper instead of rendered HTML
        #[arg(long)]
        raw: bool,
    },

    /// Validate configuration and lookup tables
    Validate,

    /// Show input, store and last-run info
    Info,
}

/// Initialize logging with the given default filter.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        }
    };

    let lookup = LookupTables::new(&config.lookup)?;
    let store = LocalStorage::new(&config.paths.store_dir);
    let output = LocalStorage::new(&config.paths.output_dir);

    match cli.command {
        Command::Extract => {
            let outcome = pipeline::run_extract(&config, &lookup)?;
            output.write_json(RAW_DUMP_FILE, &outcome.gear).await?;
            progress::summary(
                "Extraction",
                &pipeline::pipeline::report_items(&outcome.report),
            );
            log::info!(
                "Canonical batch saved to {}",
                output.path(RAW_DUMP_FILE).display()
            );
        }

        Command::Pipeline => {
            pipeline::run_pipeline(&config, &lookup, &store, &output).await?;
        }

        Command::Export => {
            progress::header("Exporting gear sets");
            let summary = pipeline::run_export(&store, &output).await?;
            if summary.gear_sets == 0 {
                log::warn!(
                    "Store at {} is empty. Run 'pipeline' first.",
                    config.paths.store_dir.display()
                );
            }
        }

        #[cfg(feature = "watch")]
        Command::Watch => {
            pipeline::run_watch(&config, &lookup, &store, &output).await?;
        }

        #[cfg(feature = "fetch")]
        Command::Fetch { pages, raw } => {
            pipeline::run_fetch(&config, &pages, raw).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} classes, {} slot names, {} tiers)",
                config.extraction.classes.len(),
                config.lookup.slots.len(),
                config.lookup.tiers.len()
            );

            log::info!("All validations passed!");
        }

        Command::Info => {
            let input_dir = &config.paths.input_dir;
            log::info!("Input directory: {}", input_dir.display());
            match std::fs::read_dir(input_dir) {
                Ok(entries) => {
                    let pages = entries
                        .filter_map(|entry| entry.ok())
                        .filter(|entry| SourceFormat::from_path(&entry.path()).is_some())
                        .count();
                    log::info!("Gear pages: {}", pages);
                }
                Err(_) => log::info!("Input directory not found."),
            }

            log::info!("Store directory: {}", config.paths.store_dir.display());
            let stored = store.load_all().await?;
            log::info!("Stored gear sets: {}", stored.len());
            for gear in &stored {
                progress::sub_item(&format!(
                    "{} (tier {}, level {}): {} armor, {} weapons",
                    gear.name,
                    gear.tier.map_or("?".to_string(), |t| t.to_string()),
                    gear.level.map_or("?".to_string(), |l| l.to_string()),
                    gear.armor.len(),
                    gear.weapons.len()
                ));
            }

            match store.load_report().await? {
                Some(report) => {
                    log::info!("Last run: {}", report.finished_at.to_rfc3339());
                    progress::summary("Last run", &pipeline::pipeline::report_items(&report));
                }
                None => log::info!("No run report found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
