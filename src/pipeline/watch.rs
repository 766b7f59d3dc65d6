// src/pipeline/watch.rs

//! Re-runs the pipeline when gear pages appear or change in the input folder.

use std::path::Path;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{Config, LookupTables};
use crate::services::SourceFormat;
use crate::storage::{GearStore, LocalStorage};
use crate::utils::log;

use super::extract::is_hidden;
use super::pipeline::run_pipeline;

/// Suppresses runs closer together than a window.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    last: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// True (and the window restarts) when `now` is outside the window.
    pub fn ready(&mut self, now: Instant) -> bool {
        if self
            .last
            .is_some_and(|last| now.saturating_duration_since(last) < self.window)
        {
            return false;
        }
        self.last = Some(now);
        true
    }
}

/// The gear page a create/modify event is about, if any.
pub fn relevant_path(event: &Event) -> Option<&Path> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return None;
    }
    event
        .paths
        .iter()
        .map(|path| path.as_path())
        .find(|path| !is_hidden(path) && SourceFormat::from_path(path).is_some())
}

fn kind_label(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Create(_) => "created",
        _ => "modified",
    }
}

/// Watch the input folder until Ctrl+C.
///
/// Runs never overlap: events raised while a run is in progress are drained
/// and dropped once it finishes. A failed run is logged and watching goes on.
pub async fn run_watch(
    config: &Config,
    lookup: &LookupTables,
    store: &dyn GearStore,
    output: &LocalStorage,
) -> Result<()> {
    config.validate()?;

    let input_dir = &config.paths.input_dir;
    if !input_dir.exists() {
        log::sub_item(&format!("Creating {}", input_dir.display()));
        tokio::fs::create_dir_all(input_dir).await?;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // The receiver only goes away on shutdown.
        let _ = tx.send(res);
    })?;
    watcher.watch(input_dir, RecursiveMode::NonRecursive)?;

    log::header("Gear page watcher");
    log::sub_item(&format!("Watching folder: {}", input_dir.display()));
    log::sub_item("Monitoring for: .html, .htm, .json files");
    log::sub_item("Press Ctrl+C to stop");

    let mut debounce = Debounce::new(Duration::from_millis(config.watch.debounce_ms));

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let event = match event {
            Ok(event) => event,
            Err(e) => {
                ::log::warn!("Watch error: {}", e);
                continue;
            }
        };

        let Some(path) = relevant_path(&event) else {
            continue;
        };
        if !debounce.ready(Instant::now()) {
            ::log::debug!("Debounced event for {}", path.display());
            continue;
        }

        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::header(&format!(
            "Detected: {} - {}",
            kind_label(&event.kind).to_uppercase(),
            file
        ));

        match run_pipeline(config, lookup, store, output).await {
            Ok(_) => log::success(&format!("Pipeline completed for: {}", file)),
            Err(e) => ::log::error!("Pipeline failed: {}", e),
        }

        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            ::log::debug!("Ignored {} event(s) raised during the run", dropped);
        }
        log::sub_item("Watching for changes...");
    }

    log::success("File watcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_relevant_events() {
        let create = event(EventKind::Create(CreateKind::File), "in/Bronze Gear.html");
        assert_eq!(relevant_path(&create), Some(Path::new("in/Bronze Gear.html")));

        let modify = event(EventKind::Modify(ModifyKind::Any), "in/Steel.json");
        assert!(relevant_path(&modify).is_some());
    }

    #[test]
    fn test_ignored_events() {
        let remove = event(EventKind::Remove(RemoveKind::File), "in/Bronze Gear.html");
        assert_eq!(relevant_path(&remove), None);

        let hidden = event(EventKind::Create(CreateKind::File), "in/.Bronze.html");
        assert_eq!(relevant_path(&hidden), None);

        let lock = event(EventKind::Modify(ModifyKind::Any), "in/~Bronze.html");
        assert_eq!(relevant_path(&lock), None);

        let other = event(EventKind::Create(CreateKind::File), "in/notes.txt");
        assert_eq!(relevant_path(&other), None);
    }

    #[test]
    fn test_debounce_window() {
        let mut debounce = Debounce::new(Duration::from_millis(2000));
        let start = Instant::now();
        assert!(debounce.ready(start));
        assert!(!debounce.ready(start + Duration::from_millis(500)));
        assert!(debounce.ready(start + Duration::from_millis(2500)));
        assert!(!debounce.ready(start + Duration::from_millis(3000)));
    }
}
