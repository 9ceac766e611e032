use notify::{Event, PollWatcher, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::Duration;
use walkdir::WalkDir;

use crate::Result;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const STOP_CHECK: Duration = Duration::from_millis(200);

/// Template name (file stem) to markup, ordered by name.
pub type TemplateBundle = BTreeMap<String, String>;

/// Editor swap and lock files (`#Form.form#`, `.#Form.form`) are never bundled.
fn is_template_file(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.contains('#') && path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Collects every template file below `dir`.
pub fn build_bundle(dir: &Path, extension: &str) -> Result<TemplateBundle> {
    let mut bundle = TemplateBundle::new();
    if !dir.exists() {
        return Ok(bundle);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_template_file(path, extension) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        bundle.insert(stem.to_string(), std::fs::read_to_string(path)?);
    }

    Ok(bundle)
}

/// Builds the bundle and writes it as JSON. Returns the number of templates.
pub fn write_bundle(dir: &Path, extension: &str, output: &Path) -> Result<usize> {
    let bundle = build_bundle(dir, extension)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, serde_json::to_string_pretty(&bundle)?)?;

    tracing::info!(templates = bundle.len(), output = %output.display(), "wrote template bundle");
    Ok(bundle.len())
}

/// Rebuilds the bundle whenever a template below `dir` changes, until
/// `stop` is set. `on_rebuild` sees the outcome of every rebuild.
pub fn watch_bundle<F>(
    dir: &Path,
    extension: &str,
    output: &Path,
    stop: &AtomicBool,
    mut on_rebuild: F,
) -> Result<()>
where
    F: FnMut(Result<usize>),
{
    std::fs::create_dir_all(dir)?;
    on_rebuild(write_bundle(dir, extension, output));

    let (tx, rx) = channel();
    let config = notify::Config::default().with_poll_interval(POLL_INTERVAL);
    let mut watcher = PollWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        config,
    )?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    tracing::info!(dir = %dir.display(), "watching templates");

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(STOP_CHECK) {
            Ok(event) => {
                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_template_file(p, extension))
                    .collect();
                if relevant.is_empty() {
                    continue;
                }
                tracing::debug!(paths = ?relevant, "template changed");
                on_rebuild(write_bundle(dir, extension, output));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!("stopped watching templates");
    Ok(())
}
