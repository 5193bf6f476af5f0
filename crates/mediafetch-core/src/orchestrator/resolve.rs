//! Locate the file a successful tool run produced.
//!
//! The tool's announced filenames are not reliable across its sanitize and
//! merge paths, so the announced path is only the first of three tiers:
//! 1. the parser's captured path, if it exists;
//! 2. the newest file in the output directory named `<title>.*`;
//! 3. the newest file in the output directory.
//!
//! Also sweeps the in-progress files an interrupted run leaves behind.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Suffixes of the tool's in-progress files; never a finished artifact.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

fn is_partial(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.contains(".part-Frag")
}

/// Resolve the final output path, or `None` if nothing usable exists.
pub async fn resolve_output(dir: &Path, captured: Option<&Path>, title: &str) -> Option<PathBuf> {
    if let Some(captured) = captured {
        let candidate = if captured.is_absolute() {
            captured.to_path_buf()
        } else {
            dir.join(captured)
        };
        if is_file(&candidate).await {
            return Some(candidate);
        }
        tracing::debug!(path = %candidate.display(), "announced output path does not exist");
    }

    if !title.is_empty() {
        let prefix = format!("{title}.");
        if let Some(found) = newest_file(dir, |name| name.starts_with(&prefix)).await {
            return Some(found);
        }
    }

    newest_file(dir, |_| true).await
}

/// Remove the tool's in-progress files for `announced` (`<name>.part`,
/// `<name>.part-FragN`, `<name>.ytdl`). Returns how many were removed.
pub async fn remove_partials(dir: &Path, announced: &Path) -> usize {
    let announced = if announced.is_absolute() {
        announced.to_path_buf()
    } else {
        dir.join(announced)
    };
    let (Some(parent), Some(name)) = (announced.parent(), announced.file_name()) else {
        return 0;
    };
    let prefix = format!("{}.", name.to_string_lossy());

    let Ok(mut entries) = tokio::fs::read_dir(parent).await else {
        return 0;
    };
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(&prefix) || !is_partial(name) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %entry.path().display(), "could not remove partial file: {}", e),
        }
    }
    removed
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Most recently modified regular, non-partial file whose name passes `accept`.
async fn newest_file(dir: &Path, accept: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), "cannot scan output directory: {}", e);
            return None;
        }
    };

    let mut best: Option<(SystemTime, PathBuf)> = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_partial(name) || !accept(name) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else { continue };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if best.as_ref().map_or(true, |(t, _)| modified > *t) {
            best = Some((modified, entry.path()));
        }
    }
    best.map(|(_, path)| path)
}
