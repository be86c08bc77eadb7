//! Cached model inventory
//!
//! Registry-ordered listing and bulk deletion of everything the sync engine
//! keeps under the package root. Deletion is best-effort per directory so
//! one undeletable model never blocks reclaiming the rest.

use crate::registry::AiRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One cached model directory, as reported by [`cached_models`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedModel {
    pub ai: String,
    pub model: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Existing cache directories for every registry model, in registry order.
pub fn cached_model_dirs(package_root: &Path, registry: &AiRegistry) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for entry in registry.iter() {
        for model in &entry.models {
            let dir = package_root.join(&entry.ai.pkg_dir).join(&model.dir);
            if dir.is_dir() {
                dirs.push(dir);
            }
        }
    }
    dirs
}

/// Inventory report over every cached registry model.
pub fn cached_models(package_root: &Path, registry: &AiRegistry) -> Vec<CachedModel> {
    let mut models = Vec::new();
    for entry in registry.iter() {
        for model in &entry.models {
            let path = package_root.join(&entry.ai.pkg_dir).join(&model.dir);
            if !path.is_dir() {
                continue;
            }
            let modified = std::fs::metadata(&path)
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);
            models.push(CachedModel {
                ai: entry.ai.name.clone(),
                model: model.name.clone(),
                size_bytes: dir_size(&path),
                path,
                modified,
            });
        }
    }
    models
}

/// Delete every cached registry model, logging the space freed per model.
///
/// Failures are logged and skipped. Returns the total bytes freed.
pub fn delete_cached_models(package_root: &Path, registry: &AiRegistry) -> u64 {
    let mut freed = 0u64;
    for dir in cached_model_dirs(package_root, registry) {
        let size = dir_size(&dir);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(dir = %dir.display(), freed_bytes = size, "deleted cached model");
                freed += size;
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to delete cached model");
            }
        }
    }
    freed
}

/// Recursively calculate directory size
pub fn dir_size(path: &Path) -> u64 {
    let mut size = 0;

    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                size += dir_size(&path);
            } else if let Ok(metadata) = std::fs::metadata(&path) {
                size += metadata.len();
            }
        }
    }

    size
}
