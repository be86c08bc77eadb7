//! Model manifest parsing
//!
//! Every model package ships a `files.json` listing its files:
//! ```json
//! [
//!   { "filename": "rife46.pth", "dir": "/weights", "size": "55234000", "crc32": "8d2cb31a" }
//! ]
//! ```
//! Sizes arrive string-encoded. Directory values are normalized so entries
//! join cleanly under the model directory regardless of which platform
//! produced the manifest: backslashes become forward slashes and a single
//! leading slash is stripped.

use serde::Deserialize;
use std::path::PathBuf;

/// One file in a model package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    pub filename: String,
    /// Normalized subdirectory relative to the model directory. Empty for
    /// files at the model root.
    pub dir: String,
    /// Decoded size in bytes.
    pub size: u64,
    /// Expected CRC32 of the file contents, as hex digits.
    pub crc32: String,
}

/// Wire format row. `size` is string-encoded in the repository.
#[derive(Debug, Deserialize)]
struct RawModelFile {
    filename: String,
    dir: String,
    size: String,
    crc32: String,
}

impl ModelFile {
    /// Path of this file relative to the model cache directory.
    pub fn relative_path(&self) -> PathBuf {
        if self.dir.is_empty() {
            PathBuf::from(&self.filename)
        } else {
            PathBuf::from(&self.dir).join(&self.filename)
        }
    }

    /// URL suffix of this file relative to the model's remote directory.
    pub fn remote_suffix(&self) -> String {
        if self.dir.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.dir, self.filename)
        }
    }
}

fn normalize_dir(dir: &str) -> String {
    let dir = dir.replace('\\', "/");
    dir.strip_prefix('/').unwrap_or(&dir).to_string()
}

/// Parse a `files.json` document.
///
/// Tolerant at the document level: any malformation, including a single
/// entry with a non-numeric size, discards the whole document and returns an
/// empty list. Callers treat an empty list as "file list could not be
/// determined". Entries keep document order.
pub fn parse_manifest(bytes: &[u8]) -> Vec<ModelFile> {
    let raw: Vec<RawModelFile> = match serde_json::from_slice(bytes) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse model manifest");
            return Vec::new();
        }
    };

    let mut files = Vec::with_capacity(raw.len());
    for entry in raw {
        let size = match entry.size.trim().parse::<u64>() {
            Ok(size) => size,
            Err(_) => {
                tracing::warn!(
                    filename = %entry.filename,
                    size = %entry.size,
                    "manifest entry has a non-numeric size, discarding manifest"
                );
                return Vec::new();
            }
        };
        files.push(ModelFile {
            filename: entry.filename,
            dir: normalize_dir(&entry.dir),
            size,
            crc32: entry.crc32.trim().to_string(),
        });
    }

    files
}
