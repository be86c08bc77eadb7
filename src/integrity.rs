//! Local cache integrity validation
//!
//! A model directory is valid when its cached manifest parses and every
//! listed file matches its CRC32 checksum byte for byte. Validation is
//! read-only and deterministic; it stops at the first failure so a missing
//! first file never pays for hashing the rest.

use crate::manifest::{self, ModelFile};
use crate::paths::MANIFEST_NAME;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Cached manifests smaller than this are treated as corrupt. A real
/// manifest with a single entry is already larger.
pub const MIN_MANIFEST_BYTES: u64 = 32;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("model directory missing: {0}")]
    DirMissing(PathBuf),

    #[error("manifest missing or truncated: {0}")]
    ManifestMissing(PathBuf),

    #[error("manifest has no entries: {0}")]
    ManifestEmpty(PathBuf),

    #[error("file missing: {0}")]
    FileMissing(PathBuf),

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Validate a model cache directory against its cached manifest.
///
/// Returns the first failure encountered, in manifest order.
pub async fn check_model_dir(dir: &Path) -> Result<(), IntegrityError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return Err(IntegrityError::DirMissing(dir.to_path_buf())),
    }

    let manifest_path = dir.join(MANIFEST_NAME);
    let manifest_len = match tokio::fs::metadata(&manifest_path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return Err(IntegrityError::ManifestMissing(manifest_path)),
    };
    if manifest_len < MIN_MANIFEST_BYTES {
        return Err(IntegrityError::ManifestMissing(manifest_path));
    }

    let bytes = tokio::fs::read(&manifest_path)
        .await
        .map_err(|source| IntegrityError::Unreadable {
            path: manifest_path.clone(),
            source,
        })?;
    let files = manifest::parse_manifest(&bytes);
    if files.is_empty() {
        return Err(IntegrityError::ManifestEmpty(manifest_path));
    }

    for file in &files {
        check_file(dir, file).await?;
    }

    Ok(())
}

async fn check_file(dir: &Path, file: &ModelFile) -> Result<(), IntegrityError> {
    let path = dir.join(file.relative_path());
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(IntegrityError::FileMissing(path)),
    }

    let actual = file_crc32(&path)
        .await
        .map_err(|source| IntegrityError::Unreadable {
            path: path.clone(),
            source,
        })?;

    if !crc_matches(&file.crc32, &actual) {
        tracing::warn!(
            path = %path.display(),
            expected = %file.crc32,
            actual = %actual,
            "checksum mismatch"
        );
        return Err(IntegrityError::ChecksumMismatch {
            path,
            expected: file.crc32.clone(),
            actual,
        });
    }

    Ok(())
}

/// Collapse the failure detail to a bool for callers that only branch.
pub async fn is_model_dir_valid(dir: &Path) -> bool {
    match check_model_dir(dir).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), reason = %e, "model cache invalid");
            false
        }
    }
}

/// CRC32 of a file's contents, rendered as 8 lowercase hex digits.
pub async fn file_crc32(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:08x}", hasher.finalize()))
}

/// Manifests are hand-maintained in places, so checksums are compared after
/// trimming and without regard to hex case.
fn crc_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}
