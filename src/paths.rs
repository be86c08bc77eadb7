//! Remote URL and local path layout
//!
//! Remote layout:
//! ```text
//! {base_url}/{ai}/{model}/files.json
//! {base_url}/{ai}/{model}/{dir}/{filename}
//! ```
//! with the AI package directory lower-cased. The local cache mirrors the
//! same shape under the package root, keeping the original casing:
//! ```text
//! {package_root}/{ai_pkg_dir}/{model}/...
//! ```

use crate::registry::Ai;
use std::path::{Path, PathBuf};

/// File name of the manifest, both remotely and in the local cache.
pub const MANIFEST_NAME: &str = "files.json";

/// Remote directory for a model. Trailing slashes on the base URL are
/// tolerated.
pub fn model_url(base_url: &str, ai: &Ai, model: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        ai.pkg_dir.to_lowercase(),
        model
    )
}

/// Remote location of a model's manifest.
pub fn manifest_url(base_url: &str, ai: &Ai, model: &str) -> String {
    format!("{}/{}", model_url(base_url, ai, model), MANIFEST_NAME)
}

/// Remote location of one manifest entry, given its suffix relative to the
/// model directory.
pub fn file_url(base_url: &str, ai: &Ai, model: &str, remote_suffix: &str) -> String {
    format!("{}/{}", model_url(base_url, ai, model), remote_suffix)
}

/// Local cache directory for a model.
pub fn model_dir(package_root: &Path, ai: &Ai, model: &str) -> PathBuf {
    package_root.join(&ai.pkg_dir).join(model)
}

/// Local path of a model's cached manifest.
pub fn manifest_path(package_root: &Path, ai: &Ai, model: &str) -> PathBuf {
    model_dir(package_root, ai, model).join(MANIFEST_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rife() -> Ai {
        Ai::new("RIFE", "RIFE-CUDA")
    }

    #[test]
    fn test_model_url_lowercases_ai_segment() {
        let url = model_url("http://host/pkgs", &rife(), "RIFE46");
        assert_eq!(url, "http://host/pkgs/rife-cuda/RIFE46");
    }

    #[test]
    fn test_trailing_slash_on_base_is_tolerated() {
        assert_eq!(
            manifest_url("http://host/pkgs/", &rife(), "RIFE46"),
            "http://host/pkgs/rife-cuda/RIFE46/files.json"
        );
        assert_eq!(
            manifest_url("http://host/pkgs", &rife(), "RIFE46"),
            "http://host/pkgs/rife-cuda/RIFE46/files.json"
        );
    }

    #[test]
    fn test_file_url_appends_suffix() {
        let url = file_url("http://host/pkgs", &rife(), "RIFE46", "weights/model.pth");
        assert_eq!(url, "http://host/pkgs/rife-cuda/RIFE46/weights/model.pth");
    }

    #[test]
    fn test_local_dir_preserves_pkg_dir_casing() {
        let dir = model_dir(Path::new("/data/pkgs"), &rife(), "RIFE46");
        assert_eq!(dir, PathBuf::from("/data/pkgs/RIFE-CUDA/RIFE46"));
    }

    #[test]
    fn test_manifest_path_sits_in_model_dir() {
        let path = manifest_path(Path::new("/data/pkgs"), &rife(), "RIFE46");
        assert_eq!(path, PathBuf::from("/data/pkgs/RIFE-CUDA/RIFE46/files.json"));
    }
}
