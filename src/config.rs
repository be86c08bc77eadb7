//! Configuration structures and loading logic

use crate::registry::{AiModels, AiRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Main sync configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the remote package repository. Must be set before any
    /// network operation; the default is empty and fails validation.
    pub base_url: String,
    /// Root directory of the local model cache.
    pub package_root: PathBuf,
    /// Retries after the first failed transfer attempt.
    pub max_retries: u32,
    /// A transfer attempt is abandoned after this long without receiving a
    /// byte.
    pub stall_timeout_ms: u64,
    pub cancel_poll_interval_ms: u64,
    pub progress_log_interval_ms: u64,
    /// AI families and their models, as declared by the host application.
    pub ais: Vec<AiModels>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            package_root: default_package_root(),
            max_retries: default_max_retries(),
            stall_timeout_ms: default_stall_timeout_ms(),
            cancel_poll_interval_ms: default_cancel_poll_interval_ms(),
            progress_log_interval_ms: default_progress_log_interval_ms(),
            ais: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config: SyncConfig = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(base_url) = std::env::var("MODEL_SYNC_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(root) = std::env::var("MODEL_SYNC_PACKAGE_ROOT") {
            config.package_root = PathBuf::from(root);
        }
        if let Ok(retries) = std::env::var("MODEL_SYNC_MAX_RETRIES") {
            config.max_retries = retries
                .parse()
                .context("Invalid MODEL_SYNC_MAX_RETRIES value")?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }
        if self.stall_timeout_ms == 0 {
            anyhow::bail!("stall_timeout_ms must be greater than zero");
        }
        if self.cancel_poll_interval_ms == 0 {
            anyhow::bail!("cancel_poll_interval_ms must be greater than zero");
        }

        let mut pkg_dirs = HashSet::new();
        for entry in &self.ais {
            if entry.ai.name.is_empty() {
                anyhow::bail!("AI name cannot be empty");
            }
            if entry.ai.pkg_dir.is_empty() {
                anyhow::bail!("AI '{}' has an empty pkg_dir", entry.ai.name);
            }
            if entry.ai.pkg_dir.contains('/') || entry.ai.pkg_dir.contains('\\') {
                anyhow::bail!(
                    "AI '{}' pkg_dir cannot contain path separators",
                    entry.ai.name
                );
            }
            if !pkg_dirs.insert(entry.ai.pkg_dir.to_lowercase()) {
                anyhow::bail!("Duplicate AI pkg_dir: {}", entry.ai.pkg_dir);
            }

            for model in &entry.models {
                if model.dir.is_empty() {
                    anyhow::bail!(
                        "Model '{}' of AI '{}' has an empty dir",
                        model.name,
                        entry.ai.name
                    );
                }
                if model.dir.contains('/') || model.dir.contains('\\') {
                    anyhow::bail!(
                        "Model '{}' dir cannot contain path separators",
                        model.name
                    );
                }
            }
        }

        Ok(())
    }

    /// Registry view over the configured AI families.
    pub fn registry(&self) -> AiRegistry {
        AiRegistry::new(self.ais.clone())
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }

    pub fn progress_log_interval(&self) -> Duration {
        Duration::from_millis(self.progress_log_interval_ms)
    }
}

// Default functions
fn default_package_root() -> PathBuf {
    dirs::cache_dir()
        .map(|c| c.join("model-sync/models"))
        .unwrap_or_else(|| PathBuf::from("/tmp/model-sync/models"))
}
fn default_max_retries() -> u32 {
    3
}
fn default_stall_timeout_ms() -> u64 {
    6000
}
fn default_cancel_poll_interval_ms() -> u64 {
    500
}
fn default_progress_log_interval_ms() -> u64 {
    200
}
