//! Model sync orchestration
//!
//! Brings one model's local cache in line with the remote package: validate
//! what is already on disk, fetch the manifest, fetch every listed file in
//! order, validate again. The public entry point never returns an error.
//! Fatal failures are logged with full detail, folded into the cancellation
//! token as a short reason and reported as a cancelled outcome, so a sync
//! run always ends in a state the host application can present.

use crate::cancel::CancelToken;
use crate::config::SyncConfig;
use crate::download::{DownloadProgress, Downloader, FetchStatus};
use crate::error::{SyncError, SyncResult};
use crate::registry::Ai;
use crate::{integrity, manifest, paths};
use std::path::PathBuf;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Result of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Cache was already valid; no network traffic happened.
    UpToDate,
    /// Files were fetched and the cache now validates.
    Synced,
    /// The run stopped early, on external request or after a reported
    /// failure. The token's reason says which.
    Cancelled,
}

pub struct ModelSyncer {
    config: SyncConfig,
    downloader: Downloader,
}

impl ModelSyncer {
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let downloader = Downloader::new(&config)?;
        Ok(Self { config, downloader })
    }

    /// Token wired to the configured cancellation poll interval.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken::with_poll_interval(self.config.cancel_poll_interval())
    }

    /// Watch channel publishing per-transfer progress.
    pub fn progress(&self) -> watch::Receiver<DownloadProgress> {
        self.downloader.progress()
    }

    /// Per-transfer progress as an async stream.
    pub fn progress_stream(&self) -> WatchStream<DownloadProgress> {
        self.downloader.progress_stream()
    }

    /// Local cache directory for a model.
    pub fn model_dir(&self, ai: &Ai, model: &str) -> PathBuf {
        paths::model_dir(&self.config.package_root, ai, model)
    }

    /// Whether the cached model currently validates.
    pub async fn is_valid(&self, ai: &Ai, model: &str) -> bool {
        integrity::is_model_dir_valid(&self.model_dir(ai, model)).await
    }

    /// Bring the local cache for `model` up to date.
    ///
    /// Idempotent: a valid cache short-circuits to [`SyncOutcome::UpToDate`]
    /// without touching the network, and re-running after any outcome is
    /// safe. Never returns an error; see the module docs.
    pub async fn sync(&self, ai: &Ai, model: &str, cancel: &CancelToken) -> SyncOutcome {
        match self.run_sync(ai, model, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(ai = %ai.name, model = %model, error = %e, "model sync failed");
                cancel.cancel_with_reason(e.user_message());
                SyncOutcome::Cancelled
            }
        }
    }

    async fn run_sync(
        &self,
        ai: &Ai,
        model: &str,
        cancel: &CancelToken,
    ) -> SyncResult<SyncOutcome> {
        let dir = self.model_dir(ai, model);

        if integrity::is_model_dir_valid(&dir).await {
            tracing::info!(ai = %ai.name, model = %model, "model cache is up to date");
            return Ok(SyncOutcome::UpToDate);
        }

        if cancel.is_cancelled() {
            return Ok(SyncOutcome::Cancelled);
        }

        tokio::fs::create_dir_all(&dir).await?;

        let manifest_url = paths::manifest_url(&self.config.base_url, ai, model);
        let manifest_path = paths::manifest_path(&self.config.package_root, ai, model);
        match self
            .downloader
            .fetch(&manifest_url, &manifest_path, cancel)
            .await?
        {
            FetchStatus::Cancelled => return Ok(SyncOutcome::Cancelled),
            FetchStatus::Completed => {}
        }

        let bytes = tokio::fs::read(&manifest_path).await?;
        let files = manifest::parse_manifest(&bytes);
        if files.is_empty() {
            return Err(SyncError::EmptyManifest {
                ai: ai.name.clone(),
                model: model.to_string(),
            });
        }

        let total_bytes: u64 = files.iter().map(|f| f.size).sum();
        tracing::info!(
            ai = %ai.name,
            model = %model,
            files = files.len(),
            total_bytes,
            "fetching model files"
        );

        for file in &files {
            if cancel.is_cancelled() {
                return Ok(SyncOutcome::Cancelled);
            }
            let url = paths::file_url(&self.config.base_url, ai, model, &file.remote_suffix());
            let dest = dir.join(file.relative_path());
            match self.downloader.fetch(&url, &dest, cancel).await? {
                FetchStatus::Cancelled => return Ok(SyncOutcome::Cancelled),
                FetchStatus::Completed => {}
            }
        }

        integrity::check_model_dir(&dir).await?;
        tracing::info!(ai = %ai.name, model = %model, "model synced");
        Ok(SyncOutcome::Synced)
    }
}
