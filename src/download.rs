//! Streaming download engine with stall detection and bounded retry
//!
//! One [`Downloader`] owns the HTTP connection pool and is shared by every
//! fetch of a sync run. A transfer attempt streams the response body to disk
//! and is abandoned when no bytes arrive within the stall window; failed or
//! stalled attempts are retried up to `max_retries` times. Exhausting the
//! budget cancels the whole sync through the shared token.
//!
//! Progress is published on a watch channel so observers can sample the
//! latest state without backpressure on the transfer.

use crate::cancel::CancelToken;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::{Instant, timeout};
use tokio_stream::wrappers::WatchStream;

/// Reason reported through the cancellation token when the retry budget is
/// exhausted. This exact string is what the host application displays.
pub const DOWNLOAD_FAILED_MSG: &str = "Model download failed.";

/// Snapshot of one transfer's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    pub url: String,
    pub received: u64,
    /// Content-Length, when the server provides one.
    pub total: Option<u64>,
    /// Integer percent, when the total is known.
    pub percent: Option<u8>,
}

/// Terminal state of a fetch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Completed,
    Cancelled,
}

/// Outcome of a single transfer attempt.
enum Attempt {
    Done(u64),
    Stalled,
    Failed(reqwest::Error),
    Cancelled,
}

pub struct Downloader {
    client: reqwest::Client,
    stall_timeout: Duration,
    max_retries: u32,
    progress_log_interval: Duration,
    progress_tx: watch::Sender<DownloadProgress>,
}

impl Downloader {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.stall_timeout())
            .build()?;
        let (progress_tx, _) = watch::channel(DownloadProgress::default());

        Ok(Self {
            client,
            stall_timeout: config.stall_timeout(),
            max_retries: config.max_retries,
            progress_log_interval: config.progress_log_interval(),
            progress_tx,
        })
    }

    /// Watch channel carrying the latest transfer progress.
    pub fn progress(&self) -> watch::Receiver<DownloadProgress> {
        self.progress_tx.subscribe()
    }

    /// Progress as an async stream, starting from the current snapshot.
    /// Intermediate snapshots are coalesced when the consumer lags.
    pub fn progress_stream(&self) -> WatchStream<DownloadProgress> {
        WatchStream::new(self.progress_tx.subscribe())
    }

    /// Fetch `url` into `dest`, retrying failed or stalled attempts.
    ///
    /// When `dest` is an existing directory the file keeps its URL basename.
    /// Cancellation returns [`FetchStatus::Cancelled`] without retrying and
    /// leaves any partial file for the next run to re-validate. Exhausting
    /// the retry budget cancels the whole sync with [`DOWNLOAD_FAILED_MSG`]
    /// and returns [`SyncError::RetriesExhausted`].
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelToken,
    ) -> SyncResult<FetchStatus> {
        let dest = resolve_dest(url, dest);
        let mut remaining = self.max_retries;

        loop {
            if cancel.is_cancelled() {
                return Ok(FetchStatus::Cancelled);
            }

            match self.attempt(url, &dest, cancel).await? {
                Attempt::Done(bytes) => {
                    tracing::info!(url = %url, bytes, "download complete");
                    return Ok(FetchStatus::Completed);
                }
                Attempt::Cancelled => return Ok(FetchStatus::Cancelled),
                Attempt::Stalled => {
                    tracing::warn!(
                        url = %url,
                        stall_ms = self.stall_timeout.as_millis() as u64,
                        retries_left = remaining,
                        "no data received within the stall window"
                    );
                }
                Attempt::Failed(e) => {
                    tracing::warn!(url = %url, error = %e, retries_left = remaining, "transfer attempt failed");
                }
            }

            if remaining == 0 {
                let attempts = self.max_retries + 1;
                tracing::error!(url = %url, attempts, "download failed, retry budget exhausted");
                cancel.cancel_with_reason(DOWNLOAD_FAILED_MSG);
                return Err(SyncError::RetriesExhausted {
                    url: url.to_string(),
                    attempts,
                });
            }
            remaining -= 1;
        }
    }

    /// One transfer attempt. `Err` means a local filesystem problem that a
    /// retry will not fix; everything transport-related comes back as an
    /// [`Attempt`] so the caller can apply the retry budget.
    async fn attempt(&self, url: &str, dest: &Path, cancel: &CancelToken) -> SyncResult<Attempt> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Fresh attempts never append or resume.
        match tokio::fs::remove_file(dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // The stall window covers the request and response exchange as well
        // as every body chunk.
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(Attempt::Cancelled),
            result = timeout(self.stall_timeout, self.client.get(url).send()) => {
                match result {
                    Err(_) => return Ok(Attempt::Stalled),
                    Ok(Err(e)) => return Ok(Attempt::Failed(e)),
                    Ok(Ok(response)) => match response.error_for_status() {
                        Err(e) => return Ok(Attempt::Failed(e)),
                        Ok(response) => response,
                    },
                }
            }
        };

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut received: u64 = 0;
        let mut last_logged = Instant::now();
        let mut last_percent: Option<u8> = None;

        self.publish(url, 0, total);

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(url = %url, received, "download cancelled");
                    // The partial file stays; the next sync re-validates it.
                    return Ok(Attempt::Cancelled);
                }
                next = timeout(self.stall_timeout, stream.next()) => {
                    match next {
                        Err(_) => return Ok(Attempt::Stalled),
                        Ok(None) => break,
                        Ok(Some(Err(e))) => return Ok(Attempt::Failed(e)),
                        Ok(Some(Ok(chunk))) => chunk,
                    }
                }
            };

            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            let percent = total.map(|t| percent_of(received, t));
            if last_logged.elapsed() >= self.progress_log_interval
                && percent_changed(percent, last_percent)
            {
                match (percent, total) {
                    (Some(p), Some(t)) => {
                        tracing::info!(url = %url, received, total = t, percent = p, "downloading")
                    }
                    _ => tracing::info!(url = %url, received, "downloading"),
                }
                last_logged = Instant::now();
                last_percent = percent;
            }
            self.publish(url, received, total);
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(Attempt::Done(received))
    }

    fn publish(&self, url: &str, received: u64, total: Option<u64>) {
        self.progress_tx.send_replace(DownloadProgress {
            url: url.to_string(),
            received,
            total,
            percent: total.map(|t| percent_of(received, t)),
        });
    }
}

fn percent_of(received: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (received.saturating_mul(100) / total).min(100) as u8
}

/// Progress with a known total only logs when the integer percent moves;
/// without a total the interval throttle alone applies.
fn percent_changed(percent: Option<u8>, last: Option<u8>) -> bool {
    match (percent, last) {
        (Some(p), Some(last)) => p != last,
        _ => true,
    }
}

fn basename_from_url(url: &str) -> &str {
    let name = url.rsplit('/').next().unwrap_or(url);
    let name = name.split('?').next().unwrap_or(name);
    if name.is_empty() { "download" } else { name }
}

fn resolve_dest(url: &str, dest: &Path) -> PathBuf {
    if dest.is_dir() {
        dest.join(basename_from_url(url))
    } else {
        dest.to_path_buf()
    }
}
