//! Model Sync - manifest-driven model package cache
//!
//! A library that keeps a local cache of AI model packages in sync with a
//! remote package repository: fetch a model's `files.json` manifest, stream
//! every listed file to disk with stall detection and bounded retry, and
//! verify the result byte for byte against CRC32 checksums. All long-running
//! work cooperates with an explicit cancellation token.

pub mod cancel;
pub mod config;
pub mod download;
pub mod error;
pub mod integrity;
pub mod inventory;
pub mod manifest;
pub mod paths;
pub mod registry;
pub mod sync;

pub use cancel::CancelToken;
pub use config::SyncConfig;
pub use download::{DOWNLOAD_FAILED_MSG, DownloadProgress, Downloader, FetchStatus};
pub use error::{SyncError, SyncResult};
pub use integrity::IntegrityError;
pub use inventory::CachedModel;
pub use manifest::ModelFile;
pub use registry::{Ai, AiModels, AiRegistry, ModelRef};
pub use sync::{ModelSyncer, SyncOutcome};
