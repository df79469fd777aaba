//! One directory per upload session.
//!
//! Layout: `<root>/<uuid>/index.json`. A session becomes visible only when its directory is
//! renamed into place from `<root>/.staging-<uuid>`, and it disappears by being renamed to
//! `<root>/.evicted-<uuid>` before deletion. Readers therefore see either a complete index or
//! no session at all, without any per-session locking. Indexes are never rewritten after
//! publication.
//!
//! Session identifiers arriving from clients are parsed as UUIDs and re-rendered in canonical
//! form before touching the filesystem, so only directories this store created can be loaded.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use uuid::Uuid;
use walkdir::WalkDir;

use super::index::VectorIndex;
use super::types::StoreError;

/// File holding the serialized index inside each session directory.
pub const INDEX_FILE_NAME: &str = "index.json";

const STAGING_PREFIX: &str = ".staging-";
const EVICTED_PREFIX: &str = ".evicted-";
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Filesystem-backed registry of session indexes.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

/// Counts produced by one eviction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Published sessions removed because they outlived the TTL.
    pub evicted: usize,
    /// Abandoned staging or eviction directories removed.
    pub cleaned: usize,
}

impl SessionStore {
    /// Open (creating if necessary) the store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "Session store ready");
        Ok(Self { root })
    }

    /// Root directory containing session subdirectories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `index` under a freshly generated session identifier and return it.
    pub async fn create(&self, index: &VectorIndex) -> Result<String, StoreError> {
        let session_id = Uuid::new_v4().to_string();
        let staging = self.root.join(format!("{STAGING_PREFIX}{session_id}"));
        let target = self.root.join(&session_id);

        match self.publish(index, &staging, &target).await {
            Ok(()) => {
                tracing::debug!(
                    session_id = %session_id,
                    chunks = index.len(),
                    "Session published"
                );
                Ok(session_id)
            }
            Err(error) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        tracing::warn!(
                            path = %staging.display(),
                            error = %cleanup,
                            "Failed to remove staging directory"
                        );
                    }
                }
                Err(error)
            }
        }
    }

    async fn publish(
        &self,
        index: &VectorIndex,
        staging: &Path,
        target: &Path,
    ) -> Result<(), StoreError> {
        let bytes = {
            let index = index.clone();
            tokio::task::spawn_blocking(move || index.to_json_bytes()).await??
        };
        tokio::fs::create_dir(staging).await?;
        tokio::fs::write(staging.join(INDEX_FILE_NAME), bytes).await?;
        tokio::fs::rename(staging, target).await?;
        Ok(())
    }

    /// Load the index published for `session_id`.
    ///
    /// Returns [`StoreError::SessionNotFound`] for malformed identifiers and for sessions that
    /// were never published or have been evicted.
    pub async fn load(&self, session_id: &str) -> Result<VectorIndex, StoreError> {
        let dir = self
            .session_dir(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

        let bytes = match tokio::fs::read(dir.join(INDEX_FILE_NAME)).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }
            Err(error) => return Err(error.into()),
        };

        tokio::task::spawn_blocking(move || VectorIndex::from_json_bytes(&bytes)).await?
    }

    fn session_dir(&self, session_id: &str) -> Option<PathBuf> {
        let parsed = Uuid::parse_str(session_id.trim()).ok()?;
        Some(self.root.join(parsed.hyphenated().to_string()))
    }

    /// Remove sessions (and abandoned transient directories) older than `ttl`.
    pub async fn evict_expired(&self, ttl: Duration) -> Result<SweepReport, StoreError> {
        let root = self.root.clone();
        let now = SystemTime::now();
        tokio::task::spawn_blocking(move || sweep(&root, ttl, now)).await?
    }
}

fn sweep(root: &Path, ttl: Duration, now: SystemTime) -> Result<SweepReport, StoreError> {
    let mut report = SweepReport::default();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(error = %error, "Skipping unreadable store entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let modified = match entry.metadata().ok().and_then(|meta| meta.modified().ok()) {
            Some(modified) => modified,
            None => continue,
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age < ttl {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        if name.starts_with(STAGING_PREFIX) || name.starts_with(EVICTED_PREFIX) {
            remove_quietly(path);
            report.cleaned += 1;
        } else if Uuid::parse_str(&name).is_ok() {
            let tombstone = root.join(format!("{EVICTED_PREFIX}{name}"));
            if let Err(error) = std::fs::rename(path, &tombstone) {
                tracing::warn!(session_id = %name, error = %error, "Failed to evict session");
                continue;
            }
            remove_quietly(&tombstone);
            tracing::info!(session_id = %name, age_secs = age.as_secs(), "Session evicted");
            report.evicted += 1;
        }
    }

    Ok(report)
}

fn remove_quietly(path: &Path) {
    if let Err(error) = std::fs::remove_dir_all(path) {
        if error.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %error, "Failed to remove directory");
        }
    }
}

/// Periodically evict sessions older than `ttl` for the lifetime of the process.
pub fn spawn_session_sweeper(store: SessionStore, ttl: Duration) -> JoinHandle<()> {
    let period = ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match store.evict_expired(ttl).await {
                Ok(report) if report != SweepReport::default() => {
                    tracing::info!(
                        evicted = report.evicted,
                        cleaned = report.cleaned,
                        "Session sweep finished"
                    );
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(error = %error, "Session sweep failed"),
            }
        }
    })
}
