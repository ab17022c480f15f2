//! Per-request working directories
//!
//! Every conversion gets its own `job-*` directory under the configured base
//! root. The directory is removed when the [`JobDir`] guard drops, on success
//! and failure alike, unless retention is enabled. A background reaper sweeps
//! directories that outlive the configured max age (retained ones, or ones a
//! crashed process left behind).

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use axum::body::Bytes;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::{WorkspaceConfig, DEFAULT_UPLOAD_NAME};
use crate::error::Result;

const JOB_DIR_PREFIX: &str = "job-";

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

impl Upload {
    /// Create an upload, reducing the client name to a safe base name
    pub fn new(client_name: Option<&str>, data: Bytes) -> Self {
        Self {
            file_name: sanitize_file_name(client_name),
            data,
        }
    }
}

/// Strip directory components from a client-supplied name.
///
/// Absent or unusable names fall back to [`DEFAULT_UPLOAD_NAME`].
pub fn sanitize_file_name(client_name: Option<&str>) -> String {
    let base = client_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .unwrap_or("");

    match base {
        "" | "." | ".." => DEFAULT_UPLOAD_NAME.to_string(),
        name if name.contains('\0') => DEFAULT_UPLOAD_NAME.to_string(),
        name => name.to_string(),
    }
}

/// Base root for job directories
#[derive(Debug, Clone)]
pub struct Workspace {
    base_dir: PathBuf,
    keep_work_dirs: bool,
}

impl Workspace {
    /// Create the base root if it does not exist yet
    pub fn init(config: &WorkspaceConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.base_dir)?;
        Ok(Self {
            base_dir: std::fs::canonicalize(&config.base_dir)?,
            keep_work_dirs: config.keep_work_dirs,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Allocate a fresh, uniquely named job directory
    pub fn create_job(&self) -> Result<JobDir> {
        let dir = tempfile::Builder::new()
            .prefix(JOB_DIR_PREFIX)
            .keep(self.keep_work_dirs)
            .tempdir_in(&self.base_dir)?;

        Ok(JobDir {
            id: Uuid::new_v4(),
            dir,
        })
    }

    /// Remove job directories whose last modification is at least `max_age` ago.
    ///
    /// Returns the number of directories removed.
    pub async fn reap_stale(&self, max_age: Duration) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(base_dir = %self.base_dir.display(), "Cannot scan work dir: {}", e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_job = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(JOB_DIR_PREFIX));
            if !is_job {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if age.is_some_and(|age| age >= max_age) {
                match tokio::fs::remove_dir_all(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(
                        path = %entry.path().display(),
                        "Failed to remove stale job dir: {}",
                        e
                    ),
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Reaped stale job directories");
        }

        removed
    }

    /// Start background reaper task
    pub fn start_reaper(self, interval: Duration, max_age: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);

            loop {
                interval.tick().await;
                self.reap_stale(max_age).await;
            }
        })
    }
}

/// Scratch directory owned by a single conversion request
pub struct JobDir {
    id: Uuid,
    dir: TempDir,
}

impl JobDir {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the upload verbatim into the job directory
    pub async fn persist_upload(&self, upload: &Upload) -> Result<PathBuf> {
        let path = self.path().join(&upload.file_name);
        tokio::fs::write(&path, &upload.data).await?;
        Ok(path)
    }
}

impl std::fmt::Debug for JobDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDir")
            .field("id", &self.id)
            .field("path", &self.path())
            .finish()
    }
}
