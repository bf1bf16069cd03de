//! JSON-file timing store.
//!
//! Each project is written to `<dir>/<project_id>.json`:
//!
//! | Platform | Default directory |
//! |----------|-------------------|
//! | Windows  | `%LOCALAPPDATA%\narration-sync\timings\` |
//! | macOS    | `~/Library/Application Support/narration-sync/timings/` |
//! | Linux    | `~/.local/share/narration-sync/timings/` |
//!
//! The file is written to a sibling temp path first and then renamed, so a
//! reader never sees a half-written document.  Temp names carry the process
//! id and a counter so concurrent stores never share one, and a temp file
//! is removed again when its write or rename fails.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::align::UnitTiming;

use super::{StoreError, TimingStore};

/// On-disk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTimings {
    project_id: String,
    timings: Vec<UnitTiming>,
}

pub struct JsonFileTimingStore {
    dir: PathBuf,
}

impl JsonFileTimingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a project's timings are written to.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidProjectId`] when the id is empty or contains
    /// anything other than ASCII letters, digits, `-`, `_` and `.` (or is
    /// made only of dots).
    pub fn path_for(&self, project_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !project_id.is_empty()
            && !project_id.chars().all(|c| c == '.')
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidProjectId(project_id.to_string()));
        }
        Ok(self.dir.join(format!("{project_id}.json")))
    }

    /// Read back the timings last stored for `project_id`.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    pub async fn load(&self, project_id: &str) -> Result<Option<Vec<UnitTiming>>, StoreError> {
        let path = self.path_for(project_id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc: StoredTimings = serde_json::from_str(&data)?;
        Ok(Some(doc.timings))
    }
}

#[async_trait]
impl TimingStore for JsonFileTimingStore {
    async fn store(&self, project_id: &str, timings: &[UnitTiming]) -> Result<(), StoreError> {
        let path = self.path_for(project_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let doc = StoredTimings {
            project_id: project_id.to_string(),
            timings: timings.to_vec(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let tmp = temp_path_for(&path);
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                log::debug!("store: could not remove {}: {cleanup}", tmp.display());
            }
            return Err(e.into());
        }

        log::info!(
            "store: wrote {} timings for {project_id:?} to {}",
            timings.len(),
            path.display()
        );
        Ok(())
    }
}

/// Unique sibling of `path`: `<name>.<pid>.<n>.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    path.with_file_name(name)
}
