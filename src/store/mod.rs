//! Timing persistence.
//!
//! Alignment hands finished timings to a [`TimingStore`] once per job.  The
//! store is optional and best-effort: a failure is logged by the caller and
//! never changes the alignment result.
//!
//! * [`TimingStore`]: async trait implemented by all storage backends.
//! * [`JsonFileTimingStore`]: one pretty-printed JSON file per project.
//! * [`StoreError`]: error variants for store calls.

pub mod json;

use async_trait::async_trait;
use thiserror::Error;

use crate::align::UnitTiming;

pub use json::JsonFileTimingStore;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid project id: {0:?}")]
    InvalidProjectId(String),
}

// ---------------------------------------------------------------------------
// TimingStore trait
// ---------------------------------------------------------------------------

/// Persists the timings computed for one project.
#[async_trait]
pub trait TimingStore: Send + Sync {
    /// Replace whatever was stored for `project_id` with `timings`.
    async fn store(&self, project_id: &str, timings: &[UnitTiming]) -> Result<(), StoreError>;
}

// Compile-time object-safety check.
const _: fn() = || {
    fn _assert_object_safe(_: &dyn TimingStore) {}
};

// ---------------------------------------------------------------------------
// MemoryTimingStore  (test-only)
// ---------------------------------------------------------------------------

/// A test double that keeps every stored batch in memory, or fails every
/// call when built with [`failing`](MemoryTimingStore::failing).
#[cfg(test)]
pub struct MemoryTimingStore {
    saved: std::sync::Mutex<Vec<(String, Vec<UnitTiming>)>>,
    fail: bool,
}

#[cfg(test)]
impl MemoryTimingStore {
    pub fn new() -> Self {
        Self {
            saved: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn saved(&self) -> Vec<(String, Vec<UnitTiming>)> {
        self.saved.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl TimingStore for MemoryTimingStore {
    async fn store(&self, project_id: &str, timings: &[UnitTiming]) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only store",
            )));
        }
        self.saved
            .lock()
            .unwrap()
            .push((project_id.to_string(), timings.to_vec()));
        Ok(())
    }
}
