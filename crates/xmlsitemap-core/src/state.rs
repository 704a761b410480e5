//! Process-wide flags and counters shared between the link store and the
//! generation pipeline.
//!
//! - `regenerate_needed`: rendered files are stale relative to the link store.
//! - `rebuild_needed`: the link store itself is stale and must be re-scanned.
//! - `generated_last`: unix time of the last successful regeneration.

use crate::persist::{read_json, write_json_atomic};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Snapshot of every state value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSnapshot {
    /// Rendered output is stale.
    pub regenerate_needed: bool,
    /// Link store is stale.
    pub rebuild_needed: bool,
    /// Unix time of the last successful regeneration.
    pub generated_last: i64,
}

/// Key-value state consumed by the engine.
pub trait StateStore: Send + Sync {
    /// Read every value.
    fn snapshot(&self) -> Result<StateSnapshot>;
    /// Apply a change to the stored values.
    fn update(&self, f: &mut dyn FnMut(&mut StateSnapshot)) -> Result<()>;

    /// Whether rendered output is stale.
    fn regenerate_needed(&self) -> Result<bool> {
        Ok(self.snapshot()?.regenerate_needed)
    }

    /// Set or clear the regeneration flag.
    fn set_regenerate_needed(&self, value: bool) -> Result<()> {
        self.update(&mut |s| s.regenerate_needed = value)
    }

    /// Whether the link store must be rebuilt.
    fn rebuild_needed(&self) -> Result<bool> {
        Ok(self.snapshot()?.rebuild_needed)
    }

    /// Set or clear the rebuild flag.
    fn set_rebuild_needed(&self, value: bool) -> Result<()> {
        self.update(&mut |s| s.rebuild_needed = value)
    }

    /// Unix time of the last successful regeneration, 0 when never.
    fn generated_last(&self) -> Result<i64> {
        Ok(self.snapshot()?.generated_last)
    }

    /// Record a successful regeneration.
    fn set_generated_last(&self, timestamp: i64) -> Result<()> {
        self.update(&mut |s| s.generated_last = timestamp)
    }
}

/// State held only in memory.
#[derive(Debug, Default)]
pub struct MemoryState {
    inner: RwLock<StateSnapshot>,
}

impl MemoryState {
    /// Create state with every flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state from an initial snapshot.
    pub fn with_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }
}

impl StateStore for MemoryState {
    fn snapshot(&self) -> Result<StateSnapshot> {
        self.inner
            .read()
            .map(|s| *s)
            .map_err(|_| Error::Storage("State lock poisoned".into()))
    }

    fn update(&self, f: &mut dyn FnMut(&mut StateSnapshot)) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| Error::Storage("State lock poisoned".into()))?;
        f(&mut guard);
        Ok(())
    }
}

/// State persisted to a JSON file after every change.
#[derive(Debug)]
pub struct FileState {
    path: PathBuf,
    inner: RwLock<StateSnapshot>,
}

impl FileState {
    /// Open (or start) the state file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            inner: RwLock::new(snapshot),
        })
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileState {
    fn snapshot(&self) -> Result<StateSnapshot> {
        self.inner
            .read()
            .map(|s| *s)
            .map_err(|_| Error::Storage("State lock poisoned".into()))
    }

    fn update(&self, f: &mut dyn FnMut(&mut StateSnapshot)) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| Error::Storage("State lock poisoned".into()))?;
        let mut next = *guard;
        f(&mut next);
        if next != *guard {
            write_json_atomic(&self.path, &next)?;
            *guard = next;
        }
        Ok(())
    }
}
