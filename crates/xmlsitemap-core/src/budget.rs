//! Memory budget for generation runs.
//!
//! The optimum grows with the chunk size and, when aliases are prefetched,
//! with the number of alias rows held in memory. A ceiling is only ever
//! raised towards the optimum, never lowered.

use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use sysinfo::System;
use tracing::{debug, info};

/// Baseline memory of a generation run.
pub const BASE_FLOOR: u64 = 32 * 1024 * 1024;

/// Estimated bytes per link in one chunk.
pub const PER_LINK: u64 = 500;

/// Estimated bytes per prefetched alias row.
pub const PER_ALIAS: u64 = 250;

/// Bytes a run over `chunk_size` links should be allowed to use.
///
/// ```rust
/// use xmlsitemap_core::budget::{optimal_limit, BASE_FLOOR};
///
/// assert_eq!(optimal_limit(1000, 0, true), BASE_FLOOR + 500_000);
/// assert_eq!(optimal_limit(1000, 4000, true), BASE_FLOOR + 500_000 + 1_000_000);
/// assert_eq!(optimal_limit(1000, 4000, false), BASE_FLOOR + 500_000);
/// ```
pub fn optimal_limit(chunk_size: usize, alias_rows: usize, prefetch_aliases: bool) -> u64 {
    let links = (chunk_size as u64).saturating_mul(PER_LINK);
    let aliases = if prefetch_aliases {
        (alias_rows as u64).saturating_mul(PER_ALIAS)
    } else {
        0
    };
    BASE_FLOOR.saturating_add(links).saturating_add(aliases)
}

/// Current memory ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLimit {
    /// No ceiling.
    Unlimited,
    /// Ceiling in bytes.
    Bytes(u64),
}

/// A memory ceiling that may be adjustable at runtime.
pub trait MemoryCeiling: Send + Sync {
    /// Current ceiling.
    fn current(&self) -> MemoryLimit;

    /// Whether [`MemoryCeiling::set`] has any effect.
    fn is_adjustable(&self) -> bool;

    /// Replace the ceiling.
    fn set(&self, bytes: u64) -> Result<()>;
}

/// Soft in-process ceiling, seeded from configuration.
#[derive(Debug)]
pub struct ProcessCeiling {
    // 0 means unlimited
    limit: AtomicU64,
    adjustable: bool,
}

impl ProcessCeiling {
    /// Adjustable ceiling; `None` is unlimited.
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit: AtomicU64::new(limit.unwrap_or(0)),
            adjustable: true,
        }
    }

    /// Ceiling that cannot be changed at runtime.
    pub fn fixed(bytes: u64) -> Self {
        Self {
            limit: AtomicU64::new(bytes),
            adjustable: false,
        }
    }
}

impl MemoryCeiling for ProcessCeiling {
    fn current(&self) -> MemoryLimit {
        match self.limit.load(Ordering::Acquire) {
            0 => MemoryLimit::Unlimited,
            bytes => MemoryLimit::Bytes(bytes),
        }
    }

    fn is_adjustable(&self) -> bool {
        self.adjustable
    }

    fn set(&self, bytes: u64) -> Result<()> {
        if !self.adjustable {
            return Err(Error::Config("memory ceiling is not adjustable".into()));
        }
        self.limit.store(bytes, Ordering::Release);
        Ok(())
    }
}

/// Total physical memory in bytes, `None` when unknown.
pub fn system_memory() -> Option<u64> {
    let mut system = System::new();
    system.refresh_memory();
    Some(system.total_memory()).filter(|total| *total > 0)
}

/// Resident memory of this process in bytes, `None` when unknown.
pub fn resident_memory() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(sysinfo::Process::memory)
}

/// The computed optimum for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    optimum: u64,
}

impl MemoryBudget {
    /// Budget for a run, clamped to `system_total` when known.
    pub fn new(chunk_size: usize, alias_rows: usize, prefetch_aliases: bool, system_total: Option<u64>) -> Self {
        let optimum = optimal_limit(chunk_size, alias_rows, prefetch_aliases);
        Self {
            optimum: system_total.map_or(optimum, |total| optimum.min(total)),
        }
    }

    /// Bytes the run should be allowed to use.
    pub const fn optimum(&self) -> u64 {
        self.optimum
    }

    /// Raise the ceiling to the optimum if it is lower.
    ///
    /// Returns whether the ceiling changed. Unlimited or fixed ceilings are
    /// left alone.
    pub fn apply(&self, ceiling: &dyn MemoryCeiling) -> Result<bool> {
        if !ceiling.is_adjustable() {
            debug!("memory ceiling not adjustable");
            return Ok(false);
        }
        match ceiling.current() {
            MemoryLimit::Unlimited => Ok(false),
            MemoryLimit::Bytes(current) if current >= self.optimum => Ok(false),
            MemoryLimit::Bytes(current) => {
                ceiling.set(self.optimum)?;
                info!(from = current, to = self.optimum, "raised memory ceiling");
                Ok(true)
            },
        }
    }
}
