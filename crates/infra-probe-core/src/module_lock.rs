// crates/infra-probe-core/src/module_lock.rs
// ============================================================================
// Module: Module Locks
// Description: Per-directory exclusion for cases that share a module.
// Purpose: Keep cases on one module directory from sharing live state.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! Terraform keeps its local state and `.terraform` directory inside the
//! module directory, so two cases applying the same directory at once would
//! overwrite each other's state and destroy each other's resources.
//! [`ModuleLocks`] hands out one lock per canonical directory; a case holds it
//! from apply through teardown. Cases on different directories never contend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

// ============================================================================
// SECTION: Locks
// ============================================================================

/// Lock table keyed by canonical module directory.
#[derive(Debug, Default)]
pub struct ModuleLocks {
    /// One lock per directory seen so far.
    locks: Mutex<BTreeMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ModuleLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `module`, creating it on first use.
    #[must_use]
    pub fn lock_for(&self, module: &Path) -> Arc<Mutex<()>> {
        let key = module.canonicalize().unwrap_or_else(|_| module.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Blocks until no other case holds `module`, then runs `op` exclusively.
    ///
    /// A lock poisoned by a panicking case is taken over; that case has
    /// already torn down through its guard.
    pub fn with_module<R>(&self, module: &Path, op: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(module);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        op()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
