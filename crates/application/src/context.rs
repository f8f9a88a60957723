use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use sentra_core::UserIdentity;
use serde_json::Value;

/// How the current unit of work was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A request acting on behalf of an identified or anonymous viewer.
    Interactive,
    /// Batch or console execution, globally exempt from checks.
    NonInteractive,
}

/// Explicit per-call-chain state for one unit of work.
///
/// Carries the viewer, the reentrant bypass window, the short-lived memo and
/// the field-protection in-progress markers. The context is created at the
/// boundary of a unit of work and never shared across requests; the
/// reentrancy rules live here instead of in process-wide globals.
#[derive(Debug)]
pub struct AccessContext {
    viewer: Option<UserIdentity>,
    execution_mode: ExecutionMode,
    bypass_depth: AtomicU32,
    memo: Mutex<HashMap<String, Value>>,
    bypass_written: Mutex<HashSet<String>>,
    in_progress: Mutex<HashSet<(String, String)>>,
}

impl AccessContext {
    /// Creates a context for an identified interactive viewer.
    #[must_use]
    pub fn interactive(viewer: UserIdentity) -> Self {
        Self::with_mode(Some(viewer), ExecutionMode::Interactive)
    }

    /// Creates a context for an interactive caller with no identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::with_mode(None, ExecutionMode::Interactive)
    }

    /// Creates a context for batch or console execution.
    #[must_use]
    pub fn non_interactive() -> Self {
        Self::with_mode(None, ExecutionMode::NonInteractive)
    }

    /// Creates a context from explicit viewer and execution mode.
    #[must_use]
    pub fn with_mode(viewer: Option<UserIdentity>, execution_mode: ExecutionMode) -> Self {
        Self {
            viewer,
            execution_mode,
            bypass_depth: AtomicU32::new(0),
            memo: Mutex::new(HashMap::new()),
            bypass_written: Mutex::new(HashSet::new()),
            in_progress: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the viewer, if one is identified.
    #[must_use]
    pub fn viewer(&self) -> Option<&UserIdentity> {
        self.viewer.as_ref()
    }

    /// Returns how the unit of work was started.
    #[must_use]
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// Returns whether a bypass window is open on this call chain.
    #[must_use]
    pub fn is_in_bypass(&self) -> bool {
        self.bypass_depth.load(Ordering::Relaxed) > 0
    }

    /// Opens a bypass window. Windows nest; each enter must be paired with
    /// one exit so the prior depth is restored.
    pub fn enter_bypass(&self) {
        self.bypass_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Closes the innermost bypass window.
    pub fn exit_bypass(&self) {
        let previous = self.bypass_depth.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "exit_bypass without matching enter");
    }

    /// Opens a bypass window that closes when the returned scope drops.
    #[must_use]
    pub fn bypass_scope(&self) -> BypassScope<'_> {
        self.enter_bypass();
        BypassScope { context: self }
    }

    /// Returns a memoised value for this unit of work.
    ///
    /// Entries first written inside a bypass window are discarded once the
    /// window has closed, so privileged intermediate state never answers a
    /// non-bypassed check.
    #[must_use]
    pub fn memo_get(&self, key: &str) -> Option<Value> {
        if !self.is_in_bypass() {
            let mut written = lock(&self.bypass_written);
            if written.remove(key) {
                lock(&self.memo).remove(key);
                return None;
            }
        }

        lock(&self.memo).get(key).cloned()
    }

    /// Memoises a value for this unit of work.
    pub fn memo_put(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.is_in_bypass() {
            lock(&self.bypass_written).insert(key.clone());
        } else {
            lock(&self.bypass_written).remove(&key);
        }
        lock(&self.memo).insert(key, value);
    }

    /// Marks a record as being protected, refusing reentrant processing.
    ///
    /// Returns `None` when protection for the same record is already running
    /// on this call chain. The marker clears when the scope drops.
    #[must_use]
    pub fn begin_protect(&self, record_type: &str, record_id: &str) -> Option<ProtectScope<'_>> {
        let marker = (record_type.to_owned(), record_id.to_owned());
        if !lock(&self.in_progress).insert(marker.clone()) {
            return None;
        }

        Some(ProtectScope {
            context: self,
            marker,
        })
    }

    /// Resets the per-unit-of-work state at a work boundary.
    pub fn reset(&self) {
        self.bypass_depth.store(0, Ordering::Relaxed);
        lock(&self.memo).clear();
        lock(&self.bypass_written).clear();
        lock(&self.in_progress).clear();
    }
}

/// Open bypass window tied to a call-chain scope.
#[derive(Debug)]
pub struct BypassScope<'a> {
    context: &'a AccessContext,
}

impl Drop for BypassScope<'_> {
    fn drop(&mut self) {
        self.context.exit_bypass();
    }
}

/// In-progress marker for one record's protection run.
#[derive(Debug)]
pub struct ProtectScope<'a> {
    context: &'a AccessContext,
    marker: (String, String),
}

impl Drop for ProtectScope<'_> {
    fn drop(&mut self) {
        lock(&self.context.in_progress).remove(&self.marker);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
