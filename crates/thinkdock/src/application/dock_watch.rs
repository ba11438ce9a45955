//! DockWatchUseCase: re-applies the layout when the dock state flips.
//!
//! The daemon calls [`DockWatcher::tick`] on every poll.  The layout is
//! applied on the first tick and then only when `is_docked()` differs from
//! the state last applied successfully.  A failed apply is retried on the
//! next tick, which covers monitors that take a moment to report modes after
//! a hot-plug.

use thinkdock_core::{CommitReport, DisplayProvider};
use tracing::{info, warn};

use crate::application::dock_layout::{apply_dock_layout, LayoutPlanError, LayoutPolicy};
use crate::infrastructure::dock::DockSensor;

/// Remembers which dock state the screen was last laid out for.
#[derive(Debug, Default)]
pub struct DockWatcher {
    applied: Option<bool>,
}

impl DockWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dock state of the last successful apply, `None` before the first.
    pub fn applied(&self) -> Option<bool> {
        self.applied
    }

    /// Polls `dock` and applies the layout if the state changed.
    ///
    /// Returns `None` when nothing changed.
    pub fn tick(
        &mut self,
        dock: &dyn DockSensor,
        provider: &mut dyn DisplayProvider,
        policy: &LayoutPolicy,
    ) -> Option<Result<CommitReport, LayoutPlanError>> {
        let docked = dock.is_docked();
        if self.applied == Some(docked) {
            return None;
        }
        info!(docked, previous = ?self.applied, "dock state changed");

        let result = apply_dock_layout(provider, policy, docked);
        match &result {
            Ok(_) => self.applied = Some(docked),
            Err(e) => warn!("layout for docked={docked} failed, will retry: {e}"),
        }
        Some(result)
    }
}
