//! SuspendUseCase: decides whether a lid or button event should suspend.
//!
//! The power button always suspends.  Closing the lid suspends only when the
//! laptop is undocked; in the dock the lid is routinely closed while external
//! monitors stay in use.  If the dock cannot be identified the lid event is
//! refused, since "not docked" cannot be trusted.

use thiserror::Error;
use tracing::{info, warn};

use crate::infrastructure::dock::DockSensor;
use crate::infrastructure::power::{SuspendBackend, SuspendError};

/// Why a suspend was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    Lid,
    Button,
}

/// What [`request_suspend`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendOutcome {
    Suspended,
    /// Lid closed while docked; nothing was done.
    IgnoredDocked,
}

/// Error type for suspend requests.
#[derive(Debug, Error, PartialEq)]
pub enum PowerError {
    #[error("dock is not present or not recognised")]
    DockNotSane,

    #[error(transparent)]
    Backend(#[from] SuspendError),
}

/// Applies the suspend policy for `reason`.
///
/// # Errors
///
/// Returns [`PowerError::DockNotSane`] for a lid event when the dock sensor
/// fails, or [`PowerError::Backend`] if the suspend request itself fails.
pub fn request_suspend(
    reason: SuspendReason,
    dock: &dyn DockSensor,
    backend: &dyn SuspendBackend,
) -> Result<SuspendOutcome, PowerError> {
    match reason {
        SuspendReason::Button => {
            backend.suspend()?;
            Ok(SuspendOutcome::Suspended)
        }
        SuspendReason::Lid => {
            if !dock.is_present() {
                warn!("lid closed but the dock is not sane; refusing to suspend");
                return Err(PowerError::DockNotSane);
            }
            if dock.is_docked() {
                info!("ignoring lid event while docked");
                return Ok(SuspendOutcome::IgnoredDocked);
            }
            backend.suspend()?;
            Ok(SuspendOutcome::Suspended)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::dock::MockDockSensor;
    use crate::infrastructure::power::MockSuspendBackend;

    fn dock(present: bool, docked: bool) -> MockDockSensor {
        let mut dock = MockDockSensor::new();
        dock.expect_is_present().return_const(present);
        dock.expect_is_docked().return_const(docked);
        dock
    }

    fn backend(times: usize) -> MockSuspendBackend {
        let mut backend = MockSuspendBackend::new();
        backend.expect_suspend().times(times).returning(|| Ok(()));
        backend
    }

    #[test]
    fn test_button_suspends_regardless_of_dock() {
        // Arrange
        let dock = dock(false, true);
        let backend = backend(1);

        // Act
        let outcome = request_suspend(SuspendReason::Button, &dock, &backend);

        // Assert
        assert_eq!(outcome, Ok(SuspendOutcome::Suspended));
    }

    #[test]
    fn test_lid_suspends_when_undocked() {
        let outcome = request_suspend(SuspendReason::Lid, &dock(true, false), &backend(1));
        assert_eq!(outcome, Ok(SuspendOutcome::Suspended));
    }

    #[test]
    fn test_lid_is_ignored_when_docked() {
        let outcome = request_suspend(SuspendReason::Lid, &dock(true, true), &backend(0));
        assert_eq!(outcome, Ok(SuspendOutcome::IgnoredDocked));
    }

    #[test]
    fn test_lid_is_refused_when_dock_is_not_sane() {
        let outcome = request_suspend(SuspendReason::Lid, &dock(false, false), &backend(0));
        assert_eq!(outcome, Err(PowerError::DockNotSane));
    }

    #[test]
    fn test_backend_failure_is_propagated() {
        // Arrange
        let mut backend = MockSuspendBackend::new();
        backend.expect_suspend().returning(|| {
            Err(SuspendError::Rejected {
                name: "org.freedesktop.DBus.Error.AccessDenied".to_string(),
                message: "Interactive authentication required.".to_string(),
            })
        });

        // Act
        let outcome = request_suspend(SuspendReason::Button, &dock(true, false), &backend);

        // Assert
        assert!(matches!(outcome, Err(PowerError::Backend(SuspendError::Rejected { .. }))));
    }
}
