//! AcpiEventUseCase: turns acpid events into daemon actions.
//!
//! Lid close and the power, sleep and suspend keys go through the suspend
//! policy.  Dock hotkeys and lid open make the daemon check the dock state
//! at once instead of waiting for the next poll.  Everything else is ignored.

use crate::application::power::SuspendReason;
use crate::infrastructure::acpi::AcpiEvent;

/// What the daemon does about one ACPI event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Suspend(SuspendReason),
    CheckDock,
    Ignore,
}

pub fn action_for(event: AcpiEvent) -> EventAction {
    match event {
        AcpiEvent::LidClosed => EventAction::Suspend(SuspendReason::Lid),
        AcpiEvent::PowerButton | AcpiEvent::SleepButton | AcpiEvent::SuspendButton => {
            EventAction::Suspend(SuspendReason::Button)
        }
        AcpiEvent::Docked | AcpiEvent::Undocked | AcpiEvent::LidOpened => EventAction::CheckDock,
        _ => EventAction::Ignore,
    }
}
