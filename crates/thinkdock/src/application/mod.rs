//! Application layer use cases for the dock daemon.
//!
//! Use cases here orchestrate `thinkdock_core` objects to react to dock
//! events.  They depend on traits (`DisplayProvider`, `DockSensor`,
//! `SuspendBackend`) rather than on X11, sysfs or D-Bus directly, so every
//! one of them runs against mocks in tests.
//!
//! - **`dock_layout`** – Decides which monitors to enable and where, for the
//!   docked and undocked cases, and commits the result.
//! - **`dock_watch`** – Re-applies the layout when the dock state flips.
//! - **`power`** – Decides whether a lid or power-button event suspends.
//! - **`acpi_events`** – Maps acpid events to suspend requests and dock checks.

pub mod acpi_events;
pub mod dock_layout;
pub mod dock_watch;
pub mod power;
