//! Infrastructure layer for the dock daemon.
//!
//! Contains OS-facing adapters: the sysfs dock sensor, the acpid event
//! listener, sysfs backlight and ThinkLight access, the logind D-Bus suspend
//! backend, TOML configuration storage, and the XRandR display provider.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `thinkdock_core`, but MUST NOT be imported by the domain layer.

pub mod acpi;
pub mod backlight;
pub mod dock;
pub mod power;
pub mod storage;
pub mod x11;
