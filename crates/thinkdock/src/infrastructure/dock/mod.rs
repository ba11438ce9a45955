//! Dock presence detection.
//!
//! The ThinkPad dock driver publishes two sysfs attributes: `docked`, which
//! reads `1` while the laptop sits in the dock, and `modalias`, which
//! identifies the dock device.  [`SysfsDock`] reads both.
//!
//! Read errors are reported as "not docked" / "not present": a missing
//! attribute means the driver is not loaded, which is the same thing to the
//! layout logic.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::infrastructure::storage::config::DockConfig;

/// Platform-agnostic view of the docking station.
#[cfg_attr(test, mockall::automock)]
pub trait DockSensor {
    /// Returns `true` while the laptop is in the dock.
    fn is_docked(&self) -> bool;

    /// Returns `true` if the dock device is present and is the expected one.
    fn is_present(&self) -> bool;
}

/// [`DockSensor`] backed by the dock driver's sysfs attributes.
#[derive(Debug, Clone)]
pub struct SysfsDock {
    docked_path: PathBuf,
    modalias_path: PathBuf,
    expected_modalias: String,
}

impl SysfsDock {
    pub fn new(
        docked_path: impl Into<PathBuf>,
        modalias_path: impl Into<PathBuf>,
        expected_modalias: impl Into<String>,
    ) -> Self {
        Self {
            docked_path: docked_path.into(),
            modalias_path: modalias_path.into(),
            expected_modalias: expected_modalias.into(),
        }
    }

    pub fn from_config(cfg: &DockConfig) -> Self {
        Self::new(&cfg.docked_path, &cfg.modalias_path, cfg.expected_modalias.clone())
    }

    fn read(path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(s) => Some(s),
            Err(e) => {
                debug!("cannot read {}: {e}", path.display());
                None
            }
        }
    }
}

impl DockSensor for SysfsDock {
    fn is_docked(&self) -> bool {
        Self::read(&self.docked_path).is_some_and(|s| s.starts_with('1'))
    }

    fn is_present(&self) -> bool {
        Self::read(&self.modalias_path).is_some_and(|s| s == self.expected_modalias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODALIAS: &str = "acpi:IBM0079:PNP0C15:LNXDOCK:\n";

    fn scratch(name: &str, docked: &str, modalias: &str) -> (PathBuf, SysfsDock) {
        let dir = std::env::temp_dir().join(format!("thinkdock_dock_{}_{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("docked"), docked).unwrap();
        std::fs::write(dir.join("modalias"), modalias).unwrap();
        let dock = SysfsDock::new(dir.join("docked"), dir.join("modalias"), MODALIAS);
        (dir, dock)
    }

    #[test]
    fn test_sysfs_dock_reports_docked_and_present() {
        // Arrange
        let (dir, dock) = scratch("docked", "1\n", MODALIAS);

        // Act / Assert
        assert!(dock.is_docked());
        assert!(dock.is_present());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sysfs_dock_reports_undocked() {
        let (dir, dock) = scratch("undocked", "0\n", MODALIAS);
        assert!(!dock.is_docked());
        assert!(dock.is_present());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sysfs_dock_rejects_foreign_device() {
        let (dir, dock) = scratch("foreign", "1\n", "acpi:PNP0C15:\n");
        assert!(!dock.is_present());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sysfs_dock_missing_files_mean_absent() {
        let dock = SysfsDock::new("/nonexistent/docked", "/nonexistent/modalias", MODALIAS);
        assert!(!dock.is_docked());
        assert!(!dock.is_present());
    }
}
