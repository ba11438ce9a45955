//! Panel backlight and ThinkLight.
//!
//! Backlight drivers publish `brightness` and `max_brightness` under
//! `/sys/class/backlight/<device>/`.  [`SysfsBacklight`] reads and writes
//! them, either as raw driver values or as a level between 0.0 and 1.0.
//!
//! The ThinkLight keyboard lamp is an LED whose `brightness` reads `0` while
//! it is off.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::storage::config::BacklightConfig;

/// Devices tried, in order, when none is configured.
pub const PREFERRED_DEVICES: [&str; 2] = ["intel_backlight", "nv_backlight"];

/// Error type for backlight and ThinkLight access.
#[derive(Debug, Error, PartialEq)]
pub enum BacklightError {
    #[error("no backlight device under {0}")]
    NotFound(PathBuf),

    #[error("cannot read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("cannot write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("{path} holds {value:?}, not a brightness value")]
    Parse { path: PathBuf, value: String },

    #[error("{0} reports a maximum brightness of 0")]
    ZeroMax(PathBuf),
}

/// One backlight device directory.
#[derive(Debug, Clone)]
pub struct SysfsBacklight {
    dir: PathBuf,
}

impl SysfsBacklight {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Picks `device` under `class_dir`, or without one the first of
    /// [`PREFERRED_DEVICES`] present, then any other device in name order.
    ///
    /// # Errors
    ///
    /// Returns [`BacklightError::NotFound`] if no candidate has a
    /// `brightness` attribute.
    pub fn detect(class_dir: &Path, device: Option<&str>) -> Result<Self, BacklightError> {
        if let Some(name) = device {
            let dir = class_dir.join(name);
            return if dir.join("brightness").exists() {
                Ok(Self::new(dir))
            } else {
                Err(BacklightError::NotFound(dir))
            };
        }

        let mut others: Vec<PathBuf> = std::fs::read_dir(class_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        others.sort();
        let found = PREFERRED_DEVICES
            .iter()
            .map(|name| class_dir.join(name))
            .chain(others)
            .find(|dir| dir.join("brightness").exists());
        match found {
            Some(dir) => {
                debug!("using backlight {}", dir.display());
                Ok(Self::new(dir))
            }
            None => Err(BacklightError::NotFound(class_dir.to_path_buf())),
        }
    }

    /// # Errors
    ///
    /// See [`detect`](Self::detect).
    pub fn from_config(cfg: &BacklightConfig) -> Result<Self, BacklightError> {
        Self::detect(&cfg.class_path, cfg.device.as_deref())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// # Errors
    ///
    /// Returns [`BacklightError::Read`] or [`BacklightError::Parse`].
    pub fn brightness(&self) -> Result<u32, BacklightError> {
        read_value(&self.dir.join("brightness"))
    }

    /// # Errors
    ///
    /// Returns [`BacklightError::Read`] or [`BacklightError::Parse`].
    pub fn max_brightness(&self) -> Result<u32, BacklightError> {
        read_value(&self.dir.join("max_brightness"))
    }

    /// Writes a raw value, capped at `max_brightness`.
    ///
    /// # Errors
    ///
    /// Returns [`BacklightError::Write`] if the driver refuses the value.
    pub fn set_brightness(&self, value: u32) -> Result<(), BacklightError> {
        let value = value.min(self.max_brightness()?);
        let path = self.dir.join("brightness");
        std::fs::write(&path, value.to_string()).map_err(|e| BacklightError::Write {
            path,
            reason: e.to_string(),
        })?;
        info!(value, "backlight brightness set");
        Ok(())
    }

    /// Current brightness as a fraction of the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`BacklightError::ZeroMax`] for a driver without a range.
    pub fn level(&self) -> Result<f32, BacklightError> {
        let max = self.max_brightness()?;
        if max == 0 {
            return Err(BacklightError::ZeroMax(self.dir.clone()));
        }
        Ok(self.brightness()? as f32 / max as f32)
    }

    /// Sets brightness to `factor` (clamped to 0.0..=1.0) of the maximum and
    /// returns the raw value written.
    ///
    /// # Errors
    ///
    /// As [`max_brightness`](Self::max_brightness) and
    /// [`set_brightness`](Self::set_brightness).
    pub fn set_level(&self, factor: f32) -> Result<u32, BacklightError> {
        let max = self.max_brightness()?;
        let value = (max as f32 * factor.clamp(0.0, 1.0)) as u32;
        self.set_brightness(value)?;
        Ok(value)
    }
}

/// The ThinkLight LED.
#[derive(Debug, Clone)]
pub struct ThinkLight {
    path: PathBuf,
}

impl ThinkLight {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(cfg: &BacklightConfig) -> Self {
        Self::new(&cfg.thinklight_path)
    }

    /// Whether the LED attribute exists and can be read.
    pub fn is_present(&self) -> bool {
        std::fs::File::open(&self.path).is_ok()
    }

    /// # Errors
    ///
    /// Returns [`BacklightError::Read`] if the attribute cannot be read, or
    /// [`BacklightError::Parse`] if it is empty.
    pub fn is_on(&self) -> Result<bool, BacklightError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| BacklightError::Read {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        match raw.trim().chars().next() {
            Some(c) => Ok(c != '0'),
            None => Err(BacklightError::Parse {
                path: self.path.clone(),
                value: raw,
            }),
        }
    }
}

fn read_value(path: &Path) -> Result<u32, BacklightError> {
    let raw = std::fs::read_to_string(path).map_err(|e| BacklightError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    raw.trim().parse().map_err(|_| BacklightError::Parse {
        path: path.to_path_buf(),
        value: raw,
    })
}
