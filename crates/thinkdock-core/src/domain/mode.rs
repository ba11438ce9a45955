//! Display timing descriptors ("modes").
//!
//! A mode is a value object: resolution, refresh rate and scan flags exactly as
//! the display server enumerated them.  Modes are shared by all outputs; an
//! output merely lists which of them it can show.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier the display server assigned to a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(pub u64);

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode#{}", self.0)
    }
}

/// Errors raised while validating an enumerated mode.
#[derive(Debug, Error, PartialEq)]
pub enum ModeError {
    #[error("{id} has a zero dimension ({width}x{height})")]
    ZeroDimension { id: ModeId, width: u32, height: u32 },

    #[error("{id} has a non-positive refresh rate ({refresh})")]
    InvalidRefresh { id: ModeId, refresh: f64 },

    /// Interlace and double-scan together have no defined perceived refresh.
    #[error("{0} is flagged both interlaced and double-scanned")]
    ConflictingScanFlags(ModeId),
}

/// Scan flags reported alongside a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanFlags {
    /// Each reported refresh cycle paints half a frame.
    pub interlaced: bool,
    /// Each scan line is painted twice.
    pub double_scan: bool,
}

/// One display timing.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutputMode {
    id: ModeId,
    width: u32,
    height: u32,
    raw_refresh: f64,
    flags: ScanFlags,
    name: String,
}

impl VideoOutputMode {
    /// Validates and builds a mode.
    ///
    /// An empty `name` is replaced with `"<width>x<height>"`.
    ///
    /// # Errors
    ///
    /// Returns [`ModeError`] if a dimension is zero, the raw refresh is not a
    /// positive finite number, or both scan flags are set.
    pub fn new(
        id: ModeId,
        width: u32,
        height: u32,
        raw_refresh: f64,
        flags: ScanFlags,
        name: impl Into<String>,
    ) -> Result<Self, ModeError> {
        if width == 0 || height == 0 {
            return Err(ModeError::ZeroDimension { id, width, height });
        }
        if !raw_refresh.is_finite() || raw_refresh <= 0.0 {
            return Err(ModeError::InvalidRefresh {
                id,
                refresh: raw_refresh,
            });
        }
        if flags.interlaced && flags.double_scan {
            return Err(ModeError::ConflictingScanFlags(id));
        }

        let mut name = name.into();
        if name.is_empty() {
            name = format!("{width}x{height}");
        }

        Ok(Self {
            id,
            width,
            height,
            raw_refresh,
            flags,
            name,
        })
    }

    pub fn id(&self) -> ModeId {
        self.id
    }

    pub fn width_pixels(&self) -> u32 {
        self.width
    }

    pub fn height_pixels(&self) -> u32 {
        self.height
    }

    pub fn flags(&self) -> ScanFlags {
        self.flags
    }

    /// The refresh rate as reported by the server, before scan correction.
    pub fn raw_refresh_rate(&self) -> f64 {
        self.raw_refresh
    }

    /// Returns the refresh rate the user actually perceives.
    ///
    /// Interlaced modes report half-frames, so the physical rate is double the
    /// raw rate.  Double-scanned modes repeat every line, so it is half.
    pub fn refresh_rate(&self) -> f64 {
        match (self.flags.interlaced, self.flags.double_scan) {
            (true, false) => self.raw_refresh * 2.0,
            (false, true) => self.raw_refresh / 2.0,
            _ => self.raw_refresh,
        }
    }

    /// Human-readable name, e.g. `"1920x1080"`.  Display only; compare ids.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for VideoOutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
