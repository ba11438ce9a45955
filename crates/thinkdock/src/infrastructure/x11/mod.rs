//! XRandR display provider.
//!
//! [`XrandrSession`] owns one connection to the X server and implements
//! [`DisplayProvider`](thinkdock_core::DisplayProvider) on top of the RandR
//! extension.  The connection is opened by [`XrandrSession::open`] and
//! closed when the session is dropped; nothing is global.
//!
//! Only available on Linux.

use std::collections::HashSet;

use thiserror::Error;
use thinkdock_core::{ModeId, ProviderError};

mod transaction;
#[cfg(target_os = "linux")]
mod xrandr;

#[cfg(target_os = "linux")]
pub use xrandr::XrandrSession;

/// Error type for X11 operations.
#[derive(Debug, Error, PartialEq)]
pub enum X11Error {
    #[error("XOpenDisplay failed; DISPLAY={display}")]
    DisplayUnavailable { display: String },

    #[error("X server returned no screen resources")]
    ResourcesUnavailable,

    #[error("XRRSetCrtcConfig failed for CRTC {crtc:#x} with status {status}")]
    CrtcConfigFailed { crtc: u64, status: i32 },
}

impl From<X11Error> for ProviderError {
    fn from(e: X11Error) -> Self {
        match e {
            X11Error::CrtcConfigFailed { .. } => ProviderError::Rejected(e.to_string()),
            _ => ProviderError::Unavailable(e.to_string()),
        }
    }
}

/// Perceived refresh rate of an X mode line in Hz, `None` for degenerate timings.
pub(crate) fn mode_refresh(dot_clock: u64, h_total: u32, v_total: u32) -> Option<f64> {
    let pixels_per_frame = u64::from(h_total) * u64::from(v_total);
    if pixels_per_frame == 0 || dot_clock == 0 {
        return None;
    }
    Some(dot_clock as f64 / pixels_per_frame as f64)
}

/// XRandR lists an output's preferred modes first.  The first listed mode is
/// preferred only if it survived into the mode table.
pub(crate) fn preferred_mode(
    listed: &[ModeId],
    npreferred: i32,
    known: &HashSet<ModeId>,
) -> Option<ModeId> {
    if npreferred <= 0 {
        return None;
    }
    listed.first().copied().filter(|m| known.contains(m))
}
