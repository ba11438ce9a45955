//! Ordering of the RandR calls that apply one [`CommitRequest`], and the
//! rollback when one of them fails.
//!
//! The server rejects a screen size that a lit CRTC would stick out of, so a
//! layout is applied as: switch off dropped and oversized CRTCs, resize the
//! screen, set every CRTC of the layout, mark the primary output.  If a CRTC
//! is refused half way through, the CRTCs and screen size read before the
//! first call are put back.

use thinkdock_core::{CommitRequest, ControllerId, ModeId, OutputId, Point, ScreenSize};
use tracing::{debug, warn};

use super::X11Error;

/// One CRTC as read from or written to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CrtcConfig {
    pub crtc: ControllerId,
    pub position: Point,
    pub width: u32,
    pub height: u32,
    /// `None` switches the CRTC off.
    pub mode: Option<ModeId>,
    pub outputs: Vec<OutputId>,
}

impl CrtcConfig {
    pub fn off(crtc: ControllerId) -> Self {
        Self {
            crtc,
            position: Point::ORIGIN,
            width: 0,
            height: 0,
            mode: None,
            outputs: Vec::new(),
        }
    }

    pub fn is_on(&self) -> bool {
        self.mode.is_some() && !self.outputs.is_empty()
    }

    fn sticks_out(&self, width: u64, height: u64) -> bool {
        let right = i64::from(self.position.x) + i64::from(self.width);
        let bottom = i64::from(self.position.y) + i64::from(self.height);
        right > width as i64 || bottom > height as i64
    }
}

/// The RandR calls a transaction is made of, on a grabbed server.
pub(crate) trait RandrOps {
    fn screen(&self) -> ScreenSize;

    fn crtcs(&self) -> Vec<CrtcConfig>;

    fn set_screen_size(&mut self, size: ScreenSize);

    /// # Errors
    ///
    /// Returns [`X11Error::CrtcConfigFailed`] if the server refuses `config`.
    fn set_crtc(&mut self, config: &CrtcConfig) -> Result<(), X11Error>;

    fn set_primary(&mut self, output: OutputId);
}

/// Applies `request` through `ops`, restoring the previous CRTCs and screen
/// size if any CRTC is refused.
///
/// # Errors
///
/// Returns the first [`X11Error`] raised while applying; the rollback's own
/// failures are only logged.
pub(crate) fn apply_transaction(
    ops: &mut dyn RandrOps,
    request: &CommitRequest,
) -> Result<(), X11Error> {
    let saved_screen = ops.screen();
    let saved = ops.crtcs();
    match apply_steps(ops, request, &saved) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("{e}; restoring previous configuration");
            restore(ops, saved_screen, &saved);
            Err(e)
        }
    }
}

fn apply_steps(
    ops: &mut dyn RandrOps,
    request: &CommitRequest,
    saved: &[CrtcConfig],
) -> Result<(), X11Error> {
    let screen = request.screen;
    let mut off: Vec<ControllerId> = request.disabled.clone();
    for c in saved {
        if c.is_on() && c.sticks_out(screen.pixels.width, screen.pixels.height) && !off.contains(&c.crtc) {
            off.push(c.crtc);
        }
    }
    for crtc in &off {
        debug!(%crtc, "switching CRTC off");
        ops.set_crtc(&CrtcConfig::off(*crtc))?;
    }

    ops.set_screen_size(screen);

    for state in &request.controllers {
        let position = request.normalized_position(state.position);
        debug!(
            crtc = %state.controller,
            mode = %state.mode,
            x = position.x,
            y = position.y,
            "configuring CRTC"
        );
        ops.set_crtc(&CrtcConfig {
            crtc: state.controller,
            position,
            width: state.width,
            height: state.height,
            mode: Some(state.mode),
            outputs: state.outputs.clone(),
        })?;
    }

    ops.set_primary(request.primary_output);
    Ok(())
}

/// Everything off first, so the old screen size is accepted again.
fn restore(ops: &mut dyn RandrOps, screen: ScreenSize, saved: &[CrtcConfig]) {
    for c in saved {
        if let Err(e) = ops.set_crtc(&CrtcConfig::off(c.crtc)) {
            warn!("rollback: {e}");
        }
    }
    ops.set_screen_size(screen);
    for c in saved.iter().filter(|c| c.is_on()) {
        if let Err(e) = ops.set_crtc(c) {
            warn!("rollback: {e}");
        }
    }
}
