//! Video display controllers (VDCs, CRTCs in XRandR terms).
//!
//! A GPU can only produce as many independent images as it has controllers.
//! A ThinkPad X220, for example, has two controllers and eight outputs: at
//! most two distinct images (resolution, position, refresh), each of which
//! can be mirrored to several outputs.
//!
//! ```text
//!   mirror                              extend
//!   +---------+   +---------+           +---------+   +---------+
//!   |   VDC   |   |   VDC   |           |   VDC   |   |   VDC   |
//!   | 800x600 |   |   off   |           |1366x768 |   |1440x900 |
//!   +----+----+   +---------+           +----+----+   +----+----+
//!        |                                   |             |
//!    +---+-------+                       +---+---+     +---+---+
//!    |           |                       | panel |     |  ext  |
//! +--+----+  +---+------+                +-------+     +-------+
//! | panel |  | projector|
//! +-------+  +----------+
//! ```
//!
//! Every mutation here only changes the pending configuration in memory.
//! Nothing reaches the hardware until a commit hands the controller state to
//! the display provider.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::Point;
use super::mode::{ModeId, VideoOutputMode};
use super::output::{OutputId, VideoOutput};
use crate::provider::ControllerState;

/// Identifier the display server assigned to a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerId(pub u64);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}", self.0)
    }
}

/// A controller/output/mode combination violates a capability constraint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("{output} cannot be driven by {controller}")]
    UnsupportedController {
        controller: ControllerId,
        output: OutputId,
    },

    #[error("{output} does not support {mode}")]
    UnsupportedMode { mode: ModeId, output: OutputId },
}

/// One controller and its pending configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoController {
    id: ControllerId,
    position: Point,
    width: u32,
    height: u32,
    mode: Option<ModeId>,
    active_outputs: Vec<OutputId>,
    supported_outputs: Vec<OutputId>,
}

impl VideoController {
    pub fn new(id: ControllerId, supported_outputs: Vec<OutputId>) -> Self {
        Self {
            id,
            position: Point::ORIGIN,
            width: 0,
            height: 0,
            mode: None,
            active_outputs: Vec::new(),
            supported_outputs,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn width_pixels(&self) -> u32 {
        self.width
    }

    pub fn height_pixels(&self) -> u32 {
        self.height
    }

    pub fn mode(&self) -> Option<ModeId> {
        self.mode
    }

    pub fn active_outputs(&self) -> &[OutputId] {
        &self.active_outputs
    }

    pub fn supported_outputs(&self) -> &[OutputId] {
        &self.supported_outputs
    }

    /// True iff the controller drives at least one output with a bound mode.
    pub fn is_enabled(&self) -> bool {
        self.mode.is_some() && !self.active_outputs.is_empty()
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn set_width_pixels(&mut self, width: u32) {
        self.width = width;
    }

    pub fn set_height_pixels(&mut self, height: u32) {
        self.height = height;
    }

    /// Binds `mode` and takes its pixel size.
    pub fn set_output_mode(&mut self, mode: &VideoOutputMode) {
        self.mode = Some(mode.id());
        self.width = mode.width_pixels();
        self.height = mode.height_pixels();
    }

    /// Adds `output` to the active set.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnsupportedController`] if the output's
    /// capability set does not contain this controller.  The active set is
    /// left unchanged.
    pub fn add_output(&mut self, output: &VideoOutput) -> Result<(), BindingError> {
        if !output.is_controller_supported(self.id) {
            return Err(BindingError::UnsupportedController {
                controller: self.id,
                output: output.id(),
            });
        }
        if !self.active_outputs.contains(&output.id()) {
            self.active_outputs.push(output.id());
        }
        Ok(())
    }

    pub fn remove_output(&mut self, output: OutputId) {
        self.active_outputs.retain(|o| *o != output);
    }

    /// Releases the controller: no outputs, no mode, disabled.
    pub fn reset_configuration(&mut self) {
        self.active_outputs.clear();
        self.mode = None;
        self.width = 0;
        self.height = 0;
        self.position = Point::ORIGIN;
    }

    /// The state handed to the display provider, or `None` when disabled.
    pub fn state(&self) -> Option<ControllerState> {
        let mode = self.mode?;
        if self.active_outputs.is_empty() {
            return None;
        }
        Some(ControllerState {
            controller: self.id,
            position: self.position,
            width: self.width,
            height: self.height,
            mode,
            outputs: self.active_outputs.clone(),
        })
    }
}
