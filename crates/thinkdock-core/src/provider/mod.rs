//! The display-provider port.
//!
//! The topology engine talks to the display subsystem through exactly two
//! calls: a read-only [`snapshot`](DisplayProvider::snapshot) at session start
//! and one atomic [`apply`](DisplayProvider::apply) at commit time.  The real
//! implementation (XRandR) lives in the application crate; tests use
//! [`mock::MockDisplayProvider`].
//!
//! The provider is an explicit session object passed by reference, so the
//! connection's lifetime is controlled by whoever created it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::controller::ControllerId;
use crate::domain::geometry::{Dimensions, Point};
use crate::domain::mode::ModeId;
use crate::domain::output::OutputId;

pub mod mock;
pub mod snapshot;

pub use snapshot::{ControllerInfo, ModeInfo, OutputInfo, ResourceSnapshot};

/// Errors reported by a display provider.
///
/// A failed apply is reported for the whole request; providers do not say
/// which controller caused it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("display connection unavailable: {0}")]
    Unavailable(String),

    #[error("display server rejected the configuration: {0}")]
    Rejected(String),
}

/// Final settings for one enabled controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub controller: ControllerId,
    /// Position in virtual space, relative to the primary monitor.
    pub position: Point,
    pub width: u32,
    pub height: u32,
    pub mode: ModeId,
    pub outputs: Vec<OutputId>,
}

/// Size of the whole virtual screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenSize {
    pub pixels: Dimensions,
    pub millimeters: Dimensions,
}

/// Everything a provider needs to apply one layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Controllers to enable, with their settings.
    pub controllers: Vec<ControllerState>,
    /// Controllers to switch off.
    pub disabled: Vec<ControllerId>,
    pub screen: ScreenSize,
    /// Top-left corner of the layout's bounding box.  Negative when monitors
    /// sit left of or above the primary; providers that need non-negative
    /// coordinates subtract it from every position.
    pub origin: Point,
    pub primary_output: OutputId,
}

impl CommitRequest {
    /// `position` translated so the bounding box starts at (0, 0).
    pub fn normalized_position(&self, position: Point) -> Point {
        Point::new(position.x - self.origin.x, position.y - self.origin.y)
    }
}

/// Narrow interface to the display subsystem.
pub trait DisplayProvider {
    /// Reads the current controllers, outputs and modes.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unavailable`] if the display server cannot be
    /// queried.
    fn snapshot(&self) -> Result<ResourceSnapshot, ProviderError>;

    /// Applies all controller settings in `request` as one transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if any part of the request fails.
    fn apply(&mut self, request: &CommitRequest) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_position_shifts_by_origin() {
        let request = CommitRequest {
            controllers: vec![],
            disabled: vec![],
            screen: ScreenSize::default(),
            origin: Point::new(-1024, -200),
            primary_output: OutputId(1),
        };
        assert_eq!(request.normalized_position(Point::ORIGIN), Point::new(1024, 200));
        assert_eq!(request.normalized_position(Point::new(-1024, 0)), Point::new(0, 200));
    }
}
