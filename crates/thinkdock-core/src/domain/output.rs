//! Physical output ports.
//!
//! A `VideoOutput` describes a port (LVDS1, VGA1, DP2, ...), not the monitor
//! plugged into it.  Physical size and the mode list come from whatever device
//! was connected when the snapshot was taken; the connection state is not
//! re-polled, so a stale catalog can report an unplugged port as connected.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::controller::ControllerId;
use super::mode::ModeId;

/// Identifier the display server assigned to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputId(pub u64);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Connection state as reported at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

/// One physical port.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutput {
    id: OutputId,
    name: String,
    connection: ConnectionState,
    width_mm: u64,
    height_mm: u64,
    modes: Vec<ModeId>,
    preferred_mode: Option<ModeId>,
    supported_controllers: Vec<ControllerId>,
    controller: Option<ControllerId>,
}

impl VideoOutput {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OutputId,
        name: impl Into<String>,
        connection: ConnectionState,
        width_mm: u64,
        height_mm: u64,
        modes: Vec<ModeId>,
        preferred_mode: Option<ModeId>,
        supported_controllers: Vec<ControllerId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            connection,
            width_mm,
            height_mm,
            modes,
            preferred_mode,
            supported_controllers,
            controller: None,
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    /// Interface name, e.g. `"LVDS1"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn width_millimeters(&self) -> u64 {
        self.width_mm
    }

    pub fn height_millimeters(&self) -> u64 {
        self.height_mm
    }

    /// Modes the connected device reports, in server order.
    pub fn modes(&self) -> &[ModeId] {
        &self.modes
    }

    pub fn supports_mode(&self, mode: ModeId) -> bool {
        self.modes.contains(&mode)
    }

    /// The mode the server marked preferred (usually native resolution at
    /// 60 Hz).  `None` when the output lists no modes, which is normal for a
    /// disconnected port.
    pub fn preferred_output_mode(&self) -> Option<ModeId> {
        if self.modes.is_empty() {
            return None;
        }
        self.preferred_mode.or_else(|| self.modes.first().copied())
    }

    /// Controllers this output can be driven by.
    pub fn supported_controllers(&self) -> &[ControllerId] {
        &self.supported_controllers
    }

    pub fn is_controller_supported(&self, controller: ControllerId) -> bool {
        self.supported_controllers.contains(&controller)
    }

    /// The controller currently bound to this output, if any.
    pub fn controller(&self) -> Option<ControllerId> {
        self.controller
    }

    /// Records the intended binding.
    ///
    /// Callers must check [`is_controller_supported`](Self::is_controller_supported)
    /// first; the catalog's binding path does.
    pub fn set_controller(&mut self, controller: ControllerId) {
        self.controller = Some(controller);
    }

    pub fn clear_controller(&mut self) {
        self.controller = None;
    }
}

impl fmt::Display for VideoOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
