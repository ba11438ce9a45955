//! Plain data read from the display server at session start.
//!
//! These records are what a provider returns; the catalog validates them and
//! turns them into domain objects.  They serialize so `thinkdockd status` can
//! print them and tests can describe fixtures compactly.

use serde::{Deserialize, Serialize};

use crate::domain::controller::ControllerId;
use crate::domain::geometry::Point;
use crate::domain::mode::ModeId;
use crate::domain::output::{ConnectionState, OutputId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeInfo {
    pub id: ModeId,
    pub width: u32,
    pub height: u32,
    /// Refresh rate as the server computes it, before scan correction.
    pub refresh: f64,
    #[serde(default)]
    pub interlaced: bool,
    #[serde(default)]
    pub double_scan: bool,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    pub connection: ConnectionState,
    pub width_mm: u64,
    pub height_mm: u64,
    #[serde(default)]
    pub modes: Vec<ModeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_mode: Option<ModeId>,
    #[serde(default)]
    pub controllers: Vec<ControllerId>,
    /// Controller currently driving this output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<ControllerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerInfo {
    pub id: ControllerId,
    pub position: Point,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ModeId>,
    #[serde(default)]
    pub outputs: Vec<OutputId>,
    #[serde(default)]
    pub possible_outputs: Vec<OutputId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub controllers: Vec<ControllerInfo>,
    pub outputs: Vec<OutputInfo>,
    pub modes: Vec<ModeInfo>,
}
