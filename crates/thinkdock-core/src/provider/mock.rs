//! In-memory display provider.
//!
//! Serves a fixed [`ResourceSnapshot`] and records every [`CommitRequest`]
//! instead of touching a display server.  Accepted requests are written back
//! into the snapshot, so a second query sees the applied layout the way it
//! would on a real server.

use super::{CommitRequest, DisplayProvider, ProviderError, ResourceSnapshot};

/// A [`DisplayProvider`] backed by a snapshot held in memory.
#[derive(Debug, Clone, Default)]
pub struct MockDisplayProvider {
    snapshot: ResourceSnapshot,
    applied: Vec<CommitRequest>,
    fail_next: Option<ProviderError>,
    unavailable: bool,
}

impl MockDisplayProvider {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// A provider whose snapshot query always fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Makes the next [`apply`](DisplayProvider::apply) fail with `error`.
    pub fn fail_next_apply(&mut self, error: ProviderError) {
        self.fail_next = Some(error);
    }

    /// Every request accepted so far, oldest first.
    pub fn applied(&self) -> &[CommitRequest] {
        &self.applied
    }

    pub fn last_applied(&self) -> Option<&CommitRequest> {
        self.applied.last()
    }

    pub fn current_snapshot(&self) -> &ResourceSnapshot {
        &self.snapshot
    }

    /// Replaces the served snapshot, e.g. to simulate a hotplug.
    pub fn replace_snapshot(&mut self, snapshot: ResourceSnapshot) {
        self.snapshot = snapshot;
    }
}

impl DisplayProvider for MockDisplayProvider {
    fn snapshot(&self) -> Result<ResourceSnapshot, ProviderError> {
        if self.unavailable {
            return Err(ProviderError::Unavailable("mock display is offline".to_string()));
        }
        Ok(self.snapshot.clone())
    }

    fn apply(&mut self, request: &CommitRequest) -> Result<(), ProviderError> {
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }

        for info in &mut self.snapshot.controllers {
            match request.controllers.iter().find(|s| s.controller == info.id) {
                Some(state) => {
                    info.position = request.normalized_position(state.position);
                    info.width = state.width;
                    info.height = state.height;
                    info.mode = Some(state.mode);
                    info.outputs = state.outputs.clone();
                }
                None => {
                    info.width = 0;
                    info.height = 0;
                    info.mode = None;
                    info.outputs.clear();
                }
            }
        }
        for output in &mut self.snapshot.outputs {
            output.controller = request
                .controllers
                .iter()
                .find(|s| s.outputs.contains(&output.id))
                .map(|s| s.controller);
        }

        self.applied.push(request.clone());
        Ok(())
    }
}

/// Ready-made snapshots for tests and benches.
pub mod fixture {
    use crate::domain::controller::ControllerId;
    use crate::domain::geometry::Point;
    use crate::domain::mode::ModeId;
    use crate::domain::output::{ConnectionState, OutputId};
    use crate::provider::{ControllerInfo, ModeInfo, OutputInfo, ResourceSnapshot};

    pub const LVDS: OutputId = OutputId(0x4c);
    pub const VGA: OutputId = OutputId(0x4d);
    pub const DP2: OutputId = OutputId(0x4e);
    pub const DP3: OutputId = OutputId(0x4f);

    pub const MODE_1366X768: ModeId = ModeId(0x50);
    pub const MODE_1920X1080: ModeId = ModeId(0x51);
    pub const MODE_1024X768: ModeId = ModeId(0x52);
    pub const MODE_1280X1024: ModeId = ModeId(0x53);

    pub const CRTC_A: ControllerId = ControllerId(0x40);
    pub const CRTC_B: ControllerId = ControllerId(0x41);
    pub const CRTC_C: ControllerId = ControllerId(0x42);

    fn mode(id: ModeId, width: u32, height: u32, refresh: f64) -> ModeInfo {
        ModeInfo {
            id,
            width,
            height,
            refresh,
            interlaced: false,
            double_scan: false,
            name: format!("{width}x{height}"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn output(
        id: OutputId,
        name: &str,
        connection: ConnectionState,
        width_mm: u64,
        height_mm: u64,
        modes: Vec<ModeId>,
        controllers: Vec<ControllerId>,
        controller: Option<ControllerId>,
    ) -> OutputInfo {
        OutputInfo {
            id,
            name: name.to_string(),
            connection,
            width_mm,
            height_mm,
            preferred_mode: modes.first().copied(),
            modes,
            controllers,
            controller,
        }
    }

    fn idle_controller(id: ControllerId, possible_outputs: Vec<OutputId>) -> ControllerInfo {
        ControllerInfo {
            id,
            position: Point::ORIGIN,
            width: 0,
            height: 0,
            mode: None,
            outputs: vec![],
            possible_outputs,
        }
    }

    /// A laptop with two controllers: the internal panel on CRTC A,
    /// nothing plugged into VGA or DisplayPort.
    pub fn undocked() -> ResourceSnapshot {
        let all = vec![LVDS, VGA, DP2];
        ResourceSnapshot {
            modes: vec![
                mode(MODE_1366X768, 1366, 768, 60.0),
                mode(MODE_1920X1080, 1920, 1080, 60.0),
                mode(MODE_1024X768, 1024, 768, 60.0),
            ],
            outputs: vec![
                output(
                    LVDS,
                    "LVDS1",
                    ConnectionState::Connected,
                    277,
                    156,
                    vec![MODE_1366X768, MODE_1024X768],
                    vec![CRTC_A, CRTC_B],
                    Some(CRTC_A),
                ),
                output(
                    VGA,
                    "VGA1",
                    ConnectionState::Disconnected,
                    0,
                    0,
                    vec![],
                    vec![CRTC_A, CRTC_B],
                    None,
                ),
                output(
                    DP2,
                    "DP2",
                    ConnectionState::Disconnected,
                    0,
                    0,
                    vec![],
                    vec![CRTC_A, CRTC_B],
                    None,
                ),
            ],
            controllers: vec![
                ControllerInfo {
                    id: CRTC_A,
                    position: Point::ORIGIN,
                    width: 1366,
                    height: 768,
                    mode: Some(MODE_1366X768),
                    outputs: vec![LVDS],
                    possible_outputs: all.clone(),
                },
                idle_controller(CRTC_B, all),
            ],
        }
    }

    /// [`undocked`] with a 1920x1080 monitor on DP2 (the dock's DisplayPort).
    pub fn docked() -> ResourceSnapshot {
        let mut snapshot = undocked();
        let dp = &mut snapshot.outputs[2];
        dp.connection = ConnectionState::Connected;
        dp.width_mm = 531;
        dp.height_mm = 298;
        dp.modes = vec![MODE_1920X1080, MODE_1024X768];
        dp.preferred_mode = Some(MODE_1920X1080);
        snapshot
    }

    /// [`docked`] plus a second external 1280x1024 monitor on DP3 and a
    /// third controller.
    pub fn docked_dual() -> ResourceSnapshot {
        let mut snapshot = docked();
        snapshot.modes.push(mode(MODE_1280X1024, 1280, 1024, 60.02));
        for c in &mut snapshot.controllers {
            c.possible_outputs.push(DP3);
        }
        snapshot
            .controllers
            .push(idle_controller(CRTC_C, vec![LVDS, VGA, DP2, DP3]));
        for o in &mut snapshot.outputs {
            o.controllers.push(CRTC_C);
        }
        snapshot.outputs.push(output(
            DP3,
            "DP3",
            ConnectionState::Connected,
            376,
            301,
            vec![MODE_1280X1024, MODE_1024X768],
            vec![CRTC_A, CRTC_B, CRTC_C],
            None,
        ));
        snapshot
    }

    /// Four connected outputs of distinct sizes, all controllers idle.
    ///
    /// | output | modes        | controllers |
    /// |--------|--------------|-------------|
    /// | 1      | 800x600      | 101         |
    /// | 2      | 1024x768, 800x600 | 102, 101 |
    /// | 3      | 1280x1024    | 103         |
    /// | 4      | 1920x1080    | 104         |
    pub fn four_heads() -> ResourceSnapshot {
        let sizes = [(800, 600), (1024, 768), (1280, 1024), (1920, 1080)];
        let modes = sizes
            .iter()
            .zip(1u64..)
            .map(|(&(w, h), id)| mode(ModeId(id), w, h, 60.0))
            .collect();
        let outputs = (1u64..=4)
            .map(|n| {
                let (modes, controllers) = match n {
                    2 => (vec![ModeId(2), ModeId(1)], vec![ControllerId(102), ControllerId(101)]),
                    _ => (vec![ModeId(n)], vec![ControllerId(100 + n)]),
                };
                output(
                    OutputId(n),
                    &format!("OUT{n}"),
                    ConnectionState::Connected,
                    100 * n + 200,
                    60 * n + 150,
                    modes,
                    controllers,
                    None,
                )
            })
            .collect();
        let controllers = (1u64..=4)
            .map(|n| {
                let possible = match n {
                    1 => vec![OutputId(1), OutputId(2)],
                    _ => vec![OutputId(n)],
                };
                idle_controller(ControllerId(100 + n), possible)
            })
            .collect();
        ResourceSnapshot {
            controllers,
            outputs,
            modes,
        }
    }
}
