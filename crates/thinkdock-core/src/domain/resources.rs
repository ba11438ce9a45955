//! The resource catalog: every mode, output and controller of one session.
//!
//! A `ScreenResources` is built once from a provider snapshot and owns all
//! the domain objects.  Everything else refers to them by id, so dropping the
//! catalog invalidates nothing but ids, and looking up a stale id fails with
//! a [`CatalogError`] instead of dangling.
//!
//! The catalog also keeps the pool of free controllers.  Controllers that
//! were driving something when the snapshot was taken start out busy.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use super::controller::{BindingError, ControllerId, VideoController};
use super::mode::{ModeError, ModeId, ScanFlags, VideoOutputMode};
use super::output::{OutputId, VideoOutput};
use crate::provider::{DisplayProvider, ProviderError, ResourceSnapshot};

/// Errors raised while building or querying the catalog.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("snapshot query failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid mode in snapshot: {0}")]
    InvalidMode(#[from] ModeError),

    #[error("{0} appears twice in the snapshot")]
    DuplicateMode(ModeId),

    #[error("{0} appears twice in the snapshot")]
    DuplicateOutput(OutputId),

    #[error("{0} appears twice in the snapshot")]
    DuplicateController(ControllerId),

    #[error("unknown {0}")]
    UnknownMode(ModeId),

    #[error("unknown {0}")]
    UnknownOutput(OutputId),

    #[error("unknown {0}")]
    UnknownController(ControllerId),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Owns and indexes all modes, outputs and controllers of one session.
#[derive(Debug, Clone)]
pub struct ScreenResources {
    modes: Vec<VideoOutputMode>,
    outputs: Vec<VideoOutput>,
    controllers: Vec<VideoController>,
    mode_index: HashMap<ModeId, usize>,
    output_index: HashMap<OutputId, usize>,
    controller_index: HashMap<ControllerId, usize>,
    busy_controllers: HashSet<ControllerId>,
}

impl ScreenResources {
    /// Queries `provider` and builds a catalog from the result.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Provider`] if the query fails, or any
    /// validation error from [`from_snapshot`](Self::from_snapshot).
    pub fn query(provider: &dyn DisplayProvider) -> Result<Self, CatalogError> {
        let snapshot = provider.snapshot()?;
        Self::from_snapshot(&snapshot)
    }

    /// Validates `snapshot` and builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for invalid modes, duplicate ids, or
    /// references to ids that are not in the snapshot.
    pub fn from_snapshot(snapshot: &ResourceSnapshot) -> Result<Self, CatalogError> {
        let mut resources = Self {
            modes: Vec::with_capacity(snapshot.modes.len()),
            outputs: Vec::with_capacity(snapshot.outputs.len()),
            controllers: Vec::with_capacity(snapshot.controllers.len()),
            mode_index: HashMap::new(),
            output_index: HashMap::new(),
            controller_index: HashMap::new(),
            busy_controllers: HashSet::new(),
        };

        for info in &snapshot.modes {
            let mode = VideoOutputMode::new(
                info.id,
                info.width,
                info.height,
                info.refresh,
                ScanFlags {
                    interlaced: info.interlaced,
                    double_scan: info.double_scan,
                },
                info.name.clone(),
            )?;
            if resources.mode_index.insert(info.id, resources.modes.len()).is_some() {
                return Err(CatalogError::DuplicateMode(info.id));
            }
            resources.modes.push(mode);
        }

        for info in &snapshot.controllers {
            if resources
                .controller_index
                .insert(info.id, resources.controllers.len())
                .is_some()
            {
                return Err(CatalogError::DuplicateController(info.id));
            }
            resources
                .controllers
                .push(VideoController::new(info.id, info.possible_outputs.clone()));
        }

        for info in &snapshot.outputs {
            for mode in info.modes.iter().chain(info.preferred_mode.iter()) {
                resources.mode(*mode)?;
            }
            for controller in info.controllers.iter().chain(info.controller.iter()) {
                resources.controller(*controller)?;
            }
            if resources.output_index.insert(info.id, resources.outputs.len()).is_some() {
                return Err(CatalogError::DuplicateOutput(info.id));
            }
            let mut output = VideoOutput::new(
                info.id,
                info.name.clone(),
                info.connection,
                info.width_mm,
                info.height_mm,
                info.modes.clone(),
                info.preferred_mode,
                info.controllers.clone(),
            );
            if let Some(controller) = info.controller {
                output.set_controller(controller);
            }
            resources.outputs.push(output);
        }

        // Replay each controller's current state now that outputs exist.
        for info in &snapshot.controllers {
            for possible in &info.possible_outputs {
                resources.output(*possible)?;
            }
            let mode = match info.mode {
                Some(id) => Some(resources.mode(id)?.clone()),
                None => None,
            };
            let idx = resources.controller_index[&info.id];
            let controller = &mut resources.controllers[idx];
            controller.set_position(info.position);
            controller.set_width_pixels(info.width);
            controller.set_height_pixels(info.height);
            if let Some(mode) = &mode {
                controller.set_output_mode(mode);
            }
            for output_id in &info.outputs {
                let oidx = *resources
                    .output_index
                    .get(output_id)
                    .ok_or(CatalogError::UnknownOutput(*output_id))?;
                let output = &mut resources.outputs[oidx];
                if let Err(e) = controller.add_output(output) {
                    warn!("snapshot reports an impossible binding, ignoring it: {e}");
                    continue;
                }
                output.set_controller(info.id);
            }
            if mode.is_some() || !info.outputs.is_empty() {
                resources.busy_controllers.insert(info.id);
            }
        }

        debug!(
            modes = resources.modes.len(),
            outputs = resources.outputs.len(),
            controllers = resources.controllers.len(),
            "screen resources built"
        );
        Ok(resources)
    }

    pub fn modes(&self) -> &[VideoOutputMode] {
        &self.modes
    }

    pub fn outputs(&self) -> &[VideoOutput] {
        &self.outputs
    }

    pub fn controllers(&self) -> &[VideoController] {
        &self.controllers
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownMode`] if `id` is not in the catalog.
    pub fn mode(&self, id: ModeId) -> Result<&VideoOutputMode, CatalogError> {
        self.mode_index
            .get(&id)
            .map(|&i| &self.modes[i])
            .ok_or(CatalogError::UnknownMode(id))
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownOutput`] if `id` is not in the catalog.
    pub fn output(&self, id: OutputId) -> Result<&VideoOutput, CatalogError> {
        self.output_index
            .get(&id)
            .map(|&i| &self.outputs[i])
            .ok_or(CatalogError::UnknownOutput(id))
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownController`] if `id` is not in the catalog.
    pub fn controller(&self, id: ControllerId) -> Result<&VideoController, CatalogError> {
        self.controller_index
            .get(&id)
            .map(|&i| &self.controllers[i])
            .ok_or(CatalogError::UnknownController(id))
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownController`] if `id` is not in the catalog.
    pub fn controller_mut(&mut self, id: ControllerId) -> Result<&mut VideoController, CatalogError> {
        match self.controller_index.get(&id) {
            Some(&i) => Ok(&mut self.controllers[i]),
            None => Err(CatalogError::UnknownController(id)),
        }
    }

    /// Outputs with a device attached, in server order.
    pub fn connected_outputs(&self) -> Vec<&VideoOutput> {
        self.outputs.iter().filter(|o| o.is_connected()).collect()
    }

    /// Returns the first mode, in catalog order, that every output in
    /// `outputs` supports.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownOutput`] for an id not in the catalog.
    pub fn find_common_mode(&self, outputs: &[OutputId]) -> Result<Option<ModeId>, CatalogError> {
        let outputs = outputs
            .iter()
            .map(|id| self.output(*id))
            .collect::<Result<Vec<_>, _>>()?;
        if outputs.is_empty() {
            return Ok(None);
        }
        Ok(self
            .modes
            .iter()
            .map(VideoOutputMode::id)
            .find(|mode| outputs.iter().all(|o| o.supports_mode(*mode))))
    }

    pub fn is_controller_free(&self, id: ControllerId) -> bool {
        self.controller_index.contains_key(&id) && !self.busy_controllers.contains(&id)
    }

    /// Hands out the first free controller that `output` can be driven by
    /// and marks it busy.  `Ok(None)` when every candidate is taken.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownOutput`] if `output` is not in the catalog.
    pub fn request_controller_for(
        &mut self,
        output: OutputId,
    ) -> Result<Option<ControllerId>, CatalogError> {
        let candidates = self.output(output)?.supported_controllers().to_vec();
        let found = self
            .controllers
            .iter()
            .map(VideoController::id)
            .find(|id| candidates.contains(id) && !self.busy_controllers.contains(id));
        match found {
            Some(id) => {
                self.busy_controllers.insert(id);
                debug!(%id, %output, "controller requested");
                Ok(Some(id))
            }
            None => {
                warn!(%output, "no free controller can drive this output");
                Ok(None)
            }
        }
    }

    /// Returns `id` to the pool of free controllers.
    pub fn release_controller(&mut self, id: ControllerId) {
        if self.busy_controllers.remove(&id) {
            debug!(%id, "controller released");
        }
    }

    /// Returns every controller to the pool.  Their configuration is untouched.
    pub fn release_all_controllers(&mut self) {
        self.busy_controllers.clear();
    }

    /// Adds `output` to `controller`'s active set and records the binding on
    /// the output.  An output bound elsewhere is detached from its previous
    /// controller first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Binding`] if the output cannot be driven by the
    /// controller; nothing is changed in that case.
    pub fn bind_output(
        &mut self,
        controller: ControllerId,
        output: OutputId,
    ) -> Result<(), CatalogError> {
        let cidx = *self
            .controller_index
            .get(&controller)
            .ok_or(CatalogError::UnknownController(controller))?;
        let oidx = *self
            .output_index
            .get(&output)
            .ok_or(CatalogError::UnknownOutput(output))?;

        self.controllers[cidx].add_output(&self.outputs[oidx])?;

        if let Some(previous) = self.outputs[oidx].controller() {
            if previous != controller {
                if let Some(&pidx) = self.controller_index.get(&previous) {
                    self.controllers[pidx].remove_output(output);
                }
            }
        }
        self.outputs[oidx].set_controller(controller);
        Ok(())
    }

    /// Resets every controller and clears every output binding.
    pub fn reset_all_controllers(&mut self) {
        for controller in &mut self.controllers {
            controller.reset_configuration();
        }
        for output in &mut self.outputs {
            output.clear_controller();
        }
    }

    /// Resets one controller and detaches the outputs it was driving.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownController`] if `id` is not in the catalog.
    pub fn reset_controller(&mut self, id: ControllerId) -> Result<(), CatalogError> {
        let controller = self.controller_mut(id)?;
        let detached = controller.active_outputs().to_vec();
        controller.reset_configuration();
        for output in detached {
            if let Some(&oidx) = self.output_index.get(&output) {
                if self.outputs[oidx].controller() == Some(id) {
                    self.outputs[oidx].clear_controller();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Point;
    use crate::domain::output::ConnectionState;
    use crate::provider::{ControllerInfo, ModeInfo, OutputInfo};

    fn mode_info(id: u64, w: u32, h: u32) -> ModeInfo {
        ModeInfo {
            id: ModeId(id),
            width: w,
            height: h,
            refresh: 60.0,
            interlaced: false,
            double_scan: false,
            name: String::new(),
        }
    }

    fn snapshot() -> ResourceSnapshot {
        ResourceSnapshot {
            modes: vec![mode_info(1, 1920, 1080), mode_info(2, 1366, 768), mode_info(3, 1024, 768)],
            outputs: vec![
                OutputInfo {
                    id: OutputId(10),
                    name: "LVDS1".to_string(),
                    connection: ConnectionState::Connected,
                    width_mm: 310,
                    height_mm: 174,
                    modes: vec![ModeId(2), ModeId(3)],
                    preferred_mode: Some(ModeId(2)),
                    controllers: vec![ControllerId(100), ControllerId(101)],
                    controller: Some(ControllerId(100)),
                },
                OutputInfo {
                    id: OutputId(11),
                    name: "DP2".to_string(),
                    connection: ConnectionState::Connected,
                    width_mm: 510,
                    height_mm: 290,
                    modes: vec![ModeId(1), ModeId(3)],
                    preferred_mode: Some(ModeId(1)),
                    controllers: vec![ControllerId(100), ControllerId(101)],
                    controller: None,
                },
                OutputInfo {
                    id: OutputId(12),
                    name: "VGA1".to_string(),
                    connection: ConnectionState::Disconnected,
                    width_mm: 0,
                    height_mm: 0,
                    modes: vec![],
                    preferred_mode: None,
                    controllers: vec![ControllerId(101)],
                    controller: None,
                },
            ],
            controllers: vec![
                ControllerInfo {
                    id: ControllerId(100),
                    position: Point::ORIGIN,
                    width: 1366,
                    height: 768,
                    mode: Some(ModeId(2)),
                    outputs: vec![OutputId(10)],
                    possible_outputs: vec![OutputId(10), OutputId(11)],
                },
                ControllerInfo {
                    id: ControllerId(101),
                    position: Point::ORIGIN,
                    width: 0,
                    height: 0,
                    mode: None,
                    outputs: vec![],
                    possible_outputs: vec![OutputId(10), OutputId(11), OutputId(12)],
                },
            ],
        }
    }

    #[test]
    fn test_from_snapshot_indexes_all_resources() {
        let res = ScreenResources::from_snapshot(&snapshot()).expect("valid snapshot");
        assert_eq!(res.modes().len(), 3);
        assert_eq!(res.outputs().len(), 3);
        assert_eq!(res.controllers().len(), 2);
        assert_eq!(res.output(OutputId(11)).unwrap().name(), "DP2");
    }

    #[test]
    fn test_from_snapshot_replays_current_controller_state() {
        let res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        let c = res.controller(ControllerId(100)).unwrap();
        assert!(c.is_enabled());
        assert_eq!(c.active_outputs(), &[OutputId(10)]);
        assert_eq!(res.output(OutputId(10)).unwrap().controller(), Some(ControllerId(100)));
    }

    #[test]
    fn test_from_snapshot_rejects_duplicate_mode() {
        let mut snap = snapshot();
        snap.modes.push(mode_info(1, 800, 600));
        assert_eq!(
            ScreenResources::from_snapshot(&snap).unwrap_err(),
            CatalogError::DuplicateMode(ModeId(1))
        );
    }

    #[test]
    fn test_from_snapshot_rejects_dangling_mode_reference() {
        let mut snap = snapshot();
        snap.outputs[0].modes.push(ModeId(99));
        assert_eq!(
            ScreenResources::from_snapshot(&snap).unwrap_err(),
            CatalogError::UnknownMode(ModeId(99))
        );
    }

    #[test]
    fn test_from_snapshot_rejects_mode_with_both_scan_flags() {
        let mut snap = snapshot();
        snap.modes[2].interlaced = true;
        snap.modes[2].double_scan = true;
        assert_eq!(
            ScreenResources::from_snapshot(&snap).unwrap_err(),
            CatalogError::InvalidMode(ModeError::ConflictingScanFlags(ModeId(3)))
        );
    }

    #[test]
    fn test_connected_outputs_skips_unplugged_ports() {
        let res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        let names: Vec<_> = res.connected_outputs().iter().map(|o| o.name().to_string()).collect();
        assert_eq!(names, vec!["LVDS1", "DP2"]);
    }

    #[test]
    fn test_find_common_mode_returns_first_shared_mode() {
        let res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        let common = res.find_common_mode(&[OutputId(10), OutputId(11)]).unwrap();
        assert_eq!(common, Some(ModeId(3)));
    }

    #[test]
    fn test_find_common_mode_is_none_when_sets_are_disjoint() {
        let res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        assert_eq!(res.find_common_mode(&[OutputId(11), OutputId(12)]).unwrap(), None);
    }

    #[test]
    fn test_request_controller_skips_busy_controllers() {
        let mut res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        // 100 is busy driving LVDS1 in the snapshot.
        assert_eq!(res.request_controller_for(OutputId(11)).unwrap(), Some(ControllerId(101)));
        assert_eq!(res.request_controller_for(OutputId(11)).unwrap(), None);
    }

    #[test]
    fn test_release_controller_returns_it_to_the_pool() {
        let mut res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        res.release_controller(ControllerId(100));
        assert!(res.is_controller_free(ControllerId(100)));
        assert_eq!(res.request_controller_for(OutputId(10)).unwrap(), Some(ControllerId(100)));
    }

    #[test]
    fn test_bind_output_moves_output_between_controllers() {
        let mut res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        res.bind_output(ControllerId(101), OutputId(10)).unwrap();

        assert!(res.controller(ControllerId(100)).unwrap().active_outputs().is_empty());
        assert_eq!(
            res.controller(ControllerId(101)).unwrap().active_outputs(),
            &[OutputId(10)]
        );
        assert_eq!(res.output(OutputId(10)).unwrap().controller(), Some(ControllerId(101)));
    }

    #[test]
    fn test_bind_output_rejects_unsupported_controller() {
        let mut res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        let err = res.bind_output(ControllerId(100), OutputId(12)).unwrap_err();
        assert_eq!(
            err,
            CatalogError::Binding(BindingError::UnsupportedController {
                controller: ControllerId(100),
                output: OutputId(12)
            })
        );
    }

    #[test]
    fn test_reset_controller_detaches_its_outputs() {
        let mut res = ScreenResources::from_snapshot(&snapshot()).unwrap();
        res.reset_controller(ControllerId(100)).unwrap();
        assert!(!res.controller(ControllerId(100)).unwrap().is_enabled());
        assert_eq!(res.output(OutputId(10)).unwrap().controller(), None);
    }
}
