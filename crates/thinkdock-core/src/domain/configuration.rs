//! The commit orchestrator.
//!
//! [`ConfigurationManager`] owns one [`MonitorGraph`] and the single primary
//! designation.  [`commit`](ConfigurationManager::commit) turns the graph into
//! controller settings and hands them to the display provider in one call.
//!
//! Commit works on a staged copy of the catalog.  The caller's
//! [`ScreenResources`] is only replaced once the provider has accepted the
//! request, so every failure (validation or provider) leaves it as it was.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::controller::ControllerId;
use super::geometry::{Alignment, Point};
use super::monitor::{MonitorError, MonitorGraph, MonitorId};
use super::output::OutputId;
use super::resources::{CatalogError, ScreenResources};
use crate::provider::{CommitRequest, DisplayProvider, ProviderError, ScreenSize};

/// Errors returned by [`ConfigurationManager`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("no primary monitor designated")]
    MissingPrimary,

    #[error("unknown {0}")]
    UnknownMonitor(MonitorId),

    #[error("{0} is disabled and cannot be primary")]
    PrimaryUnavailable(MonitorId),

    #[error("primary output {0} is not connected")]
    PrimaryDisconnected(OutputId),

    #[error("{controller} drives outputs that share no mode")]
    NoCommonMode { controller: ControllerId },

    #[error("{controller} drives monitors that are not mirrors of each other")]
    SharedController { controller: ControllerId },

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("display provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// What a successful commit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub enabled: Vec<ControllerId>,
    pub disabled: Vec<ControllerId>,
    pub screen: ScreenSize,
    pub origin: Point,
}

/// Owns the monitors of one configuration attempt and commits them.
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    graph: MonitorGraph,
    primary: Option<MonitorId>,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alignment(alignment: Alignment) -> Self {
        Self {
            graph: MonitorGraph::with_alignment(alignment),
            primary: None,
        }
    }

    pub fn graph(&self) -> &MonitorGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut MonitorGraph {
        &mut self.graph
    }

    /// Adds a monitor for `output`.  See [`MonitorGraph::add_monitor`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Monitor`] if `output` is unknown.
    pub fn add_monitor(
        &mut self,
        resources: &ScreenResources,
        output: OutputId,
    ) -> Result<MonitorId, ConfigurationError> {
        Ok(self.graph.add_monitor(resources, output)?)
    }

    /// Makes `id` the one primary monitor, replacing any previous primary.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownMonitor`] or
    /// [`ConfigurationError::PrimaryUnavailable`]; the previous primary is
    /// kept in both cases.
    pub fn set_monitor_primary(&mut self, id: MonitorId) -> Result<(), ConfigurationError> {
        let monitor = self
            .graph
            .monitor(id)
            .map_err(|_| ConfigurationError::UnknownMonitor(id))?;
        if monitor.is_disabled() {
            return Err(ConfigurationError::PrimaryUnavailable(id));
        }
        if let Some(previous) = self.primary.replace(id) {
            debug!(%previous, primary = %id, "primary monitor replaced");
        }
        Ok(())
    }

    pub fn primary(&self) -> Option<MonitorId> {
        self.primary
    }

    pub fn all_monitors(&self) -> impl Iterator<Item = MonitorId> + '_ {
        self.graph.iter().map(|(id, _)| id)
    }

    /// Lays out the graph and applies it through `provider`.
    ///
    /// Steps, in order: check the primary; disable monitors whose output is
    /// unplugged; place every monitor reachable from the primary; stage each
    /// monitor's mode, position and output on its controller; check every
    /// touched controller's mode against all of its outputs and that it only
    /// drives mirrors of one monitor; submit one
    /// [`CommitRequest`].  Controllers not touched by the layout are switched
    /// off.
    ///
    /// On success `resources` reflects the applied configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::MissingPrimary`] before anything is computed.
    /// - [`ConfigurationError::PrimaryDisconnected`] if the primary's output
    ///   is unplugged.
    /// - [`ConfigurationError::NoCommonMode`] naming the first invalid
    ///   controller; the provider is not called.
    /// - [`ConfigurationError::SharedController`] if one controller would
    ///   drive monitors at different positions or with different images.
    /// - [`ConfigurationError::Monitor`] for an incomplete monitor.
    /// - [`ConfigurationError::Provider`] if the provider rejects the request.
    pub fn commit(
        &mut self,
        resources: &mut ScreenResources,
        provider: &mut dyn DisplayProvider,
    ) -> Result<CommitReport, ConfigurationError> {
        let primary = self.primary.ok_or(ConfigurationError::MissingPrimary)?;
        let primary_output = self.graph.monitor(primary)?.output();
        if !self.graph.monitor(primary)?.is_disabled()
            && !resources.output(primary_output)?.is_connected()
        {
            return Err(ConfigurationError::PrimaryDisconnected(primary_output));
        }
        let mut staged = resources.clone();

        let monitors: Vec<(MonitorId, OutputId, bool)> = self
            .graph
            .iter()
            .map(|(id, m)| (id, m.output(), m.is_disabled()))
            .collect();
        for (id, output, disabled) in monitors {
            if disabled || staged.output(output)?.is_connected() {
                continue;
            }
            warn!(%id, %output, "output is not connected, disabling its monitor");
            self.graph.disable(id, &mut staged)?;
        }

        self.graph.calculate_monitor_positions(primary, &staged)?;
        staged.reset_all_controllers();
        let touched = self.graph.apply_cascading_config(primary, &mut staged)?;

        for id in &touched {
            let controller = staged.controller(*id)?;
            let Some(mode) = controller.mode() else {
                return Err(ConfigurationError::NoCommonMode { controller: *id });
            };
            for output in controller.active_outputs() {
                if !staged.output(*output)?.supports_mode(mode) {
                    error!(controller = %id, %output, %mode, "controller mode not supported by all its outputs");
                    return Err(ConfigurationError::NoCommonMode { controller: *id });
                }
            }
            self.check_shared_controller(*id)?;
        }

        let states = touched
            .iter()
            .map(|id| staged.controller(*id).map(|c| c.state()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let enabled: Vec<ControllerId> = states.iter().map(|s| s.controller).collect();
        let disabled: Vec<ControllerId> = staged
            .controllers()
            .iter()
            .map(|c| c.id())
            .filter(|id| !enabled.contains(id))
            .collect();

        let screen = ScreenSize {
            pixels: self.graph.screen_dimensions_pixels(),
            millimeters: self.graph.screen_dimensions_millimeters(),
        };
        let origin = self
            .graph
            .iter()
            .filter(|(_, m)| !m.is_disabled() && m.placement().is_some())
            .map(|(_, m)| m.position())
            .fold(Point::ORIGIN, |acc, p| Point::new(acc.x.min(p.x), acc.y.min(p.y)));

        let request = CommitRequest {
            controllers: states,
            disabled: disabled.clone(),
            screen,
            origin,
            primary_output,
        };
        if let Err(e) = provider.apply(&request) {
            error!("display provider rejected the layout: {e}");
            return Err(e.into());
        }

        *resources = staged;
        info!(
            enabled = enabled.len(),
            disabled = disabled.len(),
            width = screen.pixels.width,
            height = screen.pixels.height,
            "layout committed"
        );
        Ok(CommitReport {
            enabled,
            disabled,
            screen,
            origin,
        })
    }

    /// Every placed monitor on `controller` must show the same image at the
    /// same position, i.e. mirror one common source.
    fn check_shared_controller(&self, controller: ControllerId) -> Result<(), ConfigurationError> {
        let mut first: Option<(MonitorId, Point)> = None;
        for (id, m) in self.graph.iter() {
            if m.is_disabled() || m.placement().is_none() || m.controller() != Some(controller) {
                continue;
            }
            let root = self.graph.mirror_root(id)?;
            match first {
                None => first = Some((root, m.position())),
                Some((r, p)) if r == root && p == m.position() => {}
                Some(_) => {
                    error!(%controller, monitor = %id, "controller shared by monitors that are not mirrors");
                    return Err(ConfigurationError::SharedController { controller });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Dimensions;
    use crate::domain::mode::ModeId;
    use crate::provider::mock::{fixture, MockDisplayProvider};

    fn four_heads() -> (MockDisplayProvider, ScreenResources) {
        let provider = MockDisplayProvider::new(fixture::four_heads());
        let resources = ScreenResources::query(&provider).unwrap();
        (provider, resources)
    }

    /// Adds monitors for outputs 1 and 2 with their own controller and mode,
    /// output 2 to the right of output 1.
    fn side_by_side(res: &mut ScreenResources) -> (ConfigurationManager, MonitorId, MonitorId) {
        let mut mgr = ConfigurationManager::new();
        let mut ids = Vec::new();
        for n in 1..=2u64 {
            let id = mgr.add_monitor(res, OutputId(n)).unwrap();
            let controller = res.request_controller_for(OutputId(n)).unwrap().unwrap();
            mgr.graph_mut().set_controller(id, controller, res).unwrap();
            mgr.graph_mut().set_output_mode(id, ModeId(n), res).unwrap();
            ids.push(id);
        }
        mgr.graph_mut().set_right_wing(ids[0], ids[1]).unwrap();
        (mgr, ids[0], ids[1])
    }

    #[test]
    fn test_commit_without_primary_fails_before_provider_call() {
        let (mut provider, mut res) = four_heads();
        let (mut mgr, _, _) = side_by_side(&mut res);

        let result = mgr.commit(&mut res, &mut provider);

        assert_eq!(result, Err(ConfigurationError::MissingPrimary));
        assert!(provider.applied().is_empty());
    }

    #[test]
    fn test_set_monitor_primary_twice_keeps_only_second() {
        let (_, mut res) = four_heads();
        let (mut mgr, a, b) = side_by_side(&mut res);

        mgr.set_monitor_primary(a).unwrap();
        mgr.set_monitor_primary(b).unwrap();

        assert_eq!(mgr.primary(), Some(b));
    }

    #[test]
    fn test_set_monitor_primary_rejects_unknown_monitor_and_keeps_previous() {
        let (_, mut res) = four_heads();
        let (mut mgr, a, _) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();

        // A handle from a larger graph does not exist in this one.
        let mut other = ConfigurationManager::new();
        for n in 1..=3u64 {
            other.add_monitor(&res, OutputId(n)).unwrap();
        }
        let stray = other.all_monitors().last().unwrap();

        assert_eq!(
            mgr.set_monitor_primary(stray),
            Err(ConfigurationError::UnknownMonitor(stray))
        );
        assert_eq!(mgr.primary(), Some(a));
    }

    #[test]
    fn test_commit_pushes_extended_layout_to_provider() {
        let (mut provider, mut res) = four_heads();
        let (mut mgr, a, b) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();

        let report = mgr.commit(&mut res, &mut provider).unwrap();

        assert_eq!(report.enabled.len(), 2);
        assert_eq!(report.screen.pixels, Dimensions::new(1824, 768));
        assert_eq!(report.origin, Point::ORIGIN);
        let request = provider.last_applied().unwrap();
        assert_eq!(request.primary_output, OutputId(1));
        let right = request
            .controllers
            .iter()
            .find(|s| s.outputs == vec![OutputId(2)])
            .unwrap();
        assert_eq!(right.position, Point::new(800, 0));
        assert_eq!(mgr.graph().monitor(b).unwrap().position(), Point::new(800, 0));
        // Catalog now reflects the applied layout.
        assert!(res.controller(right.controller).unwrap().is_enabled());
    }

    #[test]
    fn test_commit_disables_controllers_outside_layout() {
        let (mut provider, mut res) = four_heads();
        let (mut mgr, a, _) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();

        let report = mgr.commit(&mut res, &mut provider).unwrap();

        assert_eq!(report.disabled, vec![ControllerId(103), ControllerId(104)]);
    }

    #[test]
    fn test_commit_reports_negative_origin_for_left_wing() {
        let (mut provider, mut res) = four_heads();
        let (mut mgr, a, b) = side_by_side(&mut res);
        mgr.graph_mut().set_wing(a, crate::domain::monitor::Wing::Right, None).unwrap();
        mgr.graph_mut().set_left_wing(a, b).unwrap();
        mgr.set_monitor_primary(a).unwrap();

        let report = mgr.commit(&mut res, &mut provider).unwrap();

        assert_eq!(report.origin, Point::new(-1024, 0));
        let request = provider.last_applied().unwrap();
        assert_eq!(request.normalized_position(Point::ORIGIN), Point::new(1024, 0));
    }

    #[test]
    fn test_commit_mirror_binds_shared_mode() {
        let (mut provider, mut res) = four_heads();
        let mut mgr = ConfigurationManager::new();
        let a = mgr.add_monitor(&res, OutputId(1)).unwrap();
        let b = mgr.add_monitor(&res, OutputId(2)).unwrap();
        let controller = res.request_controller_for(OutputId(1)).unwrap().unwrap();
        mgr.graph_mut().set_controller(a, controller, &res).unwrap();
        mgr.graph_mut().set_mirror(b, a, &res).unwrap();
        mgr.set_monitor_primary(a).unwrap();

        let report = mgr.commit(&mut res, &mut provider).unwrap();

        assert_eq!(report.enabled, vec![controller]);
        let request = provider.last_applied().unwrap();
        assert_eq!(request.controllers.len(), 1);
        assert_eq!(request.controllers[0].mode, ModeId(1));
        assert_eq!(request.controllers[0].outputs, vec![OutputId(1), OutputId(2)]);
    }

    #[test]
    fn test_commit_rejects_shared_controller_without_common_mode() {
        let (mut provider, mut res) = four_heads();
        let before = res.clone();
        let mut mgr = ConfigurationManager::new();
        let a = mgr.add_monitor(&res, OutputId(1)).unwrap();
        let b = mgr.add_monitor(&res, OutputId(2)).unwrap();
        // Outputs 1 and 2 can both use controller 101, but with different modes.
        mgr.graph_mut().set_controller(a, ControllerId(101), &res).unwrap();
        mgr.graph_mut().set_output_mode(a, ModeId(1), &res).unwrap();
        mgr.graph_mut().set_controller(b, ControllerId(101), &res).unwrap();
        mgr.graph_mut().set_output_mode(b, ModeId(2), &res).unwrap();
        mgr.graph_mut().set_right_wing(a, b).unwrap();
        mgr.set_monitor_primary(a).unwrap();

        let result = mgr.commit(&mut res, &mut provider);

        assert_eq!(
            result,
            Err(ConfigurationError::NoCommonMode {
                controller: ControllerId(101)
            })
        );
        assert!(provider.applied().is_empty());
        assert_eq!(res.controllers(), before.controllers());
    }

    #[test]
    fn test_commit_rejects_controller_shared_by_side_by_side_monitors() {
        // Arrange
        let (mut provider, mut res) = four_heads();
        let before = res.clone();
        let mut mgr = ConfigurationManager::new();
        let a = mgr.add_monitor(&res, OutputId(1)).unwrap();
        let b = mgr.add_monitor(&res, OutputId(2)).unwrap();
        // Same controller and mode, but b is a wing of a rather than a mirror.
        for id in [a, b] {
            mgr.graph_mut().set_controller(id, ControllerId(101), &res).unwrap();
            mgr.graph_mut().set_output_mode(id, ModeId(1), &res).unwrap();
        }
        mgr.graph_mut().set_right_wing(a, b).unwrap();
        mgr.set_monitor_primary(a).unwrap();

        // Act
        let result = mgr.commit(&mut res, &mut provider);

        // Assert
        assert_eq!(
            result,
            Err(ConfigurationError::SharedController {
                controller: ControllerId(101)
            })
        );
        assert!(provider.applied().is_empty());
        assert_eq!(res.controllers(), before.controllers());
    }

    #[test]
    fn test_commit_keeps_mirror_of_unplugged_source_lit() {
        // Arrange
        let mut snapshot = fixture::four_heads();
        snapshot.outputs[0].connection = crate::domain::output::ConnectionState::Disconnected;
        let mut provider = MockDisplayProvider::new(snapshot);
        let mut res = ScreenResources::query(&provider).unwrap();
        let mut mgr = ConfigurationManager::new();
        let primary = mgr.add_monitor(&res, OutputId(3)).unwrap();
        let source = mgr.add_monitor(&res, OutputId(1)).unwrap();
        let mirror = mgr.add_monitor(&res, OutputId(2)).unwrap();
        mgr.graph_mut().set_controller(primary, ControllerId(103), &res).unwrap();
        mgr.graph_mut().set_output_mode(primary, ModeId(3), &res).unwrap();
        mgr.graph_mut().set_controller(source, ControllerId(101), &res).unwrap();
        mgr.graph_mut().set_mirror(mirror, source, &res).unwrap();
        mgr.graph_mut().set_right_wing(primary, source).unwrap();
        mgr.set_monitor_primary(primary).unwrap();

        // Act
        let report = mgr.commit(&mut res, &mut provider).unwrap();

        // Assert
        assert!(mgr.graph().monitor(source).unwrap().is_disabled());
        assert!(!mgr.graph().monitor(mirror).unwrap().is_disabled());
        assert_eq!(report.enabled, vec![ControllerId(103), ControllerId(101)]);
        let request = provider.last_applied().unwrap();
        let lit = request
            .controllers
            .iter()
            .find(|s| s.controller == ControllerId(101))
            .unwrap();
        assert_eq!(lit.outputs, vec![OutputId(2)]);
        assert_eq!(lit.position, Point::new(1280, 0));
    }

    #[test]
    fn test_commit_provider_failure_leaves_catalog_untouched() {
        let (mut provider, mut res) = four_heads();
        let (mut mgr, a, _) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();
        let before = res.controllers().to_vec();
        provider.fail_next_apply(ProviderError::Rejected("BadMatch".to_string()));

        let result = mgr.commit(&mut res, &mut provider);

        assert_eq!(
            result,
            Err(ConfigurationError::Provider(ProviderError::Rejected(
                "BadMatch".to_string()
            )))
        );
        assert_eq!(res.controllers(), before.as_slice());
    }

    #[test]
    fn test_commit_excludes_disabled_monitor_from_request_and_bounds() {
        let (mut provider, mut res) = four_heads();
        let (mut mgr, a, b) = side_by_side(&mut res);
        let dropped = mgr.graph().monitor(b).unwrap().controller().unwrap();
        mgr.graph_mut().disable(b, &mut res).unwrap();
        mgr.set_monitor_primary(a).unwrap();

        let report = mgr.commit(&mut res, &mut provider).unwrap();

        assert!(!report.enabled.contains(&dropped));
        assert!(report.disabled.contains(&dropped));
        assert_eq!(report.screen.pixels, Dimensions::new(800, 600));
    }

    #[test]
    fn test_commit_disables_unplugged_monitor() {
        let mut snapshot = fixture::four_heads();
        snapshot.outputs[1].connection = crate::domain::output::ConnectionState::Disconnected;
        let mut provider = MockDisplayProvider::new(snapshot);
        let mut res = ScreenResources::query(&provider).unwrap();
        let (mut mgr, a, b) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();

        let report = mgr.commit(&mut res, &mut provider).unwrap();

        assert!(mgr.graph().monitor(b).unwrap().is_disabled());
        assert_eq!(report.enabled.len(), 1);
        assert_eq!(report.screen.pixels, Dimensions::new(800, 600));
    }

    #[test]
    fn test_commit_fails_when_primary_is_unplugged() {
        let mut snapshot = fixture::four_heads();
        snapshot.outputs[0].connection = crate::domain::output::ConnectionState::Disconnected;
        let mut provider = MockDisplayProvider::new(snapshot);
        let mut res = ScreenResources::query(&provider).unwrap();
        let (mut mgr, a, _) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();

        assert_eq!(
            mgr.commit(&mut res, &mut provider),
            Err(ConfigurationError::PrimaryDisconnected(OutputId(1)))
        );
    }

    #[test]
    fn test_commit_with_unplugged_primary_leaves_graph_untouched() {
        // Arrange
        let mut snapshot = fixture::four_heads();
        snapshot.outputs[0].connection = crate::domain::output::ConnectionState::Disconnected;
        snapshot.outputs[1].connection = crate::domain::output::ConnectionState::Disconnected;
        let mut provider = MockDisplayProvider::new(snapshot);
        let mut res = ScreenResources::query(&provider).unwrap();
        let (mut mgr, a, b) = side_by_side(&mut res);
        mgr.set_monitor_primary(a).unwrap();

        // Act
        let result = mgr.commit(&mut res, &mut provider);

        // Assert
        assert_eq!(result, Err(ConfigurationError::PrimaryDisconnected(OutputId(1))));
        assert!(!mgr.graph().monitor(b).unwrap().is_disabled());
        assert!(mgr.graph().monitor(b).unwrap().controller().is_some());
        assert!(provider.applied().is_empty());
    }
}
