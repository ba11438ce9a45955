//! DockLayoutUseCase: decides which monitors to light up after a dock event.
//!
//! [`plan_layout`] turns the connected outputs of a fresh catalog into a
//! ready-to-commit [`ConfigurationManager`]; [`apply_dock_layout`] does the
//! query, plan and commit in one go.
//!
//! The rules:
//!
//! - The internal panel is the first connected output whose name starts with
//!   one of the configured prefixes (`LVDS`, `eDP`).  Every other connected
//!   output is external.
//! - Undocked, or docked with nothing plugged in: the panel alone.
//! - Docked with externals: the first external is primary and the others are
//!   chained to its right.  The panel joins according to [`PanelPlacement`];
//!   in mirror mode the panel stays primary and the first external shows the
//!   same image.
//!
//! Every monitor gets a controller from the catalog's pool and its output's
//! preferred mode.  Outputs left out of the plan have their controllers
//! switched off at commit.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use thinkdock_core::{
    Alignment, CatalogError, CommitReport, ConfigurationError, ConfigurationManager,
    DisplayProvider, MonitorError, MonitorId, OutputId, ScreenResources, Wing,
};

/// Error type for layout planning.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutPlanError {
    #[error("no output is connected")]
    NoConnectedOutput,

    #[error("no free controller can drive {0}")]
    NoFreeController(OutputId),

    #[error("{0} reports no modes")]
    NoMode(OutputId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Where the internal panel goes when docked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelPlacement {
    /// Right of the last external monitor.
    #[default]
    Right,
    /// Left of the primary external monitor.
    Left,
    /// Above the primary external monitor.
    Above,
    /// Below the primary external monitor.
    Below,
    /// The first external monitor mirrors the panel.
    Mirror,
    /// Panel switched off.
    ExternalOnly,
}

/// Layout rules for dock transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPolicy {
    pub internal_output_prefixes: Vec<String>,
    pub placement: PanelPlacement,
    pub alignment: Alignment,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            internal_output_prefixes: vec!["LVDS".to_string(), "eDP".to_string()],
            placement: PanelPlacement::default(),
            alignment: Alignment::default(),
        }
    }
}

impl LayoutPolicy {
    pub fn is_internal(&self, output_name: &str) -> bool {
        self.internal_output_prefixes
            .iter()
            .any(|prefix| output_name.starts_with(prefix.as_str()))
    }
}

/// Builds the monitor graph for the current dock state.
///
/// Returns every controller to the pool first; the plan hands them out again.
///
/// # Errors
///
/// Returns [`LayoutPlanError::NoConnectedOutput`] when nothing is plugged in,
/// [`LayoutPlanError::NoFreeController`] when the GPU runs out of
/// controllers, or [`LayoutPlanError::NoMode`] for an output without modes.
pub fn plan_layout(
    resources: &mut ScreenResources,
    policy: &LayoutPolicy,
    docked: bool,
) -> Result<ConfigurationManager, LayoutPlanError> {
    let connected: Vec<(OutputId, bool)> = resources
        .connected_outputs()
        .iter()
        .map(|o| (o.id(), policy.is_internal(o.name())))
        .collect();
    let panel = connected.iter().find(|(_, internal)| *internal).map(|(id, _)| *id);
    let externals: Vec<OutputId> = connected
        .iter()
        .filter(|(id, _)| Some(*id) != panel)
        .map(|(id, _)| *id)
        .collect();

    resources.release_all_controllers();
    let mut manager = ConfigurationManager::with_alignment(policy.alignment);

    if !docked || externals.is_empty() {
        let only = panel
            .or_else(|| externals.first().copied())
            .ok_or(LayoutPlanError::NoConnectedOutput)?;
        let id = add_driven_monitor(&mut manager, resources, only)?;
        manager.set_monitor_primary(id)?;
        info!(docked, output = %only, "planned single-monitor layout");
        return Ok(manager);
    }

    if let (PanelPlacement::Mirror, Some(panel)) = (policy.placement, panel) {
        let source = add_driven_monitor(&mut manager, resources, panel)?;
        let mirror = manager.add_monitor(resources, externals[0])?;
        manager.graph_mut().set_mirror(mirror, source, resources)?;
        chain_right(&mut manager, resources, source, &externals[1..])?;
        manager.set_monitor_primary(source)?;
        info!(externals = externals.len(), "planned mirrored layout");
        return Ok(manager);
    }

    let primary = add_driven_monitor(&mut manager, resources, externals[0])?;
    let last = chain_right(&mut manager, resources, primary, &externals[1..])?;
    manager.set_monitor_primary(primary)?;

    match (panel, policy.placement) {
        (None, _) | (Some(_), PanelPlacement::ExternalOnly) => {}
        (Some(panel), placement) => {
            let id = add_driven_monitor(&mut manager, resources, panel)?;
            let (anchor, wing) = match placement {
                PanelPlacement::Left => (primary, Wing::Left),
                PanelPlacement::Above => (primary, Wing::Top),
                PanelPlacement::Below => (primary, Wing::Bottom),
                _ => (last, Wing::Right),
            };
            manager.graph_mut().set_wing(anchor, wing, Some(id))?;
        }
    }

    info!(
        externals = externals.len(),
        placement = ?policy.placement,
        "planned docked layout"
    );
    Ok(manager)
}

/// Queries `provider`, plans the layout for `docked` and commits it.
///
/// # Errors
///
/// Returns [`LayoutPlanError`] for query, planning or commit failures.
pub fn apply_dock_layout(
    provider: &mut dyn DisplayProvider,
    policy: &LayoutPolicy,
    docked: bool,
) -> Result<CommitReport, LayoutPlanError> {
    let mut resources = ScreenResources::query(provider)?;
    let mut manager = plan_layout(&mut resources, policy, docked)?;
    let report = manager.commit(&mut resources, provider)?;
    info!(
        docked,
        width = report.screen.pixels.width,
        height = report.screen.pixels.height,
        "dock layout applied"
    );
    Ok(report)
}

/// Adds a monitor with a pooled controller and the output's preferred mode.
fn add_driven_monitor(
    manager: &mut ConfigurationManager,
    resources: &mut ScreenResources,
    output: OutputId,
) -> Result<MonitorId, LayoutPlanError> {
    let id = manager.add_monitor(resources, output)?;
    let mode = manager
        .graph()
        .preferred_output_mode(id, resources)?
        .ok_or(LayoutPlanError::NoMode(output))?;
    let controller = resources
        .request_controller_for(output)?
        .ok_or(LayoutPlanError::NoFreeController(output))?;
    let graph = manager.graph_mut();
    graph.set_controller(id, controller, resources)?;
    graph.set_output_mode(id, mode, resources)?;
    debug!(%output, %controller, %mode, "monitor driven");
    Ok(id)
}

/// Chains `outputs` to the right of `start`, returning the last monitor.
fn chain_right(
    manager: &mut ConfigurationManager,
    resources: &mut ScreenResources,
    start: MonitorId,
    outputs: &[OutputId],
) -> Result<MonitorId, LayoutPlanError> {
    let mut last = start;
    for output in outputs {
        let id = add_driven_monitor(manager, resources, *output)?;
        manager.graph_mut().set_right_wing(last, id)?;
        last = id;
    }
    Ok(last)
}
