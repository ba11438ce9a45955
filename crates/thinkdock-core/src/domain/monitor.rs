//! Monitors and the wing graph that lays them out.
//!
//! A [`Monitor`] pairs one output with the controller and mode that will
//! drive it.  Monitors live in a [`MonitorGraph`] arena and are addressed by
//! [`MonitorId`] handles; every relation (neighbours, controller, output,
//! mode) is stored as an id, never as a reference.
//!
//! # Wings
//!
//! Each monitor has up to four neighbours ("wings"), one per side:
//!
//! ```text
//!              +-------+
//!              |  top  |
//!   +------+   +-------+   +-------+
//!   | left |   |   M   |   | right |
//!   +------+   +-------+   +-------+
//!              |bottom |
//!              +-------+
//! ```
//!
//! Positions are derived by walking the wings outwards from the primary
//! monitor, which sits at (0, 0).  A right neighbour starts where this
//! monitor ends; a left neighbour ends where this monitor starts, and so on.
//! The cross-axis offset follows the graph's [`Alignment`].
//!
//! Every traversal carries a visited set, so a cyclic graph built by a caller
//! still terminates: each monitor is placed (and configured) at most once,
//! by the first path that reaches it.
//!
//! Disabled monitors are transparent: a wing that points at one continues to
//! that monitor's own neighbour on the same side.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use super::controller::{BindingError, ControllerId};
use super::geometry::{Alignment, Dimensions, Point, Rect};
use super::mode::ModeId;
use super::output::OutputId;
use super::resources::{CatalogError, ScreenResources};

/// Stable handle of a monitor inside its [`MonitorGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(usize);

impl MonitorId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor#{}", self.0)
    }
}

/// The four sides a neighbour can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wing {
    Top,
    Left,
    Right,
    Bottom,
}

impl Wing {
    pub const ALL: [Wing; 4] = [Wing::Top, Wing::Left, Wing::Right, Wing::Bottom];

    fn slot(self) -> usize {
        match self {
            Wing::Top => 0,
            Wing::Left => 1,
            Wing::Right => 2,
            Wing::Bottom => 3,
        }
    }

    pub fn opposite(self) -> Wing {
        match self {
            Wing::Top => Wing::Bottom,
            Wing::Left => Wing::Right,
            Wing::Right => Wing::Left,
            Wing::Bottom => Wing::Top,
        }
    }
}

/// Errors raised by monitor graph operations.
#[derive(Debug, Error, PartialEq)]
pub enum MonitorError {
    #[error("unknown {0}")]
    UnknownMonitor(MonitorId),

    #[error("{0} cannot be its own neighbour")]
    SelfAdjacency(MonitorId),

    #[error("{0} has no output mode")]
    NoMode(MonitorId),

    #[error("{0} has no controller")]
    NoController(MonitorId),

    #[error("{0} is disabled")]
    Disabled(MonitorId),

    #[error("{first} and {second} share no output mode")]
    NoCommonMode { first: OutputId, second: OutputId },

    #[error("position of {0} does not fit in screen coordinates")]
    CoordinateOverflow(MonitorId),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Size of one monitor, or of a run of monitors, in both spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width_px: u64,
    pub height_px: u64,
    pub width_mm: u64,
    pub height_mm: u64,
}

/// Cached size limits of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limits {
    /// This monitor alone.
    pub own: Extent,
    /// The horizontal run through this monitor (left wings, itself, right
    /// wings): summed widths, tallest height.
    pub row: Extent,
    /// The vertical run through this monitor: widest width, summed heights.
    pub column: Extent,
}

/// Where a monitor ended up, in pixels and millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub pixels: Rect,
    pub millimeters: Rect,
}

/// One logical screen in the layout.
#[derive(Debug, Clone)]
pub struct Monitor {
    output: OutputId,
    controller: Option<ControllerId>,
    mode: Option<ModeId>,
    wings: [Option<MonitorId>; 4],
    mirror_of: Option<MonitorId>,
    limits: Option<Limits>,
    placement: Option<Placement>,
    position: Point,
    disabled: bool,
}

impl Monitor {
    pub fn output(&self) -> OutputId {
        self.output
    }

    pub fn controller(&self) -> Option<ControllerId> {
        self.controller
    }

    pub fn mode(&self) -> Option<ModeId> {
        self.mode
    }

    pub fn wing(&self, wing: Wing) -> Option<MonitorId> {
        self.wings[wing.slot()]
    }

    /// The monitor this one mirrors, if any.
    pub fn mirror_of(&self) -> Option<MonitorId> {
        self.mirror_of
    }

    /// Position from the last [`MonitorGraph::calculate_monitor_positions`].
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn limits_calculated(&self) -> bool {
        self.limits.is_some()
    }
}

/// Arena of monitors plus the layout algorithms over their wing graph.
#[derive(Debug, Clone, Default)]
pub struct MonitorGraph {
    monitors: Vec<Monitor>,
    alignment: Alignment,
}

impl MonitorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alignment(alignment: Alignment) -> Self {
        Self {
            monitors: Vec::new(),
            alignment,
        }
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonitorId, &Monitor)> {
        self.monitors.iter().enumerate().map(|(i, m)| (MonitorId(i), m))
    }

    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownMonitor`] for a handle from another graph.
    pub fn monitor(&self, id: MonitorId) -> Result<&Monitor, MonitorError> {
        self.monitors.get(id.0).ok_or(MonitorError::UnknownMonitor(id))
    }

    fn monitor_mut(&mut self, id: MonitorId) -> Result<&mut Monitor, MonitorError> {
        self.monitors.get_mut(id.0).ok_or(MonitorError::UnknownMonitor(id))
    }

    pub fn find_by_output(&self, output: OutputId) -> Option<MonitorId> {
        self.iter().find(|(_, m)| m.output == output).map(|(id, _)| id)
    }

    /// Adds a monitor for `output`, inheriting the controller and mode that
    /// currently drive it.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Catalog`] if `output` is not in `resources`.
    pub fn add_monitor(
        &mut self,
        resources: &ScreenResources,
        output: OutputId,
    ) -> Result<MonitorId, MonitorError> {
        let out = resources.output(output)?;
        let controller = out.controller();
        let mode = match controller {
            Some(c) => resources.controller(c)?.mode(),
            None => None,
        };
        let id = MonitorId(self.monitors.len());
        self.monitors.push(Monitor {
            output,
            controller,
            mode,
            wings: [None; 4],
            mirror_of: None,
            limits: None,
            placement: None,
            position: Point::ORIGIN,
            disabled: false,
        });
        debug!(%id, output = out.name(), "monitor added");
        Ok(id)
    }

    /// Assigns `controller` to the monitor.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Binding`] if the monitor's output cannot be
    /// driven by `controller`.  The monitor is left unchanged.
    pub fn set_controller(
        &mut self,
        id: MonitorId,
        controller: ControllerId,
        resources: &ScreenResources,
    ) -> Result<(), MonitorError> {
        let output = resources.output(self.monitor(id)?.output)?;
        resources.controller(controller)?;
        if !output.is_controller_supported(controller) {
            return Err(BindingError::UnsupportedController {
                controller,
                output: output.id(),
            }
            .into());
        }
        self.monitor_mut(id)?.controller = Some(controller);
        self.invalidate_upstream(id);
        Ok(())
    }

    /// Returns whether the monitor's output can be driven by `controller`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] for an unknown monitor or output.
    pub fn is_controller_supported(
        &self,
        id: MonitorId,
        controller: ControllerId,
        resources: &ScreenResources,
    ) -> Result<bool, MonitorError> {
        let output = resources.output(self.monitor(id)?.output)?;
        Ok(output.is_controller_supported(controller))
    }

    /// Binds `mode` to the monitor.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Binding`] if the output does not list `mode`.
    pub fn set_output_mode(
        &mut self,
        id: MonitorId,
        mode: ModeId,
        resources: &ScreenResources,
    ) -> Result<(), MonitorError> {
        let output = resources.output(self.monitor(id)?.output)?;
        resources.mode(mode)?;
        if !output.supports_mode(mode) {
            return Err(BindingError::UnsupportedMode {
                mode,
                output: output.id(),
            }
            .into());
        }
        self.monitor_mut(id)?.mode = Some(mode);
        self.invalidate_upstream(id);
        Ok(())
    }

    /// The preferred mode of the monitor's output.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] for an unknown monitor or output.
    pub fn preferred_output_mode(
        &self,
        id: MonitorId,
        resources: &ScreenResources,
    ) -> Result<Option<ModeId>, MonitorError> {
        Ok(resources.output(self.monitor(id)?.output)?.preferred_output_mode())
    }

    /// Sets (or with `None`, clears) the neighbour on one side of `id`.
    /// Setting a side twice replaces the previous neighbour.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownMonitor`] for unknown handles and
    /// [`MonitorError::SelfAdjacency`] if `neighbor == id`.
    pub fn set_wing(
        &mut self,
        id: MonitorId,
        wing: Wing,
        neighbor: Option<MonitorId>,
    ) -> Result<(), MonitorError> {
        if let Some(n) = neighbor {
            self.monitor(n)?;
            if n == id {
                return Err(MonitorError::SelfAdjacency(id));
            }
        }
        self.monitor_mut(id)?.wings[wing.slot()] = neighbor;
        self.invalidate_upstream(id);
        Ok(())
    }

    /// # Errors
    ///
    /// See [`set_wing`](Self::set_wing).
    pub fn set_right_wing(&mut self, id: MonitorId, neighbor: MonitorId) -> Result<(), MonitorError> {
        self.set_wing(id, Wing::Right, Some(neighbor))
    }

    /// # Errors
    ///
    /// See [`set_wing`](Self::set_wing).
    pub fn set_left_wing(&mut self, id: MonitorId, neighbor: MonitorId) -> Result<(), MonitorError> {
        self.set_wing(id, Wing::Left, Some(neighbor))
    }

    /// # Errors
    ///
    /// See [`set_wing`](Self::set_wing).
    pub fn set_top_wing(&mut self, id: MonitorId, neighbor: MonitorId) -> Result<(), MonitorError> {
        self.set_wing(id, Wing::Top, Some(neighbor))
    }

    /// # Errors
    ///
    /// See [`set_wing`](Self::set_wing).
    pub fn set_bottom_wing(&mut self, id: MonitorId, neighbor: MonitorId) -> Result<(), MonitorError> {
        self.set_wing(id, Wing::Bottom, Some(neighbor))
    }

    /// Makes `target` show the same image as `source`.
    ///
    /// Both monitors are switched to the first mode their outputs share and
    /// `target` is bound to `source`'s controller.  At placement time the
    /// mirror takes `source`'s position.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NoCommonMode`] if the outputs share no mode,
    /// [`MonitorError::NoController`] if `source` has no controller, or
    /// [`MonitorError::Binding`] if `target`'s output cannot use that
    /// controller.  Nothing is changed on error.
    pub fn set_mirror(
        &mut self,
        target: MonitorId,
        source: MonitorId,
        resources: &ScreenResources,
    ) -> Result<(), MonitorError> {
        if target == source {
            return Err(MonitorError::SelfAdjacency(target));
        }
        let (t_out, s_out) = (self.monitor(target)?.output, self.monitor(source)?.output);
        let controller = self
            .monitor(source)?
            .controller
            .ok_or(MonitorError::NoController(source))?;
        if !resources.output(t_out)?.is_controller_supported(controller) {
            return Err(BindingError::UnsupportedController {
                controller,
                output: t_out,
            }
            .into());
        }
        let common = resources
            .find_common_mode(&[s_out, t_out])?
            .ok_or(MonitorError::NoCommonMode {
                first: s_out,
                second: t_out,
            })?;

        self.set_output_mode(source, common, resources)?;
        self.set_output_mode(target, common, resources)?;
        let t = self.monitor_mut(target)?;
        t.controller = Some(controller);
        t.mirror_of = Some(source);
        debug!(%target, %source, mode = %common, "mirror configured");
        Ok(())
    }

    /// Follows `mirror_of` links from `id` to the monitor whose image it
    /// shows.  A monitor that mirrors nothing is its own root.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::UnknownMonitor`] for an unknown handle.
    pub fn mirror_root(&self, id: MonitorId) -> Result<MonitorId, MonitorError> {
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(source) = self.monitor(current)?.mirror_of {
            if !seen.insert(source) {
                break;
            }
            current = source;
        }
        Ok(current)
    }

    /// Takes the monitor out of the layout and releases its controller.
    ///
    /// The controller is reset in `resources` and returned to the pool.  The
    /// monitor is skipped by every later placement, limit and cascade pass.
    ///
    /// If other monitors mirror this one, the first of them takes over its
    /// wings and the rest mirror that one instead, so they stay reachable.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] for unknown handles or catalog ids.
    pub fn disable(&mut self, id: MonitorId, resources: &mut ScreenResources) -> Result<(), MonitorError> {
        let monitor = self.monitor(id)?;
        let shared = monitor.controller.is_some_and(|c| {
            self.iter()
                .any(|(other, m)| other != id && !m.disabled && m.controller == Some(c))
        });
        if let Some(controller) = monitor.controller {
            if shared {
                // Another monitor still uses it as a mirror; only detach this output.
                resources.controller_mut(controller)?.remove_output(monitor.output);
            } else {
                resources.reset_controller(controller)?;
                resources.release_controller(controller);
            }
        }

        let m = self.monitor_mut(id)?;
        m.controller = None;
        m.disabled = true;
        m.placement = None;
        m.limits = None;
        if let Some(heir) = self.promote_mirror(id) {
            debug!(%id, %heir, "mirror takes over disabled monitor's place");
            self.invalidate_upstream(heir);
        }
        self.invalidate_upstream(id);
        debug!(%id, "monitor disabled");
        Ok(())
    }

    /// Computes and caches this monitor's limits.  A second call returns the
    /// cached value until something invalidates it.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NoMode`] if this monitor, or one in its row or
    /// column, has no mode.
    pub fn calculate_limits(
        &mut self,
        id: MonitorId,
        resources: &ScreenResources,
    ) -> Result<Limits, MonitorError> {
        if let Some(limits) = self.monitor(id)?.limits {
            return Ok(limits);
        }

        let own = self.own_extent(id, resources)?;
        let mut row = own;
        for wing in [Wing::Left, Wing::Right] {
            for n in self.chain(id, wing) {
                let e = self.own_extent(n, resources)?;
                row.width_px += e.width_px;
                row.width_mm += e.width_mm;
                row.height_px = row.height_px.max(e.height_px);
                row.height_mm = row.height_mm.max(e.height_mm);
            }
        }
        let mut column = own;
        for wing in [Wing::Top, Wing::Bottom] {
            for n in self.chain(id, wing) {
                let e = self.own_extent(n, resources)?;
                column.height_px += e.height_px;
                column.height_mm += e.height_mm;
                column.width_px = column.width_px.max(e.width_px);
                column.width_mm = column.width_mm.max(e.width_mm);
            }
        }

        let limits = Limits { own, row, column };
        self.monitor_mut(id)?.limits = Some(limits);
        Ok(limits)
    }

    /// Own width plus the total width of the right wing, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NoMode`] if any monitor in the chain has no mode.
    pub fn total_width(&self, id: MonitorId, resources: &ScreenResources) -> Result<u64, MonitorError> {
        let mut total = self.own_extent(id, resources)?.width_px;
        for n in self.chain(id, Wing::Right) {
            total += self.own_extent(n, resources)?.width_px;
        }
        Ok(total)
    }

    /// Own height plus the total height of the bottom wing, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NoMode`] if any monitor in the chain has no mode.
    pub fn total_height(&self, id: MonitorId, resources: &ScreenResources) -> Result<u64, MonitorError> {
        let mut total = self.own_extent(id, resources)?.height_px;
        for n in self.chain(id, Wing::Bottom) {
            total += self.own_extent(n, resources)?.height_px;
        }
        Ok(total)
    }

    /// Places every monitor reachable from `primary`, with `primary` at (0, 0).
    ///
    /// Monitors not reachable from `primary` lose their placement.  Returns
    /// the placed monitors in visiting order.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Disabled`] if `primary` is disabled,
    /// [`MonitorError::NoMode`] if a reachable monitor has no mode, or
    /// [`MonitorError::CoordinateOverflow`] for positions beyond `i32`.
    pub fn calculate_monitor_positions(
        &mut self,
        primary: MonitorId,
        resources: &ScreenResources,
    ) -> Result<Vec<MonitorId>, MonitorError> {
        if self.monitor(primary)?.disabled {
            return Err(MonitorError::Disabled(primary));
        }

        let mut placements = vec![None; self.monitors.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        let e = self.own_extent(primary, resources)?;
        placements[primary.0] = Some(Placement {
            pixels: Rect::new(0, 0, e.width_px, e.height_px),
            millimeters: Rect::new(0, 0, e.width_mm, e.height_mm),
        });
        queue.push_back(primary);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            let Some(anchor) = placements[current.0] else {
                continue;
            };

            for mirror in self.mirrors_of(current) {
                if placements[mirror.0].is_none() {
                    placements[mirror.0] = Some(anchor);
                    queue.push_back(mirror);
                }
            }

            for wing in Wing::ALL {
                let Some(next) = self.effective_wing(current, wing) else {
                    continue;
                };
                if placements[next.0].is_some() {
                    continue;
                }
                let e = self.own_extent(next, resources)?;
                placements[next.0] = Some(Placement {
                    pixels: self.place(anchor.pixels, e.width_px, e.height_px, wing),
                    millimeters: self.place(anchor.millimeters, e.width_mm, e.height_mm, wing),
                });
                queue.push_back(next);
            }
        }

        for (i, placement) in placements.into_iter().enumerate() {
            let id = MonitorId(i);
            let position = match &placement {
                Some(p) => Point::new(
                    i32::try_from(p.pixels.x).map_err(|_| MonitorError::CoordinateOverflow(id))?,
                    i32::try_from(p.pixels.y).map_err(|_| MonitorError::CoordinateOverflow(id))?,
                ),
                None => Point::ORIGIN,
            };
            let m = &mut self.monitors[i];
            if placement.is_none() && !m.disabled {
                warn!(%id, "monitor is not reachable from the primary; it will stay off");
            }
            m.placement = placement;
            m.position = position;
        }

        debug!(placed = order.len(), "monitor positions calculated");
        Ok(order)
    }

    /// Pushes the configuration of every monitor reachable from `start` into
    /// its controller, depth first, visiting each monitor once.
    ///
    /// Positions must have been calculated first.  Returns the touched
    /// controllers, without duplicates, in visiting order.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`set_config`](Self::set_config).
    pub fn apply_cascading_config(
        &self,
        start: MonitorId,
        resources: &mut ScreenResources,
    ) -> Result<Vec<ControllerId>, MonitorError> {
        self.monitor(start)?;
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut touched = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let controller = self.set_config(current, resources)?;
            if !touched.contains(&controller) {
                touched.push(controller);
            }
            stack.extend(self.mirrors_of(current));
            for wing in Wing::ALL.iter().rev() {
                if let Some(next) = self.effective_wing(current, *wing) {
                    stack.push(next);
                }
            }
        }
        Ok(touched)
    }

    /// Stages one monitor's mode, position and output binding on its
    /// controller in `resources`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Disabled`], [`MonitorError::NoController`] or
    /// [`MonitorError::NoMode`] for an incomplete monitor, and
    /// [`MonitorError::Catalog`] if the binding is not allowed.
    pub fn set_config(
        &self,
        id: MonitorId,
        resources: &mut ScreenResources,
    ) -> Result<ControllerId, MonitorError> {
        let m = self.monitor(id)?;
        if m.disabled {
            return Err(MonitorError::Disabled(id));
        }
        let controller = m.controller.ok_or(MonitorError::NoController(id))?;
        let mode = resources.mode(m.mode.ok_or(MonitorError::NoMode(id))?)?.clone();

        let c = resources.controller_mut(controller)?;
        c.set_output_mode(&mode);
        c.set_position(m.position);
        resources.bind_output(controller, m.output)?;
        debug!(%id, %controller, mode = %mode, x = m.position.x, y = m.position.y, "controller staged");
        Ok(controller)
    }

    /// Bounding box of all placed monitors, in pixels and millimetres.
    /// `None` before positions have been calculated.
    pub fn screen_bounds(&self) -> Option<Placement> {
        self.monitors
            .iter()
            .filter(|m| !m.disabled)
            .filter_map(|m| m.placement)
            .reduce(|a, b| Placement {
                pixels: a.pixels.union(&b.pixels),
                millimeters: a.millimeters.union(&b.millimeters),
            })
    }

    /// Size of the virtual screen in pixels; zero before placement.
    pub fn screen_dimensions_pixels(&self) -> Dimensions {
        self.screen_bounds()
            .map(|b| b.pixels.dimensions())
            .unwrap_or_default()
    }

    /// Size of the virtual screen in millimetres; zero before placement.
    pub fn screen_dimensions_millimeters(&self) -> Dimensions {
        self.screen_bounds()
            .map(|b| b.millimeters.dimensions())
            .unwrap_or_default()
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn own_extent(&self, id: MonitorId, resources: &ScreenResources) -> Result<Extent, MonitorError> {
        let m = self.monitor(id)?;
        let mode = resources.mode(m.mode.ok_or(MonitorError::NoMode(id))?)?;
        let output = resources.output(m.output)?;
        Ok(Extent {
            width_px: u64::from(mode.width_pixels()),
            height_px: u64::from(mode.height_pixels()),
            width_mm: output.width_millimeters(),
            height_mm: output.height_millimeters(),
        })
    }

    /// The neighbour on `wing`, skipping disabled monitors.
    fn effective_wing(&self, id: MonitorId, wing: Wing) -> Option<MonitorId> {
        let mut seen = HashSet::new();
        let mut next = self.monitors.get(id.0)?.wings[wing.slot()];
        while let Some(n) = next {
            if !seen.insert(n) {
                return None;
            }
            let m = self.monitors.get(n.0)?;
            if !m.disabled {
                return Some(n);
            }
            next = m.wings[wing.slot()];
        }
        None
    }

    /// All enabled monitors following `id` along `wing`, nearest first.
    fn chain(&self, id: MonitorId, wing: Wing) -> Vec<MonitorId> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut current = id;
        while let Some(next) = self.effective_wing(current, wing) {
            if !seen.insert(next) {
                break;
            }
            out.push(next);
            current = next;
        }
        out
    }

    fn mirrors_of(&self, source: MonitorId) -> Vec<MonitorId> {
        self.iter()
            .filter(|(_, m)| !m.disabled && m.mirror_of == Some(source))
            .map(|(id, _)| id)
            .collect()
    }

    /// Moves `source`'s first enabled mirror into `source`'s place: it stops
    /// mirroring, inherits the wings it lacks, and every wing or mirror link
    /// that pointed at `source` now points at it.
    fn promote_mirror(&mut self, source: MonitorId) -> Option<MonitorId> {
        let mirrors = self.mirrors_of(source);
        let (&heir, rest) = mirrors.split_first()?;
        let inherited = self.monitors.get(source.0)?.wings;

        for (i, m) in self.monitors.iter_mut().enumerate() {
            for slot in m.wings.iter_mut() {
                if *slot == Some(source) {
                    *slot = (i != heir.0).then_some(heir);
                }
            }
        }
        let h = self.monitors.get_mut(heir.0)?;
        for (slot, wing) in h.wings.iter_mut().zip(inherited) {
            if slot.is_none() && wing != Some(heir) {
                *slot = wing;
            }
        }
        h.mirror_of = None;
        for r in rest {
            if let Some(m) = self.monitors.get_mut(r.0) {
                m.mirror_of = Some(heir);
            }
        }
        Some(heir)
    }

    fn place(&self, anchor: Rect, width: u64, height: u64, wing: Wing) -> Rect {
        let (x, y) = match wing {
            Wing::Right => (anchor.right(), self.alignment.offset(anchor.y, anchor.height, height)),
            Wing::Left => (
                anchor.x - width as i64,
                self.alignment.offset(anchor.y, anchor.height, height),
            ),
            Wing::Bottom => (self.alignment.offset(anchor.x, anchor.width, width), anchor.bottom()),
            Wing::Top => (
                self.alignment.offset(anchor.x, anchor.width, width),
                anchor.y - height as i64,
            ),
        };
        Rect::new(x, y, width, height)
    }

    /// Drops cached limits of `id` and of every monitor that can reach it.
    fn invalidate_upstream(&mut self, id: MonitorId) {
        let mut dirty = HashSet::from([id]);
        loop {
            let before = dirty.len();
            for (i, m) in self.monitors.iter().enumerate() {
                let reaches = m.wings.iter().flatten().any(|n| dirty.contains(n))
                    || m.mirror_of.is_some_and(|s| dirty.contains(&s));
                if reaches {
                    dirty.insert(MonitorId(i));
                }
            }
            if dirty.len() == before {
                break;
            }
        }
        // Limits are symmetric along a row or column, so downstream runs go stale too.
        for start in dirty.clone() {
            for wing in Wing::ALL {
                dirty.extend(self.chain(start, wing));
            }
        }
        for d in dirty {
            if let Some(m) = self.monitors.get_mut(d.0) {
                m.limits = None;
            }
        }
    }
}
