//! # thinkdock-core
//!
//! Display topology engine for laptops that move between a docking station
//! and the road.
//!
//! The engine models the GPU's video display controllers, the physical
//! outputs they can drive and the modes those outputs report.  A
//! [`ConfigurationManager`] arranges [`Monitor`]s in a four-neighbour graph,
//! computes where each one sits in the virtual desktop, and commits the
//! result to the display server as a single request.
//!
//! - **`domain`** – The model and the layout algorithms.  Pure, synchronous,
//!   and free of OS calls.
//! - **`provider`** – The port to the display server: one snapshot query in,
//!   one commit request out.  Includes [`MockDisplayProvider`] for tests.
//!
//! A typical session:
//!
//! ```
//! use thinkdock_core::provider::mock::{fixture, MockDisplayProvider};
//! use thinkdock_core::{ConfigurationManager, ScreenResources};
//!
//! let mut provider = MockDisplayProvider::new(fixture::docked());
//! let mut resources = ScreenResources::query(&provider)?;
//!
//! let mut manager = ConfigurationManager::new();
//! let external = manager.add_monitor(&resources, fixture::DP2)?;
//! let controller = resources.request_controller_for(fixture::DP2)?.unwrap();
//! manager.graph_mut().set_controller(external, controller, &resources)?;
//! manager.graph_mut().set_output_mode(external, fixture::MODE_1920X1080, &resources)?;
//! manager.set_monitor_primary(external)?;
//!
//! let report = manager.commit(&mut resources, &mut provider)?;
//! assert_eq!(report.screen.pixels.width, 1920);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod domain;
pub mod provider;

// Re-export the most-used types at the crate root so callers can write
// `thinkdock_core::MonitorGraph` instead of the full module path.
pub use domain::configuration::{CommitReport, ConfigurationError, ConfigurationManager};
pub use domain::controller::{BindingError, ControllerId, VideoController};
pub use domain::geometry::{Alignment, Dimensions, Point, Rect};
pub use domain::mode::{ModeError, ModeId, ScanFlags, VideoOutputMode};
pub use domain::monitor::{Limits, Monitor, MonitorError, MonitorGraph, MonitorId, Placement, Wing};
pub use domain::output::{ConnectionState, OutputId, VideoOutput};
pub use domain::resources::{CatalogError, ScreenResources};
pub use provider::mock::MockDisplayProvider;
pub use provider::{CommitRequest, ControllerState, DisplayProvider, ProviderError, ScreenSize};
