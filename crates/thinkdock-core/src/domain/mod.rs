//! Domain model of the display topology engine.
//!
//! Nothing in here talks to a display server.  The leaves (`mode`, `output`,
//! `controller`) are plain records with capability checks; `resources` owns
//! them for one session; `monitor` lays monitors out over a wing graph; and
//! `configuration` turns that layout into one provider request.
//!
//! Relations between objects are ids into the catalog or the monitor arena,
//! never references, so a catalog can be replaced without leaving anything
//! dangling.

pub mod configuration;
pub mod controller;
pub mod geometry;
pub mod mode;
pub mod monitor;
pub mod output;
pub mod resources;
