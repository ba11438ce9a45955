//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration from the XDG config
//! directory and falls back to defaults when the file does not exist yet.

pub mod config;
