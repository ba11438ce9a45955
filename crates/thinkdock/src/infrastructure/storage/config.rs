//! TOML-based configuration for the dock daemon.
//!
//! Reads `DaemonConfig` from `$XDG_CONFIG_HOME/thinkdock/config.toml`
//! (falling back to `~/.config/thinkdock/config.toml`).  Example:
//!
//! ```toml
//! [daemon]
//! log_level = "info"
//! poll_interval_ms = 1000
//!
//! [dock]
//! docked_path = "/sys/devices/platform/dock.2/docked"
//! modalias_path = "/sys/devices/platform/dock.2/modalias"
//! expected_modalias = "acpi:IBM0079:PNP0C15:LNXDOCK:\n"
//!
//! [layout]
//! internal_output_prefixes = ["LVDS", "eDP"]
//! placement = "right"
//! alignment = "start"
//!
//! [acpi]
//! socket_path = "/var/run/acpid.socket"
//!
//! [backlight]
//! class_path = "/sys/class/backlight"
//! # device = "intel_backlight"
//! thinklight_path = "/sys/class/leds/tpacpi::thinklight/brightness"
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when absent, so a missing file or an old file missing newer
//! keys still yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use thinkdock_core::Alignment;

use crate::application::dock_layout::{LayoutPolicy, PanelPlacement};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub dock: DockConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub acpi: AcpiConfig,
    #[serde(default)]
    pub backlight: BacklightConfig,
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonSection {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How often the dock state is polled, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Where the dock driver exposes its state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DockConfig {
    /// Contains `1` while docked.
    #[serde(default = "default_docked_path")]
    pub docked_path: PathBuf,
    /// Identifies the dock device; compared against `expected_modalias`.
    #[serde(default = "default_modalias_path")]
    pub modalias_path: PathBuf,
    #[serde(default = "default_expected_modalias")]
    pub expected_modalias: String,
}

/// Layout policy applied on dock and undock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// Output name prefixes that identify the built-in panel.
    #[serde(default = "default_internal_prefixes")]
    pub internal_output_prefixes: Vec<String>,
    /// Where the panel goes relative to the primary external monitor.
    #[serde(default)]
    pub placement: PanelPlacement,
    /// Cross-axis alignment of neighbours of different sizes.
    #[serde(default)]
    pub alignment: Alignment,
}

/// Where acpid publishes lid, button and hotkey events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcpiConfig {
    #[serde(default = "default_acpid_socket")]
    pub socket_path: PathBuf,
}

/// Panel backlight and ThinkLight attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacklightConfig {
    #[serde(default = "default_backlight_class")]
    pub class_path: PathBuf,
    /// Device under `class_path`; detected when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default = "default_thinklight_path")]
    pub thinklight_path: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_docked_path() -> PathBuf {
    PathBuf::from("/sys/devices/platform/dock.2/docked")
}
fn default_modalias_path() -> PathBuf {
    PathBuf::from("/sys/devices/platform/dock.2/modalias")
}
fn default_expected_modalias() -> String {
    "acpi:IBM0079:PNP0C15:LNXDOCK:\n".to_string()
}
fn default_internal_prefixes() -> Vec<String> {
    vec!["LVDS".to_string(), "eDP".to_string()]
}
fn default_acpid_socket() -> PathBuf {
    PathBuf::from("/var/run/acpid.socket")
}
fn default_backlight_class() -> PathBuf {
    PathBuf::from("/sys/class/backlight")
}
fn default_thinklight_path() -> PathBuf {
    PathBuf::from("/sys/class/leds/tpacpi::thinklight/brightness")
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            docked_path: default_docked_path(),
            modalias_path: default_modalias_path(),
            expected_modalias: default_expected_modalias(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            internal_output_prefixes: default_internal_prefixes(),
            placement: PanelPlacement::default(),
            alignment: Alignment::default(),
        }
    }
}

impl Default for AcpiConfig {
    fn default() -> Self {
        Self {
            socket_path: default_acpid_socket(),
        }
    }
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            class_path: default_backlight_class(),
            device: None,
            thinklight_path: default_thinklight_path(),
        }
    }
}

impl From<&LayoutConfig> for LayoutPolicy {
    fn from(cfg: &LayoutConfig) -> Self {
        LayoutPolicy {
            internal_output_prefixes: cfg.internal_output_prefixes.clone(),
            placement: cfg.placement,
            alignment: cfg.alignment,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join("config.toml"))
}

/// Loads the config from its default location.  See [`load_config_from`].
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`], or any error from [`load_config_from`].
pub fn load_config() -> Result<DaemonConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `DaemonConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<DaemonConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &DaemonConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `$XDG_CONFIG_HOME/thinkdock`, or `~/.config/thinkdock`.
fn config_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("thinkdock"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("thinkdock_test_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_daemon_config_default_matches_x220_dock() {
        // Arrange / Act
        let cfg = DaemonConfig::default();

        // Assert
        assert_eq!(cfg.daemon.poll_interval_ms, 1000);
        assert_eq!(
            cfg.dock.docked_path,
            PathBuf::from("/sys/devices/platform/dock.2/docked")
        );
        assert_eq!(cfg.dock.expected_modalias, "acpi:IBM0079:PNP0C15:LNXDOCK:\n");
        assert_eq!(cfg.layout.placement, PanelPlacement::Right);
        assert_eq!(cfg.layout.alignment, Alignment::Start);
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: DaemonConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, DaemonConfig::default());
    }

    #[test]
    fn test_deserialize_partial_layout_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[layout]
placement = "external-only"
alignment = "center"
"#;

        // Act
        let cfg: DaemonConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.layout.placement, PanelPlacement::ExternalOnly);
        assert_eq!(cfg.layout.alignment, Alignment::Center);
        assert_eq!(cfg.layout.internal_output_prefixes, vec!["LVDS", "eDP"]);
        assert_eq!(cfg.daemon.log_level, "info");
    }

    #[test]
    fn test_deserialize_backlight_device_and_acpi_socket() {
        // Arrange
        let toml_str = r#"
[acpi]
socket_path = "/run/acpid.socket"

[backlight]
device = "acpi_video0"
"#;

        // Act
        let cfg: DaemonConfig = toml::from_str(toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg.acpi.socket_path, PathBuf::from("/run/acpid.socket"));
        assert_eq!(cfg.backlight.device.as_deref(), Some("acpi_video0"));
        assert_eq!(cfg.backlight.class_path, PathBuf::from("/sys/class/backlight"));
        assert_eq!(
            cfg.backlight.thinklight_path,
            PathBuf::from("/sys/class/leds/tpacpi::thinklight/brightness")
        );
    }

    #[test]
    fn test_deserialize_unknown_placement_returns_parse_error() {
        let result: Result<DaemonConfig, toml::de::Error> =
            toml::from_str("[layout]\nplacement = \"diagonal\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_layout_policy_from_config_copies_every_field() {
        let mut cfg = LayoutConfig::default();
        cfg.placement = PanelPlacement::Mirror;
        cfg.internal_output_prefixes = vec!["eDP".to_string()];

        let policy = LayoutPolicy::from(&cfg);

        assert_eq!(policy.placement, PanelPlacement::Mirror);
        assert_eq!(policy.internal_output_prefixes, vec!["eDP"]);
        assert_eq!(policy.alignment, Alignment::Start);
    }

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, DaemonConfig::default());
    }

    #[test]
    fn test_load_config_from_malformed_file_returns_parse_error() {
        // Arrange
        let dir = scratch_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = scratch_dir("roundtrip");
        let path = dir.join("nested").join("config.toml");
        let mut cfg = DaemonConfig::default();
        cfg.daemon.poll_interval_ms = 250;
        cfg.layout.placement = PanelPlacement::Above;

        // Act
        save_config_to(&cfg, &path).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("thinkdock/config.toml"),
                "unexpected config path {path:?}"
            );
        }
        // NoConfigDir in a stripped environment is also acceptable.
    }
}
