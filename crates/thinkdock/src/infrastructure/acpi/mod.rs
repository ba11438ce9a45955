//! ACPI events from acpid.
//!
//! acpid relays kernel ACPI events to every client of its Unix socket, one
//! line per event:
//!
//! ```text
//! button/lid LID close
//! button/power PBTN 00000080 00000000
//! ibm/hotkey LEN0068:00 00000080 00004010
//! ```
//!
//! [`parse_event`] maps a line to an [`AcpiEvent`]; [`AcpidListener`] reads
//! the socket.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
#[cfg(unix)]
use tokio::net::UnixStream;

/// thinkpad_acpi hotkey codes for the dock connector.
const HKEY_DOCKED: &str = "00004010";
const HKEY_UNDOCKED: &str = "00004011";

/// Error type for the acpid connection.
#[derive(Debug, Error, PartialEq)]
pub enum AcpiError {
    #[error("cannot connect to acpid at {path}: {reason}")]
    Connect { path: PathBuf, reason: String },

    #[error("reading acpid events failed: {0}")]
    Read(String),
}

/// An event reported by acpid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcpiEvent {
    PowerButton,
    LidOpened,
    LidClosed,
    /// Fn+F4.
    SleepButton,
    /// Fn+F12.
    SuspendButton,
    Docked,
    Undocked,
    MicMute,
    Mute,
    ThinkVantage,
    ScreenLock,
    Battery,
    Wlan,
    /// Fn+F7.
    Projector,
    BrightnessUp,
    BrightnessDown,
    VolumeUp,
    VolumeDown,
    Unknown,
}

/// Classifies one acpid line.
pub fn parse_event(line: &str) -> AcpiEvent {
    let mut fields = line.split_whitespace();
    let class = fields.next().unwrap_or_default();
    let rest: Vec<&str> = fields.collect();
    match class {
        "button/power" => AcpiEvent::PowerButton,
        "button/lid" if rest.contains(&"close") => AcpiEvent::LidClosed,
        "button/lid" if rest.contains(&"open") => AcpiEvent::LidOpened,
        "button/sleep" => AcpiEvent::SleepButton,
        "button/suspend" => AcpiEvent::SuspendButton,
        "button/f20" => AcpiEvent::MicMute,
        "button/mute" => AcpiEvent::Mute,
        "button/prog1" => AcpiEvent::ThinkVantage,
        "button/screenlock" => AcpiEvent::ScreenLock,
        "button/battery" => AcpiEvent::Battery,
        "button/wlan" => AcpiEvent::Wlan,
        "button/volumeup" => AcpiEvent::VolumeUp,
        "button/volumedown" => AcpiEvent::VolumeDown,
        "video/switchmode" => AcpiEvent::Projector,
        "video/brightnessup" => AcpiEvent::BrightnessUp,
        "video/brightnessdown" => AcpiEvent::BrightnessDown,
        "ibm/hotkey" if rest.contains(&HKEY_DOCKED) => AcpiEvent::Docked,
        "ibm/hotkey" if rest.contains(&HKEY_UNDOCKED) => AcpiEvent::Undocked,
        _ => AcpiEvent::Unknown,
    }
}

/// A connection to acpid's event socket.
#[cfg(unix)]
pub struct AcpidListener {
    lines: Lines<BufReader<UnixStream>>,
}

#[cfg(unix)]
impl AcpidListener {
    /// # Errors
    ///
    /// Returns [`AcpiError::Connect`] if acpid is not listening at `path`.
    pub async fn connect(path: &Path) -> Result<Self, AcpiError> {
        let stream = UnixStream::connect(path).await.map_err(|e| AcpiError::Connect {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("listening for ACPI events on {}", path.display());
        Ok(Self {
            lines: BufReader::new(stream).lines(),
        })
    }

    /// Waits for the next event.  `Ok(None)` once acpid closes the socket.
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` loop.
    ///
    /// # Errors
    ///
    /// Returns [`AcpiError::Read`] if the socket fails.
    pub async fn next_event(&mut self) -> Result<Option<AcpiEvent>, AcpiError> {
        let Some(line) = self
            .lines
            .next_line()
            .await
            .map_err(|e| AcpiError::Read(e.to_string()))?
        else {
            return Ok(None);
        };
        let event = parse_event(&line);
        debug!(line = line.trim_end(), ?event, "acpid event");
        Ok(Some(event))
    }
}
