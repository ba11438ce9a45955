//! thinkdockd entry point.
//!
//! Loads the configuration, initialises logging and runs one of:
//!
//! ```text
//! thinkdockd                  -- watch dock and acpid, re-apply layout on change
//! thinkdockd apply            -- apply the layout for the current state once
//! thinkdockd status           -- print the XRandR snapshot as JSON
//! thinkdockd suspend <lid|button>
//! thinkdockd backlight [--set <percent>]
//! thinkdockd thinklight
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use thinkdock::application::power::{request_suspend, SuspendOutcome, SuspendReason};
use thinkdock::infrastructure::backlight::{SysfsBacklight, ThinkLight};
use thinkdock::infrastructure::dock::SysfsDock;
use thinkdock::infrastructure::power::LogindSuspend;
use thinkdock::infrastructure::storage::config::{self, DaemonConfig};

/// ThinkPad dock daemon.
#[derive(Debug, Parser)]
#[command(
    name = "thinkdockd",
    about = "Arranges monitors on dock and undock, and gates lid suspend",
    version
)]
struct Cli {
    /// Config file; defaults to `$XDG_CONFIG_HOME/thinkdock/config.toml`.
    #[arg(long, env = "THINKDOCK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply the layout for the current dock state once and exit.
    Apply,
    /// Print the display server's controllers, outputs and modes as JSON.
    Status,
    /// Run the suspend policy for a lid or power-button event.
    Suspend {
        #[arg(value_enum)]
        reason: ReasonArg,
    },
    /// Print the panel backlight level, or set it.
    Backlight {
        /// New level in percent of the maximum brightness.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        set: Option<u8>,
    },
    /// Print whether the ThinkLight is on.
    Thinklight,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReasonArg {
    Lid,
    Button,
}

impl From<ReasonArg> for SuspendReason {
    fn from(r: ReasonArg) -> Self {
        match r {
            ReasonArg::Lid => SuspendReason::Lid,
            ReasonArg::Button => SuspendReason::Button,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    // `RUST_LOG` wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.daemon.log_level)),
        )
        .init();

    match cli.command {
        Some(Command::Suspend { reason }) => suspend(&cfg, reason.into()),
        Some(Command::Backlight { set }) => backlight(&cfg, set),
        Some(Command::Thinklight) => thinklight(&cfg),
        Some(Command::Apply) => display::apply_once(&cfg),
        Some(Command::Status) => display::status(),
        None => display::watch(&cfg).await,
    }
}

fn suspend(cfg: &DaemonConfig, reason: SuspendReason) -> anyhow::Result<()> {
    let dock = SysfsDock::from_config(&cfg.dock);
    let backend = LogindSuspend::default();
    match request_suspend(reason, &dock, &backend)? {
        SuspendOutcome::Suspended => info!(?reason, "suspend requested"),
        SuspendOutcome::IgnoredDocked => info!(?reason, "docked; not suspending"),
    }
    Ok(())
}

fn backlight(cfg: &DaemonConfig, set: Option<u8>) -> anyhow::Result<()> {
    let backlight = SysfsBacklight::from_config(&cfg.backlight)?;
    if let Some(percent) = set {
        let value = backlight.set_level(f32::from(percent) / 100.0)?;
        info!(percent, value, "backlight level set");
    }
    let level = backlight.level()?;
    println!("{}: {:.0}%", backlight.dir().display(), level * 100.0);
    Ok(())
}

fn thinklight(cfg: &DaemonConfig) -> anyhow::Result<()> {
    let light = ThinkLight::from_config(&cfg.backlight);
    if !light.is_present() {
        anyhow::bail!("no ThinkLight at {}", cfg.backlight.thinklight_path.display());
    }
    println!("{}", if light.is_on()? { "on" } else { "off" });
    Ok(())
}

#[cfg(target_os = "linux")]
mod display {
    use std::time::Duration;

    use thinkdock::application::acpi_events::{action_for, EventAction};
    use thinkdock::application::dock_layout::{apply_dock_layout, LayoutPolicy};
    use thinkdock::application::dock_watch::DockWatcher;
    use thinkdock::application::power::{request_suspend, SuspendOutcome};
    use thinkdock::infrastructure::acpi::{AcpiError, AcpiEvent, AcpidListener};
    use thinkdock::infrastructure::dock::{DockSensor, SysfsDock};
    use thinkdock::infrastructure::power::LogindSuspend;
    use thinkdock::infrastructure::storage::config::DaemonConfig;
    use thinkdock::infrastructure::x11::XrandrSession;
    use thinkdock_core::{CommitReport, DisplayProvider};
    use tracing::{error, info, warn};

    pub fn apply_once(cfg: &DaemonConfig) -> anyhow::Result<()> {
        let dock = SysfsDock::from_config(&cfg.dock);
        let mut session = XrandrSession::open()?;
        let report = apply_dock_layout(
            &mut session,
            &LayoutPolicy::from(&cfg.layout),
            dock.is_docked(),
        )?;
        info!(
            enabled = report.enabled.len(),
            disabled = report.disabled.len(),
            "layout applied"
        );
        Ok(())
    }

    pub fn status() -> anyhow::Result<()> {
        let session = XrandrSession::open()?;
        let snapshot = session.snapshot()?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        Ok(())
    }

    pub async fn watch(cfg: &DaemonConfig) -> anyhow::Result<()> {
        let dock = SysfsDock::from_config(&cfg.dock);
        if !dock.is_present() {
            warn!(
                "dock device at {} not recognised; docked state may be wrong",
                cfg.dock.modalias_path.display()
            );
        }
        let policy = LayoutPolicy::from(&cfg.layout);
        let mut session = XrandrSession::open()?;
        let mut watcher = DockWatcher::new();
        let backend = LogindSuspend::default();
        let mut acpi = match AcpidListener::connect(&cfg.acpi.socket_path).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                warn!("{e}; lid and power button events are not handled");
                None
            }
        };

        let mut interval =
            tokio::time::interval(Duration::from_millis(cfg.daemon.poll_interval_ms.max(1)));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(
            poll_interval_ms = cfg.daemon.poll_interval_ms,
            acpi = acpi.is_some(),
            "thinkdockd watching dock state.  Press Ctrl-C to exit."
        );
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("cannot listen for Ctrl-C: {e}");
                    }
                    info!("shutdown signal received");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(Ok(report)) = watcher.tick(&dock, &mut session, &policy) {
                        log_report(&report);
                    }
                }
                event = next_acpi_event(&mut acpi) => match event {
                    Ok(Some(event)) => match action_for(event) {
                        EventAction::Suspend(reason) => match request_suspend(reason, &dock, &backend) {
                            Ok(SuspendOutcome::Suspended) => info!(?reason, "suspend requested"),
                            Ok(SuspendOutcome::IgnoredDocked) => info!(?reason, "docked; not suspending"),
                            Err(e) => error!(?reason, "suspend failed: {e}"),
                        },
                        EventAction::CheckDock => {
                            if let Some(Ok(report)) = watcher.tick(&dock, &mut session, &policy) {
                                log_report(&report);
                            }
                        }
                        EventAction::Ignore => {}
                    },
                    Ok(None) => {
                        warn!("acpid closed the event socket");
                        acpi = None;
                    }
                    Err(e) => {
                        error!("{e}");
                        acpi = None;
                    }
                },
            }
        }

        info!("thinkdockd stopped");
        Ok(())
    }

    /// Never resolves once the listener is gone.
    async fn next_acpi_event(
        listener: &mut Option<AcpidListener>,
    ) -> Result<Option<AcpiEvent>, AcpiError> {
        match listener {
            Some(l) => l.next_event().await,
            None => std::future::pending().await,
        }
    }

    fn log_report(report: &CommitReport) {
        info!(
            enabled = report.enabled.len(),
            width = report.screen.pixels.width,
            height = report.screen.pixels.height,
            "layout applied"
        );
    }
}

#[cfg(not(target_os = "linux"))]
mod display {
    use thinkdock::infrastructure::storage::config::DaemonConfig;

    const UNSUPPORTED: &str = "XRandR display control is only available on Linux";

    pub fn apply_once(_cfg: &DaemonConfig) -> anyhow::Result<()> {
        anyhow::bail!(UNSUPPORTED)
    }

    pub fn status() -> anyhow::Result<()> {
        anyhow::bail!(UNSUPPORTED)
    }

    pub async fn watch(_cfg: &DaemonConfig) -> anyhow::Result<()> {
        anyhow::bail!(UNSUPPORTED)
    }
}
