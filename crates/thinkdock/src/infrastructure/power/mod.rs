//! Suspend backends.
//!
//! [`LogindSuspend`] calls `Suspend` on the systemd-logind manager over the
//! system D-Bus.  With `interactive` set, logind runs the same polkit checks
//! it runs for the desktop's own suspend action.

use thiserror::Error;
use tracing::{debug, info};
use zbus::{blocking::Connection, proxy};

/// Error type for suspend requests.
#[derive(Debug, Error, PartialEq)]
pub enum SuspendError {
    #[error("system bus unavailable: {0}")]
    Bus(String),

    #[error("logind refused to suspend ({name}): {message}")]
    Rejected { name: String, message: String },
}

impl From<zbus::Error> for SuspendError {
    fn from(e: zbus::Error) -> Self {
        match e {
            zbus::Error::MethodError(name, message, _) => SuspendError::Rejected {
                name: name.to_string(),
                message: message.unwrap_or_default(),
            },
            other => SuspendError::Bus(other.to_string()),
        }
    }
}

/// Something that can put the machine to sleep.
#[cfg_attr(test, mockall::automock)]
pub trait SuspendBackend {
    /// Requests a suspend.  Returns once the request was accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SuspendError`] if the request could not be issued.
    fn suspend(&self) -> Result<(), SuspendError>;
}

/// systemd-logind Manager interface
#[proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    #[zbus(name = "Suspend")]
    fn suspend(&self, interactive: bool) -> zbus::Result<()>;

    /// `"yes"`, `"no"`, `"challenge"` or `"na"`.
    #[zbus(name = "CanSuspend")]
    fn can_suspend(&self) -> zbus::Result<String>;
}

/// [`SuspendBackend`] that asks systemd-logind over D-Bus.
#[derive(Debug, Clone)]
pub struct LogindSuspend {
    interactive: bool,
}

impl LogindSuspend {
    pub fn new() -> Self {
        Self { interactive: true }
    }

    /// With `interactive` false, logind fails instead of asking for
    /// authorisation.
    pub fn with_interactive(interactive: bool) -> Self {
        Self { interactive }
    }

    fn manager(&self) -> Result<LoginManagerProxyBlocking<'static>, SuspendError> {
        let connection = Connection::system().map_err(|e| SuspendError::Bus(e.to_string()))?;
        Ok(LoginManagerProxyBlocking::new(&connection)?)
    }

    /// Asks logind whether a suspend would be allowed, without suspending.
    ///
    /// # Errors
    ///
    /// Returns [`SuspendError`] if logind cannot be reached.
    pub fn can_suspend(&self) -> Result<String, SuspendError> {
        let answer = self.manager()?.can_suspend()?;
        debug!(%answer, "logind CanSuspend");
        Ok(answer)
    }
}

impl Default for LogindSuspend {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendBackend for LogindSuspend {
    fn suspend(&self) -> Result<(), SuspendError> {
        info!(interactive = self.interactive, "requesting suspend from logind");
        self.manager()?.suspend(self.interactive)?;
        Ok(())
    }
}
