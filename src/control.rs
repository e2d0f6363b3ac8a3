//! Service control through the operating system's service manager.
//!
//! Used directly for start, stop, and status, and as the best-effort stop
//! ahead of a registry-level uninstall. Requests are confirmed with a single
//! fixed wait and one follow-up query; nothing is polled or retried.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::descriptor::StartType;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        pub(crate) mod scm;
        use scm as platform;
    } else {
        mod unsupported;
        use unsupported as platform;
    }
}

/// How long the manager gets to reach the requested state before the single
/// follow-up query.
pub const CONFIRM_WAIT: Duration = Duration::from_secs(1);

/// Service state as reported by the control manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
    Unknown(u32),
}

impl ServiceState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ServiceState::Stopped,
            2 => ServiceState::StartPending,
            3 => ServiceState::StopPending,
            4 => ServiceState::Running,
            5 => ServiceState::ContinuePending,
            6 => ServiceState::PausePending,
            7 => ServiceState::Paused,
            other => ServiceState::Unknown(other),
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Stopped => f.write_str("stopped"),
            ServiceState::StartPending => f.write_str("start pending"),
            ServiceState::StopPending => f.write_str("stop pending"),
            ServiceState::Running => f.write_str("running"),
            ServiceState::ContinuePending => f.write_str("continue pending"),
            ServiceState::PausePending => f.write_str("pause pending"),
            ServiceState::Paused => f.write_str("paused"),
            ServiceState::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Result of a start or stop request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The service reached the requested state within the wait.
    Confirmed,
    /// The service was already in the requested state; nothing was issued.
    AlreadyInState,
    /// The request went out, but the follow-up query saw another state.
    /// Non-fatal; the caller decides whether to check again later.
    Unconfirmed(ServiceState),
}

/// What `status` reports about one service.
#[derive(Clone, Debug)]
pub struct StatusReport {
    pub state: ServiceState,
    /// Configured start type, when the manager let us read it.
    pub start_type: Option<StartType>,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("service '{0}' is not known to the service control manager")]
    NotFound(String),
    #[error("service '{0}' already exists")]
    AlreadyExists(String),
    #[error("could not connect to the service control manager: {0}")]
    Manager(String),
    #[error("could not open service '{name}': {detail}")]
    Open { name: String, detail: String },
    #[error("could not query service '{name}': {detail}")]
    Query { name: String, detail: String },
    #[error("could not start service '{name}': {detail}")]
    Start { name: String, detail: String },
    #[error("could not stop service '{name}': {detail}")]
    Stop { name: String, detail: String },
    #[error("could not create service '{name}': {detail}")]
    Create { name: String, detail: String },
    #[error("could not delete service '{name}': {detail}")]
    Delete { name: String, detail: String },
    #[error("service control is not available on this platform")]
    Unsupported,
}

/// Starts the service; an already running service is success without a wait.
pub fn start(name: &str) -> Result<ControlOutcome, ControlError> {
    platform::start(name)
}

/// Stops the service; an already stopped service is success without a wait.
pub fn stop(name: &str) -> Result<ControlOutcome, ControlError> {
    platform::stop(name)
}

/// Reports the current state and, when obtainable, the configured start type.
pub fn status(name: &str) -> Result<StatusReport, ControlError> {
    platform::status(name)
}

/// Best-effort stop ahead of an uninstall. A directly installed entry may
/// not be known to the control manager at all, so every outcome is ignored.
pub fn stop_before_uninstall(name: &str) {
    match stop(name) {
        Ok(outcome) => log::debug!("pre-uninstall stop of '{name}': {outcome:?}"),
        Err(err) => log::debug!("pre-uninstall stop of '{name}' skipped: {err}"),
    }
}
