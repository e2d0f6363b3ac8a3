//! Stub for hosts without a service control manager.

use super::{ControlError, ControlOutcome, StatusReport};

pub(super) fn start(_name: &str) -> Result<ControlOutcome, ControlError> {
    Err(ControlError::Unsupported)
}

pub(super) fn stop(_name: &str) -> Result<ControlOutcome, ControlError> {
    Err(ControlError::Unsupported)
}

pub(super) fn status(_name: &str) -> Result<StatusReport, ControlError> {
    Err(ControlError::Unsupported)
}
