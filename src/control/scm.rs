//! Service Control Manager wrapper.

use std::thread;

use windows::Win32::Foundation::ERROR_SERVICE_DOES_NOT_EXIST;
use windows::Win32::System::Services::{
    CloseServiceHandle, ControlService, OpenSCManagerW, OpenServiceW, QUERY_SERVICE_CONFIGW,
    QueryServiceConfigW, QueryServiceStatus, SC_HANDLE, SC_MANAGER_CONNECT, SERVICE_CONTROL_STOP,
    SERVICE_QUERY_CONFIG, SERVICE_QUERY_STATUS, SERVICE_START, SERVICE_STATUS, SERVICE_STOP,
    StartServiceW,
};
use windows::core::PCWSTR;

use super::{CONFIRM_WAIT, ControlError, ControlOutcome, ServiceState, StatusReport};
use crate::descriptor::StartType;

/// RAII wrapper for an `SC_HANDLE`; manager and service handles close the
/// same way.
pub(crate) struct ScHandle(pub(crate) SC_HANDLE);

impl ScHandle {
    pub(crate) fn handle(&self) -> SC_HANDLE {
        self.0
    }
}

impl Drop for ScHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = CloseServiceHandle(self.0);
            }
        }
    }
}

pub(crate) fn connect(access: u32) -> Result<ScHandle, ControlError> {
    let manager = unsafe { OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), access) }
        .map_err(|err| ControlError::Manager(err.message()))?;
    Ok(ScHandle(manager))
}

pub(crate) fn open_service(
    manager: &ScHandle,
    name: &str,
    access: u32,
) -> Result<ScHandle, ControlError> {
    let wide: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();
    match unsafe { OpenServiceW(manager.handle(), PCWSTR(wide.as_ptr()), access) } {
        Ok(service) => Ok(ScHandle(service)),
        Err(err) if err.code() == ERROR_SERVICE_DOES_NOT_EXIST.to_hresult() => {
            Err(ControlError::NotFound(name.to_string()))
        }
        Err(err) => Err(ControlError::Open { name: name.to_string(), detail: err.message() }),
    }
}

pub(crate) fn current_state(service: &ScHandle, name: &str) -> Result<ServiceState, ControlError> {
    let mut status = SERVICE_STATUS::default();
    unsafe { QueryServiceStatus(service.handle(), &mut status) }
        .map_err(|err| ControlError::Query { name: name.to_string(), detail: err.message() })?;
    Ok(ServiceState::from_raw(status.dwCurrentState.0))
}

pub(super) fn start(name: &str) -> Result<ControlOutcome, ControlError> {
    let manager = connect(SC_MANAGER_CONNECT)?;
    let service = open_service(&manager, name, SERVICE_START | SERVICE_QUERY_STATUS)?;

    if current_state(&service, name)? == ServiceState::Running {
        return Ok(ControlOutcome::AlreadyInState);
    }

    unsafe { StartServiceW(service.handle(), None) }
        .map_err(|err| ControlError::Start { name: name.to_string(), detail: err.message() })?;

    // One fixed wait, one follow-up query; a pending state is reported as
    // unconfirmed rather than polled.
    thread::sleep(CONFIRM_WAIT);
    match current_state(&service, name)? {
        ServiceState::Running => Ok(ControlOutcome::Confirmed),
        other => Ok(ControlOutcome::Unconfirmed(other)),
    }
}

pub(super) fn stop(name: &str) -> Result<ControlOutcome, ControlError> {
    let manager = connect(SC_MANAGER_CONNECT)?;
    let service = open_service(&manager, name, SERVICE_STOP | SERVICE_QUERY_STATUS)?;

    if current_state(&service, name)? == ServiceState::Stopped {
        return Ok(ControlOutcome::AlreadyInState);
    }

    let mut status = SERVICE_STATUS::default();
    unsafe { ControlService(service.handle(), SERVICE_CONTROL_STOP, &mut status) }
        .map_err(|err| ControlError::Stop { name: name.to_string(), detail: err.message() })?;

    thread::sleep(CONFIRM_WAIT);
    match current_state(&service, name)? {
        ServiceState::Stopped => Ok(ControlOutcome::Confirmed),
        other => Ok(ControlOutcome::Unconfirmed(other)),
    }
}

pub(super) fn status(name: &str) -> Result<StatusReport, ControlError> {
    let manager = connect(SC_MANAGER_CONNECT)?;
    let service = open_service(&manager, name, SERVICE_QUERY_STATUS | SERVICE_QUERY_CONFIG)?;

    let state = current_state(&service, name)?;
    Ok(StatusReport { state, start_type: query_start_type(&service) })
}

/// Best effort: the report stays useful without the configured start type.
fn query_start_type(service: &ScHandle) -> Option<StartType> {
    let mut needed = 0u32;
    let _ = unsafe { QueryServiceConfigW(service.handle(), None, 0, &mut needed) };
    if needed == 0 {
        return None;
    }

    let mut buffer = vec![0u8; needed as usize];
    let config = buffer.as_mut_ptr() as *mut QUERY_SERVICE_CONFIGW;
    unsafe {
        QueryServiceConfigW(service.handle(), Some(config), needed, &mut needed).ok()?;
        StartType::from_registry_code((*config).dwStartType.0)
    }
}
