//! Install strategy that goes through the documented service manager API.

use std::ffi::c_void;
use std::thread;

use log::{debug, warn};
use windows::Win32::Foundation::ERROR_SERVICE_EXISTS;
use windows::Win32::System::Services::{
    ChangeServiceConfig2W, ControlService, CreateServiceW, DeleteService, SC_MANAGER_CONNECT,
    SC_MANAGER_CREATE_SERVICE, SERVICE_ALL_ACCESS, SERVICE_CONFIG_DESCRIPTION,
    SERVICE_CONTROL_STOP, SERVICE_DESCRIPTIONW, SERVICE_ERROR_NORMAL, SERVICE_QUERY_STATUS,
    SERVICE_START_TYPE, SERVICE_STATUS, SERVICE_STOP, SERVICE_WIN32_OWN_PROCESS,
};
use windows::core::{PCWSTR, PWSTR};

use crate::control::scm::{ScHandle, connect, current_state, open_service};
use crate::control::{CONFIRM_WAIT, ControlError, ServiceState};
use crate::descriptor::{ServiceDescriptor, StartType};
use crate::registry::DELETE;

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(Some(0)).collect()
}

fn scm_start_type(start_type: StartType) -> SERVICE_START_TYPE {
    // The SCM start codes are the registry `Start` codes.
    SERVICE_START_TYPE(start_type.registry_code())
}

pub(super) fn install(descriptor: &ServiceDescriptor) -> Result<(), ControlError> {
    let manager = connect(SC_MANAGER_CREATE_SERVICE)?;

    let name = wide(descriptor.name());
    let display_name = wide(descriptor.display_name());
    let image_path = wide(descriptor.executable_path());

    let service = match unsafe {
        CreateServiceW(
            manager.handle(),
            PCWSTR(name.as_ptr()),
            PCWSTR(display_name.as_ptr()),
            SERVICE_ALL_ACCESS,
            SERVICE_WIN32_OWN_PROCESS,
            scm_start_type(descriptor.start_type()),
            SERVICE_ERROR_NORMAL,
            PCWSTR(image_path.as_ptr()),
            PCWSTR::null(), // no load ordering group
            None,           // no tag
            PCWSTR::null(), // no dependencies
            PCWSTR::null(), // LocalSystem
            PCWSTR::null(), // no password
        )
    } {
        Ok(service) => ScHandle(service),
        Err(err) if err.code() == ERROR_SERVICE_EXISTS.to_hresult() => {
            return Err(ControlError::AlreadyExists(descriptor.name().to_string()));
        }
        Err(err) => {
            return Err(ControlError::Create {
                name: descriptor.name().to_string(),
                detail: err.message(),
            });
        }
    };

    if let Some(description) = descriptor.description() {
        let mut text = wide(description);
        let info = SERVICE_DESCRIPTIONW { lpDescription: PWSTR(text.as_mut_ptr()) };
        let set = unsafe {
            ChangeServiceConfig2W(
                service.handle(),
                SERVICE_CONFIG_DESCRIPTION,
                Some(&info as *const _ as *const c_void),
            )
        };
        if let Err(err) = set {
            warn!("could not set the description of '{}': {}", descriptor.name(), err.message());
        }
    }

    Ok(())
}

pub(super) fn uninstall(name: &str) -> Result<(), ControlError> {
    let manager = connect(SC_MANAGER_CONNECT)?;
    let service = open_service(&manager, name, SERVICE_STOP | SERVICE_QUERY_STATUS | DELETE)?;

    if current_state(&service, name).is_ok_and(|state| state != ServiceState::Stopped) {
        debug!("stopping '{name}' before deletion");
        let mut status = SERVICE_STATUS::default();
        if unsafe { ControlService(service.handle(), SERVICE_CONTROL_STOP, &mut status) }.is_ok() {
            thread::sleep(CONFIRM_WAIT);
        }
    }

    unsafe { DeleteService(service.handle()) }
        .map_err(|err| ControlError::Delete { name: name.to_string(), detail: err.message() })?;
    Ok(())
}
