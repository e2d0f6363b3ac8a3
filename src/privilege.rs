//! Elevation gate consulted before any service operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("this operation requires elevated privileges")]
    NotElevated,
    #[error("could not determine the process privilege level: {0}")]
    Check(String),
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Fails unless the process token is elevated.
        pub fn ensure_elevated() -> Result<(), PrivilegeError> {
            use std::mem;

            use windows::Win32::Foundation::{CloseHandle, HANDLE};
            use windows::Win32::Security::{
                GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation,
            };
            use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

            let mut token = HANDLE::default();
            unsafe {
                OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token)
                    .map_err(|err| PrivilegeError::Check(err.message()))?;

                let mut elevation: TOKEN_ELEVATION = mem::zeroed();
                let mut returned = 0u32;
                let queried = GetTokenInformation(
                    token,
                    TokenElevation,
                    Some(&mut elevation as *mut _ as *mut core::ffi::c_void),
                    mem::size_of::<TOKEN_ELEVATION>() as u32,
                    &mut returned,
                );
                let _ = CloseHandle(token);
                queried.map_err(|err| PrivilegeError::Check(err.message()))?;

                if elevation.TokenIsElevated == 0 {
                    return Err(PrivilegeError::NotElevated);
                }
            }
            Ok(())
        }
    } else {
        /// Fails unless the process runs as root.
        pub fn ensure_elevated() -> Result<(), PrivilegeError> {
            if unsafe { libc::geteuid() } == 0 {
                Ok(())
            } else {
                Err(PrivilegeError::NotElevated)
            }
        }
    }
}
