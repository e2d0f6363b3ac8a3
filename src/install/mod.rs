//! Install strategies behind one surface: direct registry writes, or the
//! documented service manager API.

#[cfg(windows)]
mod scm;

use crate::control::{self, ControlError};
use crate::descriptor::ServiceDescriptor;
use crate::registry::Disposition;
use crate::registry::installer::{InstallError, UninstallError};

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        use crate::registry::installer::RegistryInstaller;
        use crate::registry::nt::NtRegistry;

        /// Writes the service's configuration subtree directly, without
        /// touching the service control manager.
        pub fn install_direct(
            descriptor: &ServiceDescriptor,
        ) -> Result<Disposition, InstallError> {
            let api = NtRegistry::resolve()?;
            RegistryInstaller::new(&api).install(descriptor)
        }

        /// Deletes the service's configuration subtree. The entry may predate
        /// any manager rescan, so stopping it first is best-effort only.
        pub fn uninstall_direct(name: &str) -> Result<(), UninstallError> {
            control::stop_before_uninstall(name);
            let api = NtRegistry::resolve()?;
            RegistryInstaller::new(&api).uninstall(name)
        }

        /// Registers the service through the service control manager.
        pub fn install_scm(descriptor: &ServiceDescriptor) -> Result<(), ControlError> {
            scm::install(descriptor)
        }

        /// Stops and deletes the service through the service control manager.
        pub fn uninstall_scm(name: &str) -> Result<(), ControlError> {
            scm::uninstall(name)
        }
    } else {
        use crate::registry::ResolutionError;

        pub fn install_direct(
            _descriptor: &ServiceDescriptor,
        ) -> Result<Disposition, InstallError> {
            Err(InstallError::Unsupported(ResolutionError::UnsupportedPlatform))
        }

        pub fn uninstall_direct(name: &str) -> Result<(), UninstallError> {
            control::stop_before_uninstall(name);
            Err(UninstallError::Unsupported(ResolutionError::UnsupportedPlatform))
        }

        pub fn install_scm(_descriptor: &ServiceDescriptor) -> Result<(), ControlError> {
            Err(ControlError::Unsupported)
        }

        pub fn uninstall_scm(_name: &str) -> Result<(), ControlError> {
            Err(ControlError::Unsupported)
        }
    }
}
