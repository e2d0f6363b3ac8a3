//! Direct-registry install and removal of service entries.
//!
//! Works entirely through [`NativeRegistryApi`], so the sequencing, error
//! surface, and handle discipline can be exercised without a live registry.

use log::{debug, info};
use thiserror::Error;

use super::{
    DELETE, Disposition, KEY_ALL_ACCESS, KEY_CREATE_SUB_KEY, KEY_ENUMERATE_SUB_KEYS, KeyGuard,
    KeyLocator, NativeRegistryApi, NtStatus, REG_OPTION_NON_VOLATILE, ResolutionError,
    SERVICES_KEY_PATH,
};
use crate::descriptor::ServiceDescriptor;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("native registry routines are unavailable: {0}")]
    Unsupported(#[from] ResolutionError),
    #[error("could not open the services root key (status {0})")]
    RootUnavailable(NtStatus),
    #[error("could not create the service key '{name}' (status {status})")]
    CreateFailed { name: String, status: NtStatus },
    #[error("failed to write the '{value}' value (status {status})")]
    ValueWriteFailed { value: &'static str, status: NtStatus },
}

#[derive(Debug, Error)]
pub enum UninstallError {
    #[error("native registry routines are unavailable: {0}")]
    Unsupported(#[from] ResolutionError),
    #[error("could not open the services root key (status {0})")]
    RootUnavailable(NtStatus),
    #[error("service '{name}' does not exist")]
    NotFound { name: String },
    #[error("could not open the service key '{name}' (status {status})")]
    OpenFailed { name: String, status: NtStatus },
    #[error("could not delete the service key '{name}' (status {status})")]
    DeleteFailed { name: String, status: NtStatus },
}

/// Writes and deletes service entries below the services root, bypassing the
/// control manager entirely.
pub struct RegistryInstaller<'a, A: NativeRegistryApi> {
    api: &'a A,
}

impl<'a, A: NativeRegistryApi> RegistryInstaller<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Writes the service's configuration subtree under the services root.
    ///
    /// Re-installing over an existing name overwrites its values; the
    /// returned disposition tells the two apart. The entry is not announced
    /// to the control manager; it becomes visible on the manager's next
    /// rescan, typically at boot.
    pub fn install(&self, descriptor: &ServiceDescriptor) -> Result<Disposition, InstallError> {
        let root = self
            .api
            .open_key(&KeyLocator::absolute(SERVICES_KEY_PATH), KEY_CREATE_SUB_KEY)
            .map_err(InstallError::RootUnavailable)?;
        let root = KeyGuard::new(self.api, root);

        let (service_key, disposition) = self
            .api
            .create_key(
                &KeyLocator::relative(root.handle(), descriptor.name()),
                KEY_ALL_ACCESS,
                REG_OPTION_NON_VOLATILE,
            )
            .map_err(|status| InstallError::CreateFailed {
                name: descriptor.name().to_string(),
                status,
            })?;
        let service_key = KeyGuard::new(self.api, service_key);
        debug!("service key for '{}' ready ({disposition})", descriptor.name());

        // No rollback: a failed write leaves the earlier values in place, and
        // a later install completes them through create-or-open.
        for (value_name, value) in descriptor.registry_values() {
            self.api
                .set_value(service_key.handle(), value_name, &value)
                .map_err(|status| InstallError::ValueWriteFailed { value: value_name, status })?;
        }

        info!("service '{}' written to the registry ({disposition})", descriptor.name());
        Ok(disposition)
    }

    /// Deletes the service's configuration subtree.
    ///
    /// The native delete requires a childless key; entries written by
    /// [`Self::install`] are flat, so the precondition always holds for them.
    pub fn uninstall(&self, name: &str) -> Result<(), UninstallError> {
        let root = self
            .api
            .open_key(&KeyLocator::absolute(SERVICES_KEY_PATH), KEY_ENUMERATE_SUB_KEYS)
            .map_err(UninstallError::RootUnavailable)?;
        let root = KeyGuard::new(self.api, root);

        let service_key = match self.api.open_key(&KeyLocator::relative(root.handle(), name), DELETE)
        {
            Ok(handle) => KeyGuard::new(self.api, handle),
            Err(NtStatus::OBJECT_NAME_NOT_FOUND) => {
                return Err(UninstallError::NotFound { name: name.to_string() });
            }
            Err(status) => {
                return Err(UninstallError::OpenFailed { name: name.to_string(), status });
            }
        };

        self.api
            .delete_key(service_key.handle())
            .map_err(|status| UninstallError::DeleteFailed { name: name.to_string(), status })?;

        info!("service '{name}' removed from the registry");
        Ok(())
    }
}
