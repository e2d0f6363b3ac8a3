//! What gets installed: the service descriptor and its persisted layout.

use std::fmt;

use clap::ValueEnum;
use thiserror::Error;

use crate::registry::RegValue;

/// `Type` value for a service hosted in its own process.
pub const SERVICE_WIN32_OWN_PROCESS: u32 = 0x0000_0010;
/// `ErrorControl` level that logs a startup failure and continues booting.
pub const SERVICE_ERROR_NORMAL: u32 = 0x0000_0001;
/// Account recorded in `ObjectName`.
pub const LOCAL_SYSTEM_ACCOUNT: &str = "LocalSystem";

/// Start behavior recorded in the service's `Start` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StartType {
    /// Started by the service control manager at boot
    Automatic,
    /// Started on demand
    Manual,
    /// Never started
    Disabled,
    /// Started by the boot loader
    Boot,
    /// Started during kernel initialization
    System,
}

impl StartType {
    pub fn registry_code(self) -> u32 {
        match self {
            StartType::Boot => 0,
            StartType::System => 1,
            StartType::Automatic => 2,
            StartType::Manual => 3,
            StartType::Disabled => 4,
        }
    }

    pub fn from_registry_code(code: u32) -> Option<StartType> {
        match code {
            0 => Some(StartType::Boot),
            1 => Some(StartType::System),
            2 => Some(StartType::Automatic),
            3 => Some(StartType::Manual),
            4 => Some(StartType::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for StartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StartType::Automatic => "automatic",
            StartType::Manual => "manual",
            StartType::Disabled => "disabled",
            StartType::Boot => "boot",
            StartType::System => "system",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid service name '{0}': must be non-empty and contain no path separators")]
pub struct InvalidServiceName(pub String);

/// Immutable description of the service entry to install.
///
/// The name doubles as the key of the configuration subtree, so it cannot
/// carry path separators.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    name: String,
    executable_path: String,
    display_name: Option<String>,
    description: Option<String>,
    start_type: StartType,
}

impl ServiceDescriptor {
    pub fn new(name: &str, executable_path: &str) -> Result<Self, InvalidServiceName> {
        if name.is_empty() || name.contains(['\\', '/']) {
            return Err(InvalidServiceName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            executable_path: executable_path.to_string(),
            display_name: None,
            description: None,
            start_type: StartType::Automatic,
        })
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }

    /// An empty description counts as absent; no `Description` value is
    /// written for it.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|text| !text.is_empty());
        self
    }

    pub fn with_start_type(mut self, start_type: StartType) -> Self {
        self.start_type = start_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executable_path(&self) -> &str {
        &self.executable_path
    }

    /// Falls back to the service name when no display name was supplied.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start_type(&self) -> StartType {
        self.start_type
    }

    /// The configuration subtree in write order: the mandatory values first,
    /// `Description` only when one was supplied.
    pub fn registry_values(&self) -> Vec<(&'static str, RegValue)> {
        let mut values = vec![
            ("Type", RegValue::Dword(SERVICE_WIN32_OWN_PROCESS)),
            ("Start", RegValue::Dword(self.start_type.registry_code())),
            ("ErrorControl", RegValue::Dword(SERVICE_ERROR_NORMAL)),
            ("ImagePath", RegValue::Sz(self.executable_path.clone())),
            ("DisplayName", RegValue::Sz(self.display_name().to_string())),
            ("ObjectName", RegValue::Sz(LOCAL_SYSTEM_ACCOUNT.to_string())),
        ];
        if let Some(description) = &self.description {
            values.push(("Description", RegValue::Sz(description.clone())));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_names_with_path_separators() {
        assert!(ServiceDescriptor::new(r"Demo\Sub", r"C:\app\svc.exe").is_err());
        assert!(ServiceDescriptor::new("Demo/Sub", r"C:\app\svc.exe").is_err());
        assert!(ServiceDescriptor::new("", r"C:\app\svc.exe").is_err());
        assert!(ServiceDescriptor::new("Demo", r"C:\app\svc.exe").is_ok());
    }

    #[test]
    fn display_name_falls_back_to_the_service_name() {
        let descriptor = ServiceDescriptor::new("Demo", r"C:\app\svc.exe").unwrap();
        assert_eq!(descriptor.display_name(), "Demo");

        let named = descriptor.clone().with_display_name(Some("Demo Service".into()));
        assert_eq!(named.display_name(), "Demo Service");
    }

    #[test]
    fn empty_description_counts_as_absent() {
        let descriptor = ServiceDescriptor::new("Demo", r"C:\app\svc.exe")
            .unwrap()
            .with_description(Some(String::new()));
        assert_eq!(descriptor.description(), None);
        assert!(!descriptor.registry_values().iter().any(|(name, _)| *name == "Description"));
    }

    #[test]
    fn start_type_codes_round_trip() {
        for start_type in [
            StartType::Boot,
            StartType::System,
            StartType::Automatic,
            StartType::Manual,
            StartType::Disabled,
        ] {
            assert_eq!(StartType::from_registry_code(start_type.registry_code()), Some(start_type));
        }
        assert_eq!(StartType::Automatic.registry_code(), 2);
        assert_eq!(StartType::from_registry_code(9), None);
    }

    #[test]
    fn registry_values_keep_the_write_order() {
        let descriptor = ServiceDescriptor::new("Demo", r"C:\app\svc.exe")
            .unwrap()
            .with_display_name(Some("Demo Service".into()))
            .with_description(Some("test".into()));
        let values = descriptor.registry_values();
        let names: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["Type", "Start", "ErrorControl", "ImagePath", "DisplayName", "ObjectName", "Description"]
        );
        assert_eq!(values[0].1, RegValue::Dword(SERVICE_WIN32_OWN_PROCESS));
        assert_eq!(values[3].1, RegValue::Sz(r"C:\app\svc.exe".into()));
        assert_eq!(values[5].1, RegValue::Sz("LocalSystem".into()));
    }
}
