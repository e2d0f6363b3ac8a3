//! Installs, removes, and controls a Windows service entry.
//!
//! Two install strategies share one command surface: the documented service
//! control manager API, and a direct path that writes the service's registry
//! configuration through dynamically resolved `ntdll` routines. Start, stop,
//! and status always go through the control manager, whichever strategy
//! performed the install.

pub mod cli;
pub mod control;
pub mod descriptor;
pub mod install;
pub mod privilege;
pub mod registry;
