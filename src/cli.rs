use clap::{Parser, Subcommand};

use crate::descriptor::StartType;

#[derive(Parser, Debug)]
#[command(version, about = "service registrar with a direct-registry install path")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Install an executable as a service
    Install {
        /// Full path to the service executable
        exe_path: String,
        /// Service name (no path separators)
        name: String,
        /// Display name shown by management tools (defaults to the name)
        display_name: Option<String>,
        /// Service description
        description: Option<String>,
        /// Start behavior recorded for the service
        #[arg(long, value_enum, default_value_t = StartType::Automatic)]
        start_type: StartType,
        /// Register through the service control manager API instead of
        /// writing the registry directly
        #[arg(long)]
        scm: bool,
    },
    /// Remove an installed service
    Uninstall {
        /// Service name
        name: String,
        /// Remove through the service control manager API
        #[arg(long)]
        scm: bool,
    },
    /// Start a service (exit 0 = running or already running)
    Start {
        /// Service name
        name: String,
    },
    /// Stop a service (exit 0 = stopped or already stopped)
    Stop {
        /// Service name
        name: String,
    },
    /// Report the service state seen by the control manager
    Status {
        /// Service name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn install_takes_optional_positionals_and_flags() {
        let args = Args::try_parse_from([
            "svcreg",
            "install",
            r"C:\app\svc.exe",
            "Demo",
            "Demo Service",
            "test",
            "--start-type",
            "manual",
            "--scm",
        ])
        .expect("parse");

        match args.cmd {
            Cmd::Install { exe_path, name, display_name, description, start_type, scm } => {
                assert_eq!(exe_path, r"C:\app\svc.exe");
                assert_eq!(name, "Demo");
                assert_eq!(display_name.as_deref(), Some("Demo Service"));
                assert_eq!(description.as_deref(), Some("test"));
                assert_eq!(start_type, StartType::Manual);
                assert!(scm);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn install_defaults_to_automatic_direct_registry() {
        let args =
            Args::try_parse_from(["svcreg", "install", r"C:\app\svc.exe", "Demo"]).expect("parse");
        match args.cmd {
            Cmd::Install { display_name, description, start_type, scm, .. } => {
                assert_eq!(display_name, None);
                assert_eq!(description, None);
                assert_eq!(start_type, StartType::Automatic);
                assert!(!scm);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn control_commands_take_a_name() {
        for command in ["start", "stop", "status", "uninstall"] {
            let args = Args::try_parse_from(["svcreg", command, "Demo"]).expect("parse");
            let name = match args.cmd {
                Cmd::Uninstall { name, scm } => {
                    assert!(!scm);
                    name
                }
                Cmd::Start { name } | Cmd::Stop { name } | Cmd::Status { name } => name,
                other => panic!("unexpected command {other:?}"),
            };
            assert_eq!(name, "Demo");
        }
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(Args::try_parse_from(["svcreg", "restart", "Demo"]).is_err());
        assert!(Args::try_parse_from(["svcreg"]).is_err());
    }
}
