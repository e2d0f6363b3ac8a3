use std::path::Path;

use clap::Parser;

use svcreg::cli::{self, Cmd};
use svcreg::control::{self, ControlError, ControlOutcome};
use svcreg::descriptor::{ServiceDescriptor, StartType};
use svcreg::install;
use svcreg::privilege;
use svcreg::registry::installer::UninstallError;

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .init();

    std::process::exit(run());
}

fn run() -> i32 {
    let args = cli::Args::parse();

    // Every operation touches protected state; refuse early when the process
    // is not elevated.
    if let Err(err) = privilege::ensure_elevated() {
        eprintln!("{err}");
        return 1;
    }

    match args.cmd {
        Cmd::Install { exe_path, name, display_name, description, start_type, scm } => {
            handle_install(&exe_path, &name, display_name, description, start_type, scm)
        }
        Cmd::Uninstall { name, scm } => handle_uninstall(&name, scm),
        Cmd::Start { name } => handle_start(&name),
        Cmd::Stop { name } => handle_stop(&name),
        Cmd::Status { name } => handle_status(&name),
    }
}

fn handle_install(
    exe_path: &str,
    name: &str,
    display_name: Option<String>,
    description: Option<String>,
    start_type: StartType,
    scm: bool,
) -> i32 {
    if !Path::new(exe_path).is_file() {
        eprintln!("executable not found: {exe_path}");
        return 1;
    }

    let descriptor = match ServiceDescriptor::new(name, exe_path) {
        Ok(descriptor) => descriptor
            .with_display_name(display_name)
            .with_description(description)
            .with_start_type(start_type),
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    if scm {
        match install::install_scm(&descriptor) {
            Ok(()) => {
                println!("service '{name}' installed");
                0
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        }
    } else {
        match install::install_direct(&descriptor) {
            Ok(disposition) => {
                println!("service '{name}' written to the registry ({disposition})");
                println!(
                    "note: the entry appears once the service control manager rescans, \
                     typically at the next boot"
                );
                0
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        }
    }
}

fn handle_uninstall(name: &str, scm: bool) -> i32 {
    if scm {
        match install::uninstall_scm(name) {
            Ok(()) => {
                println!("service '{name}' uninstalled");
                0
            }
            Err(ControlError::NotFound(_)) => {
                eprintln!("service '{name}' does not exist");
                1
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        }
    } else {
        match install::uninstall_direct(name) {
            Ok(()) => {
                println!("service '{name}' uninstalled");
                0
            }
            Err(UninstallError::NotFound { .. }) => {
                eprintln!("service '{name}' does not exist");
                1
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        }
    }
}

fn handle_start(name: &str) -> i32 {
    match control::start(name) {
        Ok(ControlOutcome::Confirmed) => {
            println!("service '{name}' started");
            0
        }
        Ok(ControlOutcome::AlreadyInState) => {
            println!("service '{name}' is already running");
            0
        }
        Ok(ControlOutcome::Unconfirmed(state)) => {
            println!("start of '{name}' was issued; the service now reports '{state}'");
            0
        }
        Err(ControlError::NotFound(_)) => {
            eprintln!("service '{name}' is not known to the service control manager");
            eprintln!("note: a directly installed entry appears only after a rescan");
            1
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn handle_stop(name: &str) -> i32 {
    match control::stop(name) {
        Ok(ControlOutcome::Confirmed) => {
            println!("service '{name}' stopped");
            0
        }
        Ok(ControlOutcome::AlreadyInState) => {
            println!("service '{name}' is already stopped");
            0
        }
        Ok(ControlOutcome::Unconfirmed(state)) => {
            println!("stop of '{name}' was issued; the service now reports '{state}'");
            0
        }
        Err(ControlError::NotFound(_)) => {
            eprintln!("service '{name}' is not known to the service control manager");
            1
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn handle_status(name: &str) -> i32 {
    match control::status(name) {
        Ok(report) => {
            println!("service: {name}");
            println!("state: {}", report.state);
            if let Some(start_type) = report.start_type {
                println!("start type: {start_type}");
            }
            0
        }
        Err(ControlError::NotFound(_)) => {
            eprintln!("service '{name}' does not exist in the service control manager");
            eprintln!("note: the entry may exist in the registry but not be loaded yet");
            1
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}
