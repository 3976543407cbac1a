//! Lifecycle CLI for the document-analysis server.
//!
//! Supervises the `docforge` HTTP process: start/stop/restart with port
//! reclaim, three-point status validation, log tailing, and persisted
//! configuration. Exit code 0 on success, 1 on any failure.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

#[path = "../lifecycle/mod.rs"]
mod lifecycle;

use lifecycle::{ConfigPatch, ServerManager};

#[derive(Debug, Parser)]
#[command(name = "docforgectl", author, version, about = "Supervise the docforge server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Start the server
    Start {
        /// Reclaim the configured port from whatever currently holds it
        #[arg(long)]
        force: bool,
        /// Override and persist the port before starting
        #[arg(long)]
        port: Option<u16>,
        /// Override and persist the host before starting
        #[arg(long)]
        host: Option<String>,
    },
    /// Stop the server
    Stop,
    /// Restart the server
    Restart {
        /// Reclaim the configured port from whatever currently holds it
        #[arg(long)]
        force: bool,
    },
    /// Report whether the server is running
    Status,
    /// Tail the server log
    Logs {
        /// Number of trailing lines to print
        #[arg(long, default_value_t = 50)]
        lines: usize,
        /// Keep streaming appended lines until interrupted
        #[arg(long)]
        follow: bool,
    },
    /// Terminate every process listening on a port
    KillPort {
        #[arg(long)]
        port: u16,
    },
    /// Show or merge-update the persisted configuration
    Config {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        reload: Option<bool>,
        #[arg(long)]
        log_level: Option<String>,
    },
}

fn run(cli: Cli) -> Result<(), lifecycle::LifecycleError> {
    let manager = ServerManager::default();

    match cli.command {
        CliCommand::Start { force, port, host } => {
            if port.is_some() || host.is_some() {
                manager.patch_config(ConfigPatch {
                    port,
                    host,
                    ..Default::default()
                })?;
            }
            let pid = manager.start(force)?;
            println!("started (pid {})", pid);
        }
        CliCommand::Stop => {
            manager.stop()?;
            println!("stopped");
        }
        CliCommand::Restart { force } => {
            let pid = manager.restart(force)?;
            println!("restarted (pid {})", pid);
        }
        CliCommand::Status => {
            let report = manager.status();
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|_| "status unavailable".to_string())
            );
        }
        CliCommand::Logs { lines, follow } => {
            manager.logs(lines, follow)?;
        }
        CliCommand::KillPort { port } => {
            manager.kill_port(port)?;
            println!("port {} is free", port);
        }
        CliCommand::Config {
            port,
            host,
            workers,
            reload,
            log_level,
        } => {
            let patch = ConfigPatch {
                host,
                port,
                workers,
                reload,
                log_level,
            };
            let config = if patch.is_empty() {
                manager.load_config()
            } else {
                manager.patch_config(patch)?
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&config)
                    .unwrap_or_else(|_| "config unavailable".to_string())
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .ok();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
