//! locksmithctl — cluster reboot coordination.
//!
//! # Usage
//!
//! ```text
//! locksmithctl daemon [--strategy <s>] [--window-start HH:MM --window-length <dur>]
//! locksmithctl status [--json]
//! locksmithctl lock
//! locksmithctl unlock
//! locksmithctl set-max <n>
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemon::DaemonArgs, lock::LockCommand, status::SetMaxArgs, status::StatusArgs};
use locksmith_daemon::etcd::DEFAULT_ENDPOINT;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "locksmithctl",
    version,
    about = "Coordinate machine reboots across a cluster through a shared lock",
    long_about = None,
)]
struct Cli {
    /// Comma-separated etcd endpoints holding the reboot semaphore.
    #[arg(long, global = true, env = "LOCKSMITHCTL_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Filesystem root containing etc/machine-id.
    #[arg(long, global = true, default_value = "/", hide = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wait for a pending update and reboot when the cluster allows it.
    Daemon(DaemonArgs),

    /// Show free slots, maximum and current holders of the reboot lock.
    Status(StatusArgs),

    /// Take the reboot lock for this machine.
    Lock,

    /// Release this machine's reboot lock.
    Unlock,

    /// Set how many machines may hold the reboot lock at once.
    SetMax(SetMaxArgs),
}

/// Connection settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Global {
    pub endpoints: Vec<String>,
    pub root: PathBuf,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = Global {
        endpoints: locksmith_daemon::etcd::EtcdLockService::parse_endpoints(&cli.endpoint),
        root: cli.root,
    };
    match cli.command {
        Commands::Daemon(args) => args.run(global),
        Commands::Status(args) => args.run(&global),
        Commands::Lock => commands::lock::run(LockCommand::Lock, &global),
        Commands::Unlock => commands::lock::run(LockCommand::Unlock, &global),
        Commands::SetMax(args) => args.run(&global),
    }
}
