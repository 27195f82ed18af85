//! `locksmithctl daemon` — the reboot coordination loop.

use anyhow::{Context, Result};
use clap::Args;

use locksmith_daemon::{start_blocking, DaemonSettings};

use crate::Global;

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// reboot, etcd-lock, best-effort or off.
    #[arg(long, env = "REBOOT_STRATEGY")]
    pub strategy: Option<String>,

    /// Daily start of the reboot window, HH:MM in local time.
    #[arg(long, env = "REBOOT_WINDOW_START")]
    pub window_start: Option<String>,

    /// Length of the reboot window, e.g. 1h30m.
    #[arg(long, env = "REBOOT_WINDOW_LENGTH")]
    pub window_length: Option<String>,
}

impl DaemonArgs {
    pub fn run(self, global: Global) -> Result<()> {
        let settings = DaemonSettings {
            strategy: self.strategy,
            window_start: self.window_start,
            window_length: self.window_length,
            endpoints: global.endpoints,
            root: global.root,
        };
        start_blocking(settings).context("daemon exited with error")
    }
}
