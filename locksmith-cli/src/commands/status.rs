//! `locksmithctl status` and `set-max` — inspect and size the semaphore.

use anyhow::{Context, Result};
use clap::Args;

use crate::Global;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the semaphore as JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &Global) -> Result<()> {
        let etcd = super::etcd(global)?;
        let sem = super::block_on(etcd.semaphore())?.context("error fetching semaphore")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&sem).context("failed to render semaphore JSON")?
            );
            return Ok(());
        }

        println!("Available: {}", sem.semaphore);
        println!("Max: {}", sem.max);
        if !sem.holders.is_empty() {
            println!();
            println!("MACHINE ID");
            for holder in &sem.holders {
                println!("{holder}");
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SetMaxArgs {
    /// Number of machines allowed to hold the lock at once.
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    pub max: i64,
}

impl SetMaxArgs {
    pub fn run(self, global: &Global) -> Result<()> {
        let etcd = super::etcd(global)?;
        let old = super::block_on(etcd.set_max(self.max))?.context("error setting max")?;
        println!("Old: {old}");
        println!("New: {}", self.max);
        Ok(())
    }
}
