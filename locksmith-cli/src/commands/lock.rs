//! `locksmithctl lock` / `unlock` — manual lock handling for this machine.

use std::sync::Arc;

use anyhow::{Context, Result};

use locksmith_daemon::{LockError, LockSetup};

use crate::Global;

#[derive(Debug, Clone, Copy)]
pub enum LockCommand {
    Lock,
    Unlock,
}

pub fn run(command: LockCommand, global: &Global) -> Result<()> {
    let etcd = super::etcd(global)?;
    let lock = LockSetup::new(Arc::new(etcd), global.root.clone())
        .setup()
        .context("failed to set up lock")?;

    match command {
        LockCommand::Lock => match super::block_on(lock.acquire())? {
            Ok(()) => println!("Successfully acquired lock"),
            Err(LockError::AlreadyHeld(holder)) => println!("Lock already held by {holder}"),
            Err(err) => return Err(err).context("error locking"),
        },
        LockCommand::Unlock => match super::block_on(lock.release())? {
            Ok(()) => println!("Unlocked existing lock for this machine"),
            Err(LockError::NotHeld(holder)) => println!("No lock held by {holder}"),
            Err(err) => return Err(err).context("error unlocking"),
        },
    }
    Ok(())
}
