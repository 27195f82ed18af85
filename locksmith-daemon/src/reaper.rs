//! Background release of a reboot lock left behind by an earlier run.

use std::sync::Arc;

use tokio::sync::broadcast;

use locksmith_core::{Backoff, Strategy};

use crate::error::DaemonError;
use crate::lock::LockSetup;
use crate::probe::ServiceProbe;

/// How a reaper run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// A lock held by this machine was released.
    Released,
    /// This machine held nothing.
    NothingHeld,
    /// Stopped before cleanup could be confirmed.
    Stopped,
}

#[derive(Clone)]
pub struct Reaper {
    strategy: Strategy,
    probe: Arc<dyn ServiceProbe>,
    locks: LockSetup,
    backoff: Backoff,
}

impl Reaper {
    pub fn new(strategy: Strategy, probe: Arc<dyn ServiceProbe>, locks: LockSetup) -> Self {
        Self {
            strategy,
            probe,
            locks,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Retry until any lock held by this machine is confirmed released or
    /// `stop` fires. Every attempt waits out the current interval first,
    /// and the stop signal is watched during that wait.
    pub async fn run(self, mut stop: broadcast::Receiver<()>) -> ReapOutcome {
        let mut interval = self.backoff.initial();
        loop {
            tokio::select! {
                _ = stop.recv() => {
                    tracing::debug!("stale lock reaper stopped");
                    return ReapOutcome::Stopped;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let reason = match self.attempt().await {
                Ok(outcome) => return outcome,
                Err(reason) => reason,
            };

            interval = self.backoff.next(interval);
            tracing::warn!(
                reason = %reason,
                retry_in = ?interval,
                "unlocking old locks failed, retrying",
            );
        }
    }

    async fn attempt(&self) -> Result<ReapOutcome, DaemonError> {
        if self.strategy == Strategy::BestEffort {
            self.ensure_store_reachable().await?;
        }

        let lock = self.locks.setup()?;
        if lock.release_if_held().await? {
            Ok(ReapOutcome::Released)
        } else {
            tracing::debug!(holder = %lock.holder(), "no reboot lock held by this machine");
            Ok(ReapOutcome::NothingHeld)
        }
    }

    /// With no local coordination service the remote store has to answer
    /// before a release is attempted.
    async fn ensure_store_reachable(&self) -> Result<(), DaemonError> {
        if self.probe.active_service().await?.is_some() {
            // A running local member is enough to attempt the release.
            return Ok(());
        }
        self.locks
            .service()
            .ping()
            .await
            .map_err(|err| DaemonError::ClusterUnavailable {
                services: self.probe.services(),
                reason: err.to_string(),
            })
    }
}
