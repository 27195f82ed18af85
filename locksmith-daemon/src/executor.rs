//! Reboot executor: decide, lock, notify, reboot.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use locksmith_core::Backoff;

use crate::broadcast::Broadcaster;
use crate::error::{DaemonError, LockError};
use crate::gate::LockGate;
use crate::lock::{Lock, LockSetup};
use crate::paths::{LOGINS_REBOOT_DELAY, REBOOT_CONFIRM_WAIT};
use crate::session::SessionManager;

/// Stages the executor moves through, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootPhase {
    Deciding,
    Locking,
    Notifying,
    Rebooting,
    Sleeping,
}

impl fmt::Display for RebootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RebootPhase::Deciding => "deciding",
            RebootPhase::Locking => "locking",
            RebootPhase::Notifying => "notifying",
            RebootPhase::Rebooting => "rebooting",
            RebootPhase::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RebootTimings {
    pub backoff: Backoff,
    pub logins_delay: Duration,
    pub confirm_wait: Duration,
}

impl Default for RebootTimings {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            logins_delay: LOGINS_REBOOT_DELAY,
            confirm_wait: REBOOT_CONFIRM_WAIT,
        }
    }
}

#[derive(Clone)]
pub struct Rebooter {
    gate: LockGate,
    locks: LockSetup,
    session: Arc<dyn SessionManager>,
    notifier: Arc<dyn Broadcaster>,
    timings: RebootTimings,
}

impl Rebooter {
    pub fn new(
        gate: LockGate,
        locks: LockSetup,
        session: Arc<dyn SessionManager>,
        notifier: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            gate,
            locks,
            session,
            notifier,
            timings: RebootTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: RebootTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Reboot the machine, taking the cluster lock first if the strategy
    /// asks for it.
    ///
    /// Never returns on success: the reboot ends the process. An error
    /// means the decision could not be made, or the reboot was requested
    /// and the process is still alive after [`RebootTimings::confirm_wait`].
    pub async fn reboot(&self) -> Result<Infallible, DaemonError> {
        tracing::info!(phase = %RebootPhase::Deciding, strategy = %self.gate.strategy(), "preparing reboot");
        if self.gate.use_lock().await? {
            let lock = self.locks.setup()?;
            self.acquire(&lock).await;
        }
        self.notify_and_reboot().await
    }

    /// Retry acquisition until it succeeds. There is no attempt limit.
    async fn acquire(&self, lock: &Lock) {
        let backoff = self.timings.backoff;
        let mut interval = backoff.initial();
        loop {
            tracing::debug!(phase = %RebootPhase::Locking, holder = %lock.holder(), "acquiring reboot lock");
            match lock.acquire().await {
                Ok(()) => {
                    tracing::info!(phase = %RebootPhase::Locking, holder = %lock.holder(), "acquired reboot lock");
                    return;
                }
                // Same id already registered: either a leftover of this
                // machine that survived the reaper, or an identically named
                // holder. Both are accepted.
                Err(LockError::AlreadyHeld(_)) => {
                    tracing::info!(phase = %RebootPhase::Locking, holder = %lock.holder(), "reboot lock already held by this machine");
                    return;
                }
                Err(err) => {
                    interval = backoff.next(interval);
                    tracing::warn!(
                        phase = %RebootPhase::Locking,
                        error = %err,
                        retry_in = ?interval,
                        "error locking, retrying",
                    );
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    async fn notify_and_reboot(&self) -> Result<Infallible, DaemonError> {
        let delay = self.timings.logins_delay;
        let minutes = delay.as_secs() / 60;
        let lines = self
            .notifier
            .broadcast(&format!("System reboot in {minutes} minutes!"));
        if lines > 0 {
            tracing::info!(
                phase = %RebootPhase::Notifying,
                terminals = lines,
                "logins detected, delaying reboot for {minutes} minutes",
            );
            tokio::time::sleep(delay).await;
        }

        tracing::info!(phase = %RebootPhase::Rebooting, "requesting reboot");
        self.session.reboot(false).await?;
        tracing::info!(phase = %RebootPhase::Sleeping, "reboot sent, going to sleep");

        tokio::time::sleep(self.timings.confirm_wait).await;
        Err(DaemonError::RebootNotConfirmed)
    }
}
