//! Decides whether a reboot has to go through the cluster lock.

use std::sync::Arc;

use locksmith_core::Strategy;

use crate::error::DaemonError;
use crate::probe::ServiceProbe;

#[derive(Clone)]
pub struct LockGate {
    strategy: Strategy,
    probe: Arc<dyn ServiceProbe>,
}

impl LockGate {
    pub fn new(strategy: Strategy, probe: Arc<dyn ServiceProbe>) -> Self {
        Self { strategy, probe }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether this reboot must hold the lock.
    ///
    /// `best-effort` consults the probe on every call; a probe failure is
    /// returned as-is because the answer is then unknown. `off` never
    /// coordinates and is rejected.
    pub async fn use_lock(&self) -> Result<bool, DaemonError> {
        match self.strategy {
            Strategy::Reboot => Ok(false),
            Strategy::EtcdLock => Ok(true),
            Strategy::BestEffort => match self.probe.active_service().await? {
                Some(name) => {
                    tracing::info!(service = %name, "coordination service is active");
                    Ok(true)
                }
                None => {
                    tracing::info!(services = ?self.probe.services(), "coordination services are inactive");
                    Ok(false)
                }
            },
            Strategy::Off => Err(DaemonError::UncoordinatedStrategy(self.strategy)),
        }
    }
}
