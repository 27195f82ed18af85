//! The cluster-wide reboot lock as seen by this machine.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use locksmith_core::machine_id::read_machine_id;
use locksmith_core::MachineId;

use crate::error::{DaemonError, LockError};

/// Store holding the shared reboot semaphore.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Check that the store answers at all.
    async fn ping(&self) -> Result<(), LockError>;

    /// Register `holder`. Not re-entrant: a second acquire by the same holder
    /// yields [`LockError::AlreadyHeld`].
    async fn acquire(&self, holder: &MachineId) -> Result<(), LockError>;

    /// Unregister `holder`, or [`LockError::NotHeld`] if it holds nothing.
    async fn release(&self, holder: &MachineId) -> Result<(), LockError>;
}

/// Store handed out when the strategy reboots without coordinating.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLockService;

impl NoLockService {
    fn refuse() -> LockError {
        LockError::Backend("the reboot strategy does not use the cluster lock".to_string())
    }
}

#[async_trait]
impl LockService for NoLockService {
    async fn ping(&self) -> Result<(), LockError> {
        Err(Self::refuse())
    }

    async fn acquire(&self, _holder: &MachineId) -> Result<(), LockError> {
        Err(Self::refuse())
    }

    async fn release(&self, _holder: &MachineId) -> Result<(), LockError> {
        Err(Self::refuse())
    }
}

/// Lock handle for one holder. Built fresh for every coordination attempt.
pub struct Lock {
    holder: MachineId,
    service: Arc<dyn LockService>,
}

impl Lock {
    pub fn new(holder: MachineId, service: Arc<dyn LockService>) -> Self {
        Self { holder, service }
    }

    pub fn holder(&self) -> &MachineId {
        &self.holder
    }

    pub async fn acquire(&self) -> Result<(), LockError> {
        self.service.acquire(&self.holder).await
    }

    pub async fn release(&self) -> Result<(), LockError> {
        self.service.release(&self.holder).await
    }

    /// Release the lock if this machine holds it. Returns whether anything
    /// was released; holding nothing is not an error.
    pub async fn release_if_held(&self) -> Result<bool, LockError> {
        match self.release().await {
            Ok(()) => {
                tracing::info!(holder = %self.holder, "unlocked existing lock for this machine");
                Ok(true)
            }
            Err(LockError::NotHeld(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Builds [`Lock`] handles for this machine's identity.
#[derive(Clone)]
pub struct LockSetup {
    service: Arc<dyn LockService>,
    root: PathBuf,
}

impl LockSetup {
    /// `root` is the filesystem root holding `etc/machine-id`.
    pub fn new(service: Arc<dyn LockService>, root: impl Into<PathBuf>) -> Self {
        Self {
            service,
            root: root.into(),
        }
    }

    pub fn service(&self) -> &Arc<dyn LockService> {
        &self.service
    }

    /// Read the machine id and return a new handle for it.
    pub fn setup(&self) -> Result<Lock, DaemonError> {
        let holder = read_machine_id(&self.root)?;
        Ok(Lock::new(holder, self.service.clone()))
    }
}
