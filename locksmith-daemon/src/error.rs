use thiserror::Error;

use locksmith_core::{ConfigError, MachineId, Strategy};

/// Outcomes of an acquire or release other than success.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// Acquire found the holder already registered.
    #[error("lock is already held by {0}")]
    AlreadyHeld(MachineId),

    /// Release found no registration for the holder.
    #[error("lock is not held by {0}")]
    NotHeld(MachineId),

    /// Anything else: store unreachable, semaphore exhausted, lost a
    /// compare-and-swap race. Always retried.
    #[error("{0}")]
    Backend(String),
}

/// The coordination service liveness check could not be completed.
#[derive(Debug, Error)]
#[error("error checking status of {services:?}: {reason}")]
pub struct ProbeError {
    pub services: Vec<String>,
    pub reason: String,
}

/// Error surface for the daemon runtime and its collaborators.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("error initializing {service} client: {reason}")]
    Connect {
        service: &'static str,
        reason: String,
    },

    #[error("{command} failed: {reason}")]
    Command { command: String, reason: String },

    #[error("strategy {0} does not coordinate reboots")]
    UncoordinatedStrategy(Strategy),

    #[error("{services:?} are inactive and remote cluster not available: {reason}")]
    ClusterUnavailable {
        services: Vec<String>,
        reason: String,
    },

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{task} task join failure: {reason}")]
    Join { task: &'static str, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The reboot request was sent but this process kept running.
    #[error("reboot attempt never finished")]
    RebootNotConfirmed,
}
