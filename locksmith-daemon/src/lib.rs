//! Reboot coordination daemon: waits for a pending update, takes the
//! cluster reboot lock when the strategy asks for it, and reboots.

pub mod broadcast;
pub mod config;
mod error;
pub mod etcd;
pub mod executor;
pub mod gate;
pub mod lock;
pub mod paths;
pub mod probe;
pub mod reaper;
mod runtime;
pub mod session;
pub mod update;

pub use config::{DaemonConfig, DaemonSettings};
pub use error::{DaemonError, LockError, ProbeError};
pub use executor::{RebootPhase, RebootTimings, Rebooter};
pub use gate::LockGate;
pub use lock::{Lock, LockService, LockSetup, NoLockService};
pub use reaper::{ReapOutcome, Reaper};
pub use runtime::{coordinate, run, start_blocking, Collaborators};
