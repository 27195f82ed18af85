//! Locksmith core library — domain types, retry policy, reboot windows.
//!
//! - [`types`] — strategy, update status and machine identity
//! - [`backoff`] — capped exponential retry intervals
//! - [`window`] — daily reboot window parsing and scheduling
//! - [`machine_id`] — durable machine identity lookup
//! - [`error`] — [`ConfigError`]

pub mod backoff;
pub mod error;
pub mod machine_id;
pub mod types;
pub mod window;

pub use backoff::Backoff;
pub use error::ConfigError;
pub use types::{MachineId, Strategy, UpdateStatus};
pub use window::RebootWindow;
