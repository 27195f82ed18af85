//! Error types for locksmith-core.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration and identity errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `REBOOT_STRATEGY` named something other than the four known strategies.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Only one of the two window settings was provided.
    #[error("either both or neither $REBOOT_WINDOW_START and $REBOOT_WINDOW_LENGTH must be set")]
    PartialWindow,

    #[error("invalid reboot window start {value:?}: {source}")]
    WindowStart {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid reboot window length {value:?}: {reason}")]
    WindowLength { value: String, reason: String },

    #[error("cannot read machine-id at {path}: {source}")]
    MachineIdIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("machine-id at {path} is empty")]
    MachineIdEmpty { path: PathBuf },
}
