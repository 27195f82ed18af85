//! Daemon configuration resolved from raw settings.

use std::path::PathBuf;

use locksmith_core::{ConfigError, RebootWindow, Strategy};

use crate::etcd::DEFAULT_ENDPOINT;

/// Raw settings as handed over by the command line.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub strategy: Option<String>,
    pub window_start: Option<String>,
    pub window_length: Option<String>,
    pub endpoints: Vec<String>,
    /// Filesystem root holding `etc/machine-id`.
    pub root: PathBuf,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            strategy: None,
            window_start: None,
            window_length: None,
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            root: PathBuf::from("/"),
        }
    }
}

/// Validated coordination settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub strategy: Strategy,
    pub window: Option<RebootWindow>,
}

impl DaemonConfig {
    /// Resolve the strategy, then the window. Returns `None` for the `off`
    /// strategy without looking at the window settings.
    pub fn resolve(settings: &DaemonSettings) -> Result<Option<Self>, ConfigError> {
        let strategy: Strategy = settings.strategy.as_deref().unwrap_or_default().parse()?;
        if strategy == Strategy::Off {
            return Ok(None);
        }

        let window = RebootWindow::from_settings(
            settings.window_start.as_deref(),
            settings.window_length.as_deref(),
        )?;
        Ok(Some(Self { strategy, window }))
    }
}
