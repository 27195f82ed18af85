//! Domain types shared by the daemon and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Policy for whether a reboot must be mediated by the cluster lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Never take the lock.
    Reboot,
    /// Always take the lock.
    EtcdLock,
    /// Take the lock only when a local coordination service is active.
    #[default]
    BestEffort,
    /// Do not coordinate at all; the daemon exits.
    Off,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Reboot => "reboot",
            Strategy::EtcdLock => "etcd-lock",
            Strategy::BestEffort => "best-effort",
            Strategy::Off => "off",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    /// An empty value selects the default strategy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Strategy::default()),
            "reboot" => Ok(Strategy::Reboot),
            "etcd-lock" => Ok(Strategy::EtcdLock),
            "best-effort" => Ok(Strategy::BestEffort),
            "off" => Ok(Strategy::Off),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateStatus
// ---------------------------------------------------------------------------

/// Current operation reported by the system update service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateStatus {
    Idle,
    CheckingForUpdate,
    UpdateAvailable,
    Downloading,
    Verifying,
    Finalizing,
    UpdatedNeedReboot,
    ReportingErrorEvent,
    /// Any operation name this build does not know about.
    Other(String),
}

impl UpdateStatus {
    pub fn needs_reboot(&self) -> bool {
        matches!(self, UpdateStatus::UpdatedNeedReboot)
    }

    pub fn as_str(&self) -> &str {
        match self {
            UpdateStatus::Idle => "UPDATE_STATUS_IDLE",
            UpdateStatus::CheckingForUpdate => "UPDATE_STATUS_CHECKING_FOR_UPDATE",
            UpdateStatus::UpdateAvailable => "UPDATE_STATUS_UPDATE_AVAILABLE",
            UpdateStatus::Downloading => "UPDATE_STATUS_DOWNLOADING",
            UpdateStatus::Verifying => "UPDATE_STATUS_VERIFYING",
            UpdateStatus::Finalizing => "UPDATE_STATUS_FINALIZING",
            UpdateStatus::UpdatedNeedReboot => "UPDATE_STATUS_UPDATED_NEED_REBOOT",
            UpdateStatus::ReportingErrorEvent => "UPDATE_STATUS_REPORTING_ERROR_EVENT",
            UpdateStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for UpdateStatus {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "UPDATE_STATUS_IDLE" => UpdateStatus::Idle,
            "UPDATE_STATUS_CHECKING_FOR_UPDATE" => UpdateStatus::CheckingForUpdate,
            "UPDATE_STATUS_UPDATE_AVAILABLE" => UpdateStatus::UpdateAvailable,
            "UPDATE_STATUS_DOWNLOADING" => UpdateStatus::Downloading,
            "UPDATE_STATUS_VERIFYING" => UpdateStatus::Verifying,
            "UPDATE_STATUS_FINALIZING" => UpdateStatus::Finalizing,
            "UPDATE_STATUS_UPDATED_NEED_REBOOT" => UpdateStatus::UpdatedNeedReboot,
            "UPDATE_STATUS_REPORTING_ERROR_EVENT" => UpdateStatus::ReportingErrorEvent,
            other => UpdateStatus::Other(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// MachineId
// ---------------------------------------------------------------------------

/// Durable identity of this host; names the lock holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub String);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MachineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MachineId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_known_names_and_defaults_on_empty() {
        assert_eq!("reboot".parse::<Strategy>().unwrap(), Strategy::Reboot);
        assert_eq!("etcd-lock".parse::<Strategy>().unwrap(), Strategy::EtcdLock);
        assert_eq!("best-effort".parse::<Strategy>().unwrap(), Strategy::BestEffort);
        assert_eq!("off".parse::<Strategy>().unwrap(), Strategy::Off);
        assert_eq!("".parse::<Strategy>().unwrap(), Strategy::BestEffort);
    }

    #[test]
    fn unknown_strategy_is_a_typed_error() {
        let err = "sometimes".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStrategy(ref s) if s == "sometimes"));
        assert_eq!(err.to_string(), "unknown strategy: sometimes");
    }

    #[test]
    fn strategy_display_round_trips_names() {
        for strategy in [
            Strategy::Reboot,
            Strategy::EtcdLock,
            Strategy::BestEffort,
            Strategy::Off,
        ] {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn update_status_recognises_need_reboot() {
        let status = UpdateStatus::from("UPDATE_STATUS_UPDATED_NEED_REBOOT\n");
        assert!(status.needs_reboot());
        assert!(!UpdateStatus::from("UPDATE_STATUS_IDLE").needs_reboot());
    }

    #[test]
    fn unknown_update_status_is_preserved() {
        let status = UpdateStatus::from("UPDATE_STATUS_ATTEMPTING_ROLLBACK");
        assert_eq!(
            status,
            UpdateStatus::Other("UPDATE_STATUS_ATTEMPTING_ROLLBACK".to_string())
        );
        assert_eq!(status.to_string(), "UPDATE_STATUS_ATTEMPTING_ROLLBACK");
        assert!(!status.needs_reboot());
    }
}
