//! Liveness of the local coordination service.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ProbeError;

/// Units that indicate a local etcd member, checked in order.
pub const ETCD_SERVICES: &[&str] = &["etcd-member.service", "etcd.service", "etcd2.service"];

/// Reports whether any monitored coordination-service unit is running.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Name of the first active unit, `None` if all are inactive.
    async fn active_service(&self) -> Result<Option<String>, ProbeError>;

    /// Units checked by [`ServiceProbe::active_service`], for log messages.
    fn services(&self) -> Vec<String>;
}

/// Asks systemd for each unit's `ActiveState`.
#[derive(Debug, Clone)]
pub struct SystemdProbe {
    units: Vec<String>,
}

impl SystemdProbe {
    pub fn new(units: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            units: units.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for SystemdProbe {
    fn default() -> Self {
        Self::new(ETCD_SERVICES.iter().copied())
    }
}

#[async_trait]
impl ServiceProbe for SystemdProbe {
    async fn active_service(&self) -> Result<Option<String>, ProbeError> {
        for unit in &self.units {
            let output = Command::new("systemctl")
                .args(["show", "--property=ActiveState", "--value", unit])
                .output()
                .await
                .map_err(|err| ProbeError {
                    services: self.units.clone(),
                    reason: format!("cannot run systemctl: {err}"),
                })?;
            if !output.status.success() {
                tracing::debug!(unit = %unit, status = %output.status, "unit state query failed");
                continue;
            }
            let state = String::from_utf8_lossy(&output.stdout);
            if is_active_state(&state) {
                return Ok(Some(unit.clone()));
            }
        }
        Ok(None)
    }

    fn services(&self) -> Vec<String> {
        self.units.clone()
    }
}

/// Anything other than `inactive` counts as active, including transitional
/// and failed states.
fn is_active_state(state: &str) -> bool {
    let state = state.trim();
    !state.is_empty() && state != "inactive"
}
