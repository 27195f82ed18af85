//! System update status source.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc};

use locksmith_core::UpdateStatus;

use crate::error::DaemonError;
use crate::paths::STATUS_POLL_INTERVAL;

const UPDATE_ENGINE_CLIENT: &str = "update_engine_client";

/// Reports whether an applied update is waiting for a reboot.
#[async_trait]
pub trait UpdateStatusSource: Send + Sync {
    async fn status(&self) -> Result<UpdateStatus, DaemonError>;

    /// Send every status change on `tx` until `stop` fires or the receiver
    /// goes away.
    async fn watch(&self, tx: mpsc::Sender<UpdateStatus>, stop: broadcast::Receiver<()>);
}

/// Reads status from `update_engine_client -status`.
#[derive(Debug, Clone)]
pub struct UpdateEngineClient {
    poll_interval: Duration,
}

impl UpdateEngineClient {
    /// Verify the update engine answers before handing out a client.
    pub async fn connect() -> Result<Self, DaemonError> {
        let client = Self {
            poll_interval: STATUS_POLL_INTERVAL,
        };
        client.status().await.map_err(|err| DaemonError::Connect {
            service: "update engine",
            reason: err.to_string(),
        })?;
        Ok(client)
    }
}

#[async_trait]
impl UpdateStatusSource for UpdateEngineClient {
    async fn status(&self) -> Result<UpdateStatus, DaemonError> {
        let output = Command::new(UPDATE_ENGINE_CLIENT)
            .arg("-status")
            .output()
            .await
            .map_err(|err| DaemonError::Command {
                command: UPDATE_ENGINE_CLIENT.to_string(),
                reason: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(DaemonError::Command {
                command: UPDATE_ENGINE_CLIENT.to_string(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        parse_current_op(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            DaemonError::Command {
                command: UPDATE_ENGINE_CLIENT.to_string(),
                reason: "no CURRENT_OP in status output".to_string(),
            }
        })
    }

    async fn watch(&self, tx: mpsc::Sender<UpdateStatus>, mut stop: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last: Option<UpdateStatus> = None;

        loop {
            tokio::select! {
                _ = stop.recv() => break,
                _ = interval.tick() => {
                    let status = match self.status().await {
                        Ok(status) => status,
                        Err(err) => {
                            tracing::warn!(error = %err, "update status poll failed");
                            continue;
                        }
                    };
                    if last.as_ref() == Some(&status) {
                        continue;
                    }
                    last = Some(status.clone());
                    if tx.send(status).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Extract `CURRENT_OP=` from `KEY=VALUE` status lines.
fn parse_current_op(output: &str) -> Option<UpdateStatus> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("CURRENT_OP="))
        .map(UpdateStatus::from)
}
