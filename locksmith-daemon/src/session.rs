//! Session manager used to issue the reboot.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DaemonError;

#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Ask the system to reboot. With `interactive` false the request must
    /// not prompt for authorization.
    async fn reboot(&self, interactive: bool) -> Result<(), DaemonError>;
}

/// systemd-logind, driven through its command-line clients.
#[derive(Debug, Clone, Default)]
pub struct Logind;

impl Logind {
    /// Verify logind answers before handing out a client.
    pub async fn connect() -> Result<Self, DaemonError> {
        run("loginctl", &["--no-legend", "--no-pager", "list-sessions"])
            .await
            .map_err(|err| DaemonError::Connect {
                service: "login1",
                reason: err.to_string(),
            })?;
        Ok(Self)
    }
}

#[async_trait]
impl SessionManager for Logind {
    async fn reboot(&self, interactive: bool) -> Result<(), DaemonError> {
        let args: &[&str] = if interactive {
            &["reboot"]
        } else {
            &["reboot", "--no-ask-password"]
        };
        run("systemctl", args).await
    }
}

async fn run(program: &str, args: &[&str]) -> Result<(), DaemonError> {
    let command = format!("{program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|err| DaemonError::Command {
            command: command.clone(),
            reason: err.to_string(),
        })?;
    if output.status.success() {
        return Ok(());
    }
    Err(DaemonError::Command {
        command,
        reason: format!(
            "{}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
    })
}
