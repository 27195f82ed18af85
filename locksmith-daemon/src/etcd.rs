//! Reboot semaphore stored in an etcd v2 key space.
//!
//! The key holds `{"semaphore":N,"max":M,"holders":[...]}`. Every mutation
//! is a read followed by a compare-and-swap on `modifiedIndex`; losing the
//! race surfaces as a backend error and the caller retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use locksmith_core::MachineId;

use crate::error::{DaemonError, LockError};
use crate::lock::LockService;

pub const SEMAPHORE_KEY: &str = "coreos.com/updateengine/rebootlock/semaphore";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2379";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ERROR_KEY_NOT_FOUND: u64 = 100;
const ERROR_TEST_FAILED: u64 = 101;
const ERROR_NODE_EXIST: u64 = 105;

/// Counting semaphore shared by the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semaphore {
    /// Free slots.
    pub semaphore: i64,
    /// Total slots.
    pub max: i64,
    #[serde(default)]
    pub holders: Vec<MachineId>,
}

impl Default for Semaphore {
    fn default() -> Self {
        Self {
            semaphore: 1,
            max: 1,
            holders: Vec::new(),
        }
    }
}

impl Semaphore {
    pub fn lock(&mut self, holder: &MachineId) -> Result<(), LockError> {
        if self.holders.contains(holder) {
            return Err(LockError::AlreadyHeld(holder.clone()));
        }
        if self.semaphore <= 0 {
            return Err(LockError::Backend("semaphore is at 0".to_string()));
        }
        self.semaphore -= 1;
        self.holders.push(holder.clone());
        Ok(())
    }

    pub fn unlock(&mut self, holder: &MachineId) -> Result<(), LockError> {
        let Some(pos) = self.holders.iter().position(|h| h == holder) else {
            return Err(LockError::NotHeld(holder.clone()));
        };
        self.holders.remove(pos);
        self.semaphore += 1;
        Ok(())
    }

    /// Change the slot count; free slots move by the same delta.
    pub fn set_max(&mut self, max: i64) {
        self.semaphore += max - self.max;
        self.max = max;
    }
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    node: KeyNode,
}

#[derive(Debug, Deserialize)]
struct KeyNode {
    value: String,
    #[serde(rename = "modifiedIndex")]
    modified_index: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorCode")]
    error_code: u64,
    #[serde(default)]
    message: String,
}

/// HTTP client for the semaphore key. Endpoints are tried in order until
/// one answers.
#[derive(Clone)]
pub struct EtcdLockService {
    endpoints: Vec<String>,
    agent: ureq::Agent,
}

impl EtcdLockService {
    pub fn new(endpoints: Vec<String>) -> Result<Self, DaemonError> {
        if endpoints.is_empty() {
            return Err(DaemonError::Connect {
                service: "etcd",
                reason: "no endpoints configured".to_string(),
            });
        }
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Ok(Self { endpoints, agent })
    }

    /// Split a comma-separated endpoint list.
    pub fn parse_endpoints(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|e| e.trim().trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Current semaphore contents, creating the key if it does not exist.
    pub async fn semaphore(&self) -> Result<Semaphore, LockError> {
        self.blocking(|etcd| etcd.load().map(|(sem, _)| sem)).await
    }

    /// Set the number of concurrent holders; returns the previous maximum.
    pub async fn set_max(&self, max: i64) -> Result<i64, LockError> {
        self.blocking(move |etcd| {
            let mut previous = 0;
            etcd.update(|sem| {
                previous = sem.max;
                sem.set_max(max);
                Ok(())
            })?;
            Ok(previous)
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, LockError>
    where
        T: Send + 'static,
        F: FnOnce(EtcdLockService) -> Result<T, LockError> + Send + 'static,
    {
        let etcd = self.clone();
        tokio::task::spawn_blocking(move || f(etcd))
            .await
            .map_err(|err| LockError::Backend(format!("etcd task join error: {err}")))?
    }

    /// Run `request` against each endpoint until one is reachable.
    fn on_any_endpoint<T>(
        &self,
        request: impl Fn(&str) -> Result<T, ureq::Error>,
    ) -> Result<T, EtcdFailure> {
        let mut last = EtcdFailure::Unreachable("no endpoints configured".to_string());
        for endpoint in &self.endpoints {
            match request(endpoint) {
                Ok(value) => return Ok(value),
                Err(ureq::Error::Transport(transport)) => {
                    tracing::debug!(endpoint = %endpoint, error = %transport, "etcd endpoint unreachable");
                    last = EtcdFailure::Unreachable(transport.to_string());
                }
                Err(err) => return Err(EtcdFailure::from(err)),
            }
        }
        Err(last)
    }

    fn ping_blocking(&self) -> Result<(), LockError> {
        self.on_any_endpoint(|endpoint| self.agent.get(&format!("{endpoint}/version")).call())
            .map(|_| ())
            .map_err(LockError::from)
    }

    fn fetch(&self) -> Result<Option<(Semaphore, u64)>, LockError> {
        match self.on_any_endpoint(|endpoint| self.agent.get(&key_url(endpoint)).call()) {
            Ok(response) => {
                let body: KeyResponse = response.into_json().map_err(|err| {
                    LockError::Backend(format!("invalid etcd response: {err}"))
                })?;
                let sem: Semaphore = serde_json::from_str(&body.node.value).map_err(|err| {
                    LockError::Backend(format!("invalid semaphore value: {err}"))
                })?;
                Ok(Some((sem, body.node.modified_index)))
            }
            Err(err) if err.code() == Some(ERROR_KEY_NOT_FOUND) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn create_default(&self) -> Result<(), LockError> {
        let value = encode(&Semaphore::default())?;
        let created = self.on_any_endpoint(|endpoint| {
            self.agent
                .put(&key_url(endpoint))
                .send_form(&[("value", value.as_str()), ("prevExist", "false")])
        });
        match created {
            Ok(_) => {
                tracing::info!(key = SEMAPHORE_KEY, "initialized reboot semaphore");
                Ok(())
            }
            Err(err) if err.code() == Some(ERROR_NODE_EXIST) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn load(&self) -> Result<(Semaphore, u64), LockError> {
        if let Some(found) = self.fetch()? {
            return Ok(found);
        }
        self.create_default()?;
        self.fetch()?
            .ok_or_else(|| LockError::Backend("semaphore key vanished after creation".to_string()))
    }

    fn store(&self, sem: &Semaphore, index: u64) -> Result<(), LockError> {
        let value = encode(sem)?;
        let index = index.to_string();
        let stored = self.on_any_endpoint(|endpoint| {
            self.agent
                .put(&key_url(endpoint))
                .send_form(&[("value", value.as_str()), ("prevIndex", index.as_str())])
        });
        match stored {
            Ok(_) => Ok(()),
            Err(err) if err.code() == Some(ERROR_TEST_FAILED) => Err(LockError::Backend(
                "semaphore was modified concurrently".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn update(
        &self,
        change: impl FnOnce(&mut Semaphore) -> Result<(), LockError>,
    ) -> Result<(), LockError> {
        let (mut sem, index) = self.load()?;
        change(&mut sem)?;
        self.store(&sem, index)
    }
}

#[async_trait]
impl LockService for EtcdLockService {
    async fn ping(&self) -> Result<(), LockError> {
        self.blocking(|etcd| etcd.ping_blocking()).await
    }

    async fn acquire(&self, holder: &MachineId) -> Result<(), LockError> {
        let holder = holder.clone();
        self.blocking(move |etcd| etcd.update(|sem| sem.lock(&holder)))
            .await
    }

    async fn release(&self, holder: &MachineId) -> Result<(), LockError> {
        let holder = holder.clone();
        self.blocking(move |etcd| etcd.update(|sem| sem.unlock(&holder)))
            .await
    }
}

fn key_url(endpoint: &str) -> String {
    format!("{endpoint}/v2/keys/{SEMAPHORE_KEY}")
}

fn encode(sem: &Semaphore) -> Result<String, LockError> {
    serde_json::to_string(sem)
        .map_err(|err| LockError::Backend(format!("cannot encode semaphore: {err}")))
}

/// A failed etcd request, with the response body already consumed.
#[derive(Debug)]
enum EtcdFailure {
    Status {
        status: u16,
        code: Option<u64>,
        message: String,
    },
    Unreachable(String),
}

impl EtcdFailure {
    fn code(&self) -> Option<u64> {
        match self {
            EtcdFailure::Status { code, .. } => *code,
            EtcdFailure::Unreachable(_) => None,
        }
    }
}

impl From<ureq::Error> for EtcdFailure {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                match serde_json::from_str::<ErrorBody>(&body) {
                    Ok(parsed) => EtcdFailure::Status {
                        status,
                        code: Some(parsed.error_code),
                        message: parsed.message,
                    },
                    Err(_) => EtcdFailure::Status {
                        status,
                        code: None,
                        message: body,
                    },
                }
            }
            ureq::Error::Transport(transport) => EtcdFailure::Unreachable(transport.to_string()),
        }
    }
}

impl From<EtcdFailure> for LockError {
    fn from(failure: EtcdFailure) -> Self {
        match failure {
            EtcdFailure::Status {
                status, message, ..
            } => LockError::Backend(format!("etcd returned {status}: {message}")),
            EtcdFailure::Unreachable(reason) => {
                LockError::Backend(format!("etcd unreachable: {reason}"))
            }
        }
    }
}
