//! In-memory collaborators that record every call in a shared journal.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{broadcast, mpsc};

use locksmith_core::{MachineId, UpdateStatus};
use locksmith_daemon::broadcast::Broadcaster;
use locksmith_daemon::probe::ServiceProbe;
use locksmith_daemon::session::SessionManager;
use locksmith_daemon::update::UpdateStatusSource;
use locksmith_daemon::{
    Collaborators, DaemonError, LockError, LockService, LockSetup, ProbeError,
};

pub const MACHINE_ID: &str = "5d1c0ffee0ddf00d5d1c0ffee0ddf00d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Probe,
    Ping,
    Acquire,
    Release,
    Status,
    Broadcast,
    Reboot { interactive: bool },
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn record(&self, event: Event) {
        self.0.lock().expect("journal lock").push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().expect("journal lock").clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// A root directory with `etc/machine-id` populated.
pub fn machine_root() -> TempDir {
    let root = TempDir::new().expect("root");
    fs::create_dir_all(root.path().join("etc")).expect("mkdir etc");
    fs::write(root.path().join("etc/machine-id"), format!("{MACHINE_ID}\n"))
        .expect("write machine-id");
    root
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

pub enum ProbeState {
    Active(&'static str),
    Inactive,
    Broken,
}

pub struct FakeProbe {
    pub journal: Journal,
    pub state: ProbeState,
}

#[async_trait]
impl ServiceProbe for FakeProbe {
    async fn active_service(&self) -> Result<Option<String>, ProbeError> {
        self.journal.record(Event::Probe);
        match self.state {
            ProbeState::Active(name) => Ok(Some(name.to_string())),
            ProbeState::Inactive => Ok(None),
            ProbeState::Broken => Err(ProbeError {
                services: self.services(),
                reason: "system bus unavailable".to_string(),
            }),
        }
    }

    fn services(&self) -> Vec<String> {
        vec!["etcd.service".to_string()]
    }
}

// ---------------------------------------------------------------------------
// Lock service
// ---------------------------------------------------------------------------

/// Scripted lock store. Once a script runs dry, acquire succeeds and
/// release reports `NotHeld`.
pub struct FakeLocks {
    pub journal: Journal,
    pub reachable: bool,
    acquire: Mutex<VecDeque<Result<(), LockError>>>,
    release: Mutex<VecDeque<Result<(), LockError>>>,
}

impl FakeLocks {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            reachable: true,
            acquire: Mutex::new(VecDeque::new()),
            release: Mutex::new(VecDeque::new()),
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn acquire_script(self, script: impl IntoIterator<Item = Result<(), LockError>>) -> Self {
        self.acquire.lock().expect("script").extend(script);
        self
    }

    pub fn release_script(self, script: impl IntoIterator<Item = Result<(), LockError>>) -> Self {
        self.release.lock().expect("script").extend(script);
        self
    }
}

pub fn backend(msg: &str) -> LockError {
    LockError::Backend(msg.to_string())
}

#[async_trait]
impl LockService for FakeLocks {
    async fn ping(&self) -> Result<(), LockError> {
        self.journal.record(Event::Ping);
        if self.reachable {
            Ok(())
        } else {
            Err(backend("connection refused"))
        }
    }

    async fn acquire(&self, _holder: &MachineId) -> Result<(), LockError> {
        self.journal.record(Event::Acquire);
        self.acquire
            .lock()
            .expect("script")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn release(&self, holder: &MachineId) -> Result<(), LockError> {
        self.journal.record(Event::Release);
        self.release
            .lock()
            .expect("script")
            .pop_front()
            .unwrap_or_else(|| Err(LockError::NotHeld(holder.clone())))
    }
}

// ---------------------------------------------------------------------------
// Update status, session, broadcast
// ---------------------------------------------------------------------------

pub struct FakeUpdates {
    pub journal: Journal,
    pub initial: UpdateStatus,
    /// Changes delivered by `watch`, each after its delay.
    pub changes: Vec<(Duration, UpdateStatus)>,
    /// Drop the sender once all changes are delivered.
    pub close_after_changes: bool,
}

impl FakeUpdates {
    pub fn already(journal: Journal, status: UpdateStatus) -> Self {
        Self {
            journal,
            initial: status,
            changes: Vec::new(),
            close_after_changes: false,
        }
    }
}

#[async_trait]
impl UpdateStatusSource for FakeUpdates {
    async fn status(&self) -> Result<UpdateStatus, DaemonError> {
        self.journal.record(Event::Status);
        Ok(self.initial.clone())
    }

    async fn watch(&self, tx: mpsc::Sender<UpdateStatus>, mut stop: broadcast::Receiver<()>) {
        for (delay, status) in &self.changes {
            tokio::select! {
                _ = stop.recv() => return,
                _ = tokio::time::sleep(*delay) => {}
            }
            if tx.send(status.clone()).await.is_err() {
                return;
            }
        }
        if self.close_after_changes {
            return;
        }
        let _ = stop.recv().await;
    }
}

pub struct FakeSession {
    pub journal: Journal,
}

#[async_trait]
impl SessionManager for FakeSession {
    async fn reboot(&self, interactive: bool) -> Result<(), DaemonError> {
        self.journal.record(Event::Reboot { interactive });
        Ok(())
    }
}

pub struct FakeBroadcaster {
    pub journal: Journal,
    pub terminals: usize,
}

impl Broadcaster for FakeBroadcaster {
    fn broadcast(&self, _msg: &str) -> usize {
        self.journal.record(Event::Broadcast);
        self.terminals
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub struct Harness {
    pub journal: Journal,
    pub root: TempDir,
    pub probe: ProbeState,
    pub locks: FakeLocks,
    pub updates: FakeUpdates,
    pub terminals: usize,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            root: machine_root(),
            probe: ProbeState::Inactive,
            locks: FakeLocks::new(journal.clone()),
            updates: FakeUpdates::already(journal.clone(), UpdateStatus::UpdatedNeedReboot),
            terminals: 0,
            journal,
        }
    }

    pub fn lock_setup(locks: FakeLocks, root: &TempDir) -> LockSetup {
        LockSetup::new(Arc::new(locks), root.path())
    }

    /// Split into collaborators plus the pieces the test keeps.
    pub fn build(self) -> (Collaborators, Journal, TempDir) {
        let journal = self.journal;
        let collaborators = Collaborators {
            probe: Arc::new(FakeProbe {
                journal: journal.clone(),
                state: self.probe,
            }),
            locks: LockSetup::new(Arc::new(self.locks), self.root.path()),
            updates: Arc::new(self.updates),
            session: Arc::new(FakeSession {
                journal: journal.clone(),
            }),
            notifier: Arc::new(FakeBroadcaster {
                journal: journal.clone(),
                terminals: self.terminals,
            }),
        };
        (collaborators, journal, self.root)
    }
}
