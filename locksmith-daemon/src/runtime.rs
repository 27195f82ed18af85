use std::convert::Infallible;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc};

use locksmith_core::{Strategy, UpdateStatus};

use crate::broadcast::{Broadcaster, UtmpBroadcaster};
use crate::config::{DaemonConfig, DaemonSettings};
use crate::error::DaemonError;
use crate::etcd::EtcdLockService;
use crate::executor::Rebooter;
use crate::gate::LockGate;
use crate::lock::{LockService, LockSetup, NoLockService};
use crate::probe::{ServiceProbe, SystemdProbe};
use crate::reaper::Reaper;
use crate::session::{Logind, SessionManager};
use crate::update::{UpdateEngineClient, UpdateStatusSource};

/// Everything the coordinator talks to outside this process.
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn ServiceProbe>,
    pub locks: LockSetup,
    pub updates: Arc<dyn UpdateStatusSource>,
    pub session: Arc<dyn SessionManager>,
    pub notifier: Arc<dyn Broadcaster>,
}

impl Collaborators {
    /// Connect to the host services. Failing to reach the update engine or
    /// logind is fatal. The etcd client is only built for strategies that
    /// can take the lock.
    pub async fn connect(
        strategy: Strategy,
        settings: &DaemonSettings,
    ) -> Result<Self, DaemonError> {
        let updates = UpdateEngineClient::connect().await?;
        let session = Logind::connect().await?;
        let store: Arc<dyn LockService> = match strategy {
            Strategy::Reboot => Arc::new(NoLockService),
            _ => Arc::new(EtcdLockService::new(settings.endpoints.clone())?),
        };
        Ok(Self {
            probe: Arc::new(SystemdProbe::default()),
            locks: LockSetup::new(store, settings.root.clone()),
            updates: Arc::new(updates),
            session: Arc::new(session),
            notifier: Arc::new(UtmpBroadcaster::default()),
        })
    }
}

/// Start the daemon and block the current thread.
///
/// Returns `Ok` only for the `off` strategy. Every other exit is an error.
pub fn start_blocking(settings: DaemonSettings) -> Result<(), DaemonError> {
    init_tracing();

    let Some(config) = DaemonConfig::resolve(&settings)? else {
        tracing::info!(strategy = %Strategy::Off, "reboot strategy is off, shutting down");
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| DaemonError::Io {
            context: "tokio-runtime",
            source,
        })?;
    match runtime.block_on(run(config, settings))? {}
}

/// Install the signal handler, connect collaborators and coordinate.
pub async fn run(
    config: DaemonConfig,
    settings: DaemonSettings,
) -> Result<Infallible, DaemonError> {
    install_signal_handler()?;
    let collaborators = Collaborators::connect(config.strategy, &settings).await?;
    coordinate(config, collaborators).await
}

/// Wait until an update needs a reboot, then hand off to the executor.
///
/// The stale-lock reaper runs alongside the wait (except for the `reboot`
/// strategy) and is stopped and joined before the executor touches the lock.
pub async fn coordinate(
    config: DaemonConfig,
    collaborators: Collaborators,
) -> Result<Infallible, DaemonError> {
    let Collaborators {
        probe,
        locks,
        updates,
        session,
        notifier,
    } = collaborators;

    let (stop_tx, _) = broadcast::channel::<()>(1);

    let reaper_handle = (config.strategy != Strategy::Reboot).then(|| {
        let reaper = Reaper::new(config.strategy, probe.clone(), locks.clone());
        tokio::spawn(reaper.run(stop_tx.subscribe()))
    });

    let (status_tx, mut status_rx) = mpsc::channel::<UpdateStatus>(1);
    {
        let updates = updates.clone();
        let stop = stop_tx.subscribe();
        tokio::spawn(async move { updates.watch(status_tx, stop).await });
    }

    let current = updates.status().await?;
    tracing::info!(
        current_operation = %current,
        strategy = %config.strategy,
        "locksmithd starting",
    );

    if !current.needs_reboot() {
        wait_for_reboot_needed(&mut status_rx).await?;
    }

    let _ = stop_tx.send(());
    if let Some(handle) = reaper_handle {
        let outcome = handle.await.map_err(|err| DaemonError::Join {
            task: "reaper",
            reason: err.to_string(),
        })?;
        tracing::debug!(outcome = ?outcome, "stale lock reaper finished");
    }

    if let Some(window) = config.window {
        let wait = window.duration_to_start(chrono::Local::now().naive_local());
        if !wait.is_zero() {
            tracing::info!(window = %window, wait = ?wait, "waiting for reboot window");
            tokio::time::sleep(wait).await;
        }
    }

    let gate = LockGate::new(config.strategy, probe);
    Rebooter::new(gate, locks, session, notifier).reboot().await
}

async fn wait_for_reboot_needed(
    status_rx: &mut mpsc::Receiver<UpdateStatus>,
) -> Result<(), DaemonError> {
    while let Some(status) = status_rx.recv().await {
        tracing::debug!(current_operation = %status, "update status changed");
        if status.needs_reboot() {
            return Ok(());
        }
    }
    Err(DaemonError::ChannelClosed("update status"))
}

/// Exit with status 0 on SIGINT or SIGTERM, without draining anything.
fn install_signal_handler() -> Result<(), DaemonError> {
    let mut terminate = signal(SignalKind::terminate()).map_err(|source| DaemonError::Io {
        context: "installing SIGTERM handler",
        source,
    })?;
    let mut interrupt = signal(SignalKind::interrupt()).map_err(|source| DaemonError::Io {
        context: "installing SIGINT handler",
        source,
    })?;

    tokio::spawn(async move {
        tokio::select! {
            _ = terminate.recv() => {}
            _ = interrupt.recv() => {}
        }
        tracing::info!("received interrupt/termination signal, shutting down");
        std::process::exit(0);
    });
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
