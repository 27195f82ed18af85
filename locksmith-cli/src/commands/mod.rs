pub mod daemon;
pub mod lock;
pub mod status;

use anyhow::{Context, Result};

use locksmith_daemon::etcd::EtcdLockService;

use crate::Global;

/// Single-threaded runtime for one-shot store operations.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

pub(crate) fn etcd(global: &Global) -> Result<EtcdLockService> {
    EtcdLockService::new(global.endpoints.clone()).context("failed to configure etcd client")
}
