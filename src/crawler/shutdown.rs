//! Cooperative shutdown
//!
//! An interrupt does not cancel work in progress. It raises a flag that
//! workers poll at fixed checkpoints: before a fetch is dispatched, after a
//! failed attempt, and before anything is written. The signal handler then
//! makes sure the index reaches disk.

use crate::index::DedupIndex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Exit status used when a second interrupt forces the process down
const FORCED_EXIT_CODE: i32 = 130;

/// Cloneable, process-wide shutdown flag
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Installs the Ctrl+C handler
///
/// The first interrupt raises the shutdown flag and closes the index so no
/// recorded identifier can be lost. In-flight fetches finish on their own and
/// their results are discarded. A second interrupt exits immediately.
pub fn install_signal_handler(shutdown: Shutdown, index: Arc<DedupIndex>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Unable to listen for interrupt signals");
            return;
        }

        tracing::warn!("Interrupt received, letting in-flight fetches finish");
        shutdown.trigger();

        match index.close() {
            Ok(()) => tracing::info!("Index saved to {}", index.path().display()),
            Err(e) => tracing::error!("Failed to close index: {}", e),
        }

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Second interrupt received, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}
