//! Termination signal handling.
//!
//! The Ctrl+C handler does nothing but flip a notifier; the hook value is
//! passed to whoever owns the cleanup path rather than living in a global
//! registry, so a future second session cannot trample the first.
//!
//! The handoff is a [`Notify`] rather than a blocking channel recv: an
//! abandoned `wait()` must leave nothing behind that could keep the
//! runtime from shutting down when the session ends without a signal.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Notify;

/// Handle to an installed termination-signal subscription.
pub struct ShutdownHook {
    signal: Arc<Notify>,
}

impl ShutdownHook {
    /// Install the process signal handler. Call once, before any blocking
    /// operation starts.
    pub fn install() -> Result<Self> {
        let signal = Arc::new(Notify::new());
        let notifier = signal.clone();
        // Duplicate signals collapse into the one stored permit.
        ctrlc::set_handler(move || notifier.notify_one())
            .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;
        Ok(Self { signal })
    }

    /// Suspend until a termination signal arrives. A signal delivered
    /// before the first call is not lost.
    pub async fn wait(&self) {
        self.signal.notified().await;
    }
}
