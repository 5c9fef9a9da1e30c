use std::io;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::OnceCell;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Wakes a pending or future [`ShutdownSignal::wait`] from another thread.
pub type ShutdownTrigger = Box<dyn FnOnce() + Send>;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Starts queueing shutdown requests. Called in the final server
    /// process, before the PID marker is published.
    fn arm(&self) -> Result<(), ShutdownError> {
        Ok(())
    }

    /// Returns a trigger that ends the wait without an external request,
    /// used when the server cannot keep serving.
    fn trigger(&self) -> Result<ShutdownTrigger, ShutdownError>;

    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener for SIGTERM, SIGINT, SIGQUIT, and SIGHUP.
///
/// Once armed, a signal delivered before [`ShutdownSignal::wait`] is queued
/// instead of terminating the process.
#[derive(Default)]
pub struct SystemShutdownSignal {
    armed: OnceCell<Armed>,
}

struct Armed {
    signals: Mutex<Signals>,
    handle: Handle,
}

impl SystemShutdownSignal {
    /// Builds an unarmed listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn armed(&self) -> Result<&Armed, ShutdownError> {
        self.armed.get_or_try_init(|| {
            let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
                .map_err(|source| ShutdownError::Install { source })?;
            let handle = signals.handle();
            Ok(Armed {
                signals: Mutex::new(signals),
                handle,
            })
        })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn arm(&self) -> Result<(), ShutdownError> {
        self.armed().map(|_| ())
    }

    fn trigger(&self) -> Result<ShutdownTrigger, ShutdownError> {
        let handle = self.armed()?.handle.clone();
        Ok(Box::new(move || handle.close()))
    }

    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = self
            .armed()?
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match signals.forever().next() {
            Some(signal) => info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received"
            ),
            None => info!(
                target: PROCESS_TARGET,
                "shutdown requested internally"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn trigger_ends_a_pending_wait() {
        let shutdown = Arc::new(SystemShutdownSignal::new());
        shutdown.arm().expect("arm signal handlers");
        let trigger = shutdown.trigger().expect("shutdown trigger");
        let (done_tx, done_rx) = mpsc::channel();
        let waiter = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                let outcome = shutdown.wait();
                done_tx.send(()).expect("report wait completion");
                outcome
            })
        };

        trigger();

        done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("wait should return once triggered");
        waiter
            .join()
            .expect("join waiter")
            .expect("wait completes cleanly");
    }
}
