//! Supervises server launch sequencing and runtime orchestration.

use std::env;
use std::sync::Arc;

use lotto_config::{RuntimePaths, ServerConfig};
use lotto_tickets::ThreadRandomGenerator;
use tracing::info;

use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::transport::{SocketListener, TicketConnectionHandler};

use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::probe::endpoint_in_use;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{DRAIN_GRACE, FOREGROUND_ENV_VAR, PROCESS_TARGET};

/// Launch mode for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal; used for debugging, supervisors, and
    /// tests.
    Foreground,
}

impl LaunchMode {
    /// Foreground when requested explicitly or through `LOTTOD_FOREGROUND`.
    #[must_use]
    pub fn detect(foreground_flag: bool) -> Self {
        if foreground_flag || env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// Process-level collaborators needed to control the server lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) mode: LaunchMode,
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service inputs required to run the server.
pub(crate) struct ServiceDeps {
    pub(crate) config: ServerConfig,
    pub(crate) reporter: Arc<dyn LifecycleReporter>,
}

/// Collaborators required to launch the server.
pub(crate) struct LaunchPlan<D, S> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps,
}

/// Runs the server with the production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError::AlreadyRunning`] when another instance holds the
/// runtime directory, [`LaunchError::AddressInUse`] when the endpoint is
/// taken, and other variants for filesystem, daemonisation, or socket
/// failures.
pub fn run_server(config: ServerConfig, mode: LaunchMode) -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            mode,
            daemonizer: SystemDaemonizer::new(),
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            config,
            reporter: Arc::new(StructuredLifecycleReporter::new()),
        },
    };
    run_server_with(plan)
}

/// Runs the server with injected collaborators.
pub(crate) fn run_server_with<D, S>(plan: LaunchPlan<D, S>) -> Result<(), LaunchError>
where
    D: Daemonizer,
    S: ShutdownSignal,
{
    let reporter = Arc::clone(&plan.services.reporter);
    let result = launch(plan);
    if let Err(error) = &result {
        reporter.failed(error);
    }
    result
}

fn launch<D, S>(plan: LaunchPlan<D, S>) -> Result<(), LaunchError>
where
    D: Daemonizer,
    S: ShutdownSignal,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        mode,
        daemonizer,
        shutdown,
    } = process;
    let ServiceDeps { config, reporter } = services;

    let endpoint = config.endpoint();
    reporter.starting(&endpoint, mode);
    let runtime_paths = RuntimePaths::from_config(&config)?;
    // A live instance is reported as such before its endpoint is probed. The
    // real bind happens after daemonising, so the probe surfaces an occupied
    // endpoint to the operator's terminal.
    let mut guard = ProcessGuard::acquire(runtime_paths)?;
    if let Some(addr) = endpoint_in_use(&endpoint) {
        return Err(LaunchError::AddressInUse { addr });
    }
    if mode == LaunchMode::Background {
        daemonizer.daemonize(guard.paths())?;
    }
    shutdown.arm()?;
    guard.write_pid(std::process::id())?;
    guard.write_health(HealthState::Starting)?;

    let listener = SocketListener::bind(&endpoint, config.backlog)?;
    let handler = Arc::new(TicketConnectionHandler::new(
        ThreadRandomGenerator,
        config.io_timeout(),
    ));
    let listener_handle = listener.start_supervised(handler, shutdown.trigger()?)?;
    guard.write_health(HealthState::Running)?;
    reporter.running(listener_handle.local_addr());

    let waited = shutdown.wait();
    guard.write_health(HealthState::Stopping)?;
    reporter.stopping();
    listener_handle.shutdown();
    let report = listener_handle.join_within(DRAIN_GRACE)?;
    waited?;
    reporter.stopped(&report);
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
