//! Structured reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use lotto_config::ListenEndpoint;

use crate::process::{LaunchError, LaunchMode};
use crate::transport::ReaperReport;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before the runtime directory is claimed.
    fn starting(&self, endpoint: &ListenEndpoint, mode: LaunchMode);

    /// Invoked once the listener accepts connections.
    fn running(&self, addr: SocketAddr);

    /// Invoked when a shutdown request has been received.
    fn stopping(&self);

    /// Invoked after every in-flight worker has been reaped.
    fn stopped(&self, report: &ReaperReport);

    /// Invoked when the launch or serving sequence fails.
    fn failed(&self, error: &LaunchError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn starting(&self, endpoint: &ListenEndpoint, mode: LaunchMode) {
        (**self).starting(endpoint, mode);
    }

    fn running(&self, addr: SocketAddr) {
        (**self).running(addr);
    }

    fn stopping(&self) {
        (**self).stopping();
    }

    fn stopped(&self, report: &ReaperReport) {
        (**self).stopped(report);
    }

    fn failed(&self, error: &LaunchError) {
        (**self).failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn starting(&self, endpoint: &ListenEndpoint, mode: LaunchMode) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "starting",
            endpoint = %endpoint,
            mode = ?mode,
            "starting ticket server"
        );
    }

    fn running(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "running",
            addr = %addr,
            pid = std::process::id(),
            "ticket server ready"
        );
    }

    fn stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "stopping",
            "draining in-flight workers"
        );
    }

    fn stopped(&self, report: &ReaperReport) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "stopped",
            reaped = report.reaped,
            panicked = report.panicked,
            "ticket server stopped"
        );
    }

    fn failed(&self, error: &LaunchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "failed",
            error = %error,
            "ticket server failed"
        );
    }
}
