//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use lotto_config::ListenEndpoint;

use crate::health::LifecycleReporter;
use crate::process::{LaunchError, LaunchMode};
use crate::transport::ReaperReport;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Starting(LaunchMode),
    Running(SocketAddr),
    Stopping,
    Stopped(ReaperReport),
    Failed(String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// Address announced by the most recent `running` event.
    pub fn running_addr(&self) -> Option<SocketAddr> {
        self.events().iter().rev().find_map(|event| match event {
            LifecycleEvent::Running(addr) => Some(*addr),
            _ => None,
        })
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn starting(&self, _endpoint: &ListenEndpoint, mode: LaunchMode) {
        self.record(LifecycleEvent::Starting(mode));
    }

    fn running(&self, addr: SocketAddr) {
        self.record(LifecycleEvent::Running(addr));
    }

    fn stopping(&self) {
        self.record(LifecycleEvent::Stopping);
    }

    fn stopped(&self, report: &ReaperReport) {
        self.record(LifecycleEvent::Stopped(*report));
    }

    fn failed(&self, error: &LaunchError) {
        self.record(LifecycleEvent::Failed(error.to_string()));
    }
}
