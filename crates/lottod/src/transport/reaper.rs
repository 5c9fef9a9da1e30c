//! Observes and joins terminated workers.
//!
//! The reaper is the sole owner of worker records. It blocks on the completion
//! channel, and after every event sweeps whatever else is already queued so a
//! burst of exits is handled in one pass. An exit may overtake the matching
//! spawn notice, so exits without a record are parked until the record
//! arrives. The thread ends once every sender (the dispatcher and each live
//! worker) has gone.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::LISTENER_TARGET;
use super::dispatch::{WorkerEvent, WorkerId, WorkerOutcome, WorkerStats};

/// Summary returned once the reaper has drained every worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaperReport {
    /// Workers observed and joined.
    pub reaped: u64,
    /// Reaped workers that terminated by panicking.
    pub panicked: u64,
}

pub(crate) fn spawn(
    events: Receiver<WorkerEvent>,
    stats: Arc<WorkerStats>,
) -> io::Result<JoinHandle<ReaperReport>> {
    thread::Builder::new()
        .name("lottod-reaper".to_owned())
        .spawn(move || Reaper::new(stats).run(&events))
}

struct Reaper {
    running: HashMap<WorkerId, JoinHandle<()>>,
    exited_early: HashMap<WorkerId, WorkerOutcome>,
    stats: Arc<WorkerStats>,
    report: ReaperReport,
}

impl Reaper {
    fn new(stats: Arc<WorkerStats>) -> Self {
        Self {
            running: HashMap::new(),
            exited_early: HashMap::new(),
            stats,
            report: ReaperReport::default(),
        }
    }

    fn run(mut self, events: &Receiver<WorkerEvent>) -> ReaperReport {
        while let Ok(event) = events.recv() {
            self.observe(event);
            while let Ok(queued) = events.try_recv() {
                self.observe(queued);
            }
        }
        self.drain_leftovers();
        info!(
            target: LISTENER_TARGET,
            reaped = self.report.reaped,
            panicked = self.report.panicked,
            "reaper finished"
        );
        self.report
    }

    fn observe(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Spawned { id, handle } => match self.exited_early.remove(&id) {
                Some(outcome) => self.reap(id, handle, outcome),
                None => {
                    self.running.insert(id, handle);
                }
            },
            WorkerEvent::Exited { id, outcome } => match self.running.remove(&id) {
                Some(handle) => self.reap(id, handle, outcome),
                None => {
                    self.exited_early.insert(id, outcome);
                }
            },
        }
    }

    fn reap(&mut self, id: WorkerId, handle: JoinHandle<()>, outcome: WorkerOutcome) {
        let joined_cleanly = handle.join().is_ok();
        let panicked = outcome == WorkerOutcome::Panicked || !joined_cleanly;
        self.report.reaped += 1;
        if panicked {
            self.report.panicked += 1;
            warn!(target: LISTENER_TARGET, worker = %id, "worker panicked");
        } else {
            debug!(target: LISTENER_TARGET, worker = %id, "worker reaped");
        }
        self.stats.record_reaped();
    }

    /// Every sender is gone, so each worker has already reported its exit;
    /// anything left here lost its notice and is joined directly.
    fn drain_leftovers(&mut self) {
        let leftovers: Vec<_> = self.running.drain().collect();
        for (id, handle) in leftovers {
            warn!(
                target: LISTENER_TARGET,
                worker = %id,
                "worker exit was not reported; joining directly"
            );
            self.reap(id, handle, WorkerOutcome::Completed);
        }
        for id in self.exited_early.keys() {
            warn!(
                target: LISTENER_TARGET,
                worker = %id,
                "exit reported for unknown worker"
            );
        }
    }
}
