//! Test harness utilities for the server behavioural suites.

mod process_world;
mod reporter;

pub use process_world::{ProcessTestWorld, StepResult};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
