//! Process supervision test world shared across BDD scenarios.

use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lotto_config::{RuntimePaths, ServerConfig};
use serde_json::Value;
use tempfile::TempDir;

use crate::health::LifecycleReporter;
use crate::process::daemonizer::{DaemonizeError, Daemonizer};
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_server_with};
use crate::process::shutdown::{ShutdownError, ShutdownSignal, ShutdownTrigger};
use crate::process::{LaunchError, LaunchMode};

use super::RecordingLifecycleReporter;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub type StepResult = Result<(), String>;

pub struct ProcessTestWorld {
    _runtime: TempDir,
    config: ServerConfig,
    paths: RuntimePaths,
    reporter: Arc<RecordingLifecycleReporter>,
    daemonizer: TestDaemonizer,
    shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
    reserved: Option<TcpListener>,
    response: Option<String>,
}

impl ProcessTestWorld {
    pub fn new() -> Self {
        let runtime = tempfile::tempdir().expect("runtime dir");
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            runtime_dir: Some(runtime.path().to_path_buf()),
            io_timeout_secs: 2,
            ..ServerConfig::default()
        };
        let paths = RuntimePaths::from_config(&config).expect("runtime paths");
        Self {
            _runtime: runtime,
            config,
            paths,
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            daemonizer: TestDaemonizer::default(),
            shutdown: TestShutdownSignal::new(),
            handle: None,
            result: None,
            reserved: None,
            response: None,
        }
    }

    fn plan(
        &self,
        mode: LaunchMode,
        shutdown: TestShutdownSignal,
    ) -> LaunchPlan<TestDaemonizer, TestShutdownSignal> {
        LaunchPlan {
            process: ProcessControl {
                mode,
                daemonizer: self.daemonizer.clone(),
                shutdown,
            },
            services: ServiceDeps {
                config: self.config.clone(),
                reporter: Arc::clone(&self.reporter) as Arc<dyn LifecycleReporter>,
            },
        }
    }

    pub fn start_background(&mut self) -> StepResult {
        if self.handle.is_some() {
            return Err("server already running".to_owned());
        }
        let plan = self.plan(LaunchMode::Background, self.shutdown.clone());
        self.handle = Some(thread::spawn(move || run_server_with(plan)));
        Ok(())
    }

    /// Runs a foreground launch to completion on the calling thread. With
    /// `pretrigger` the shutdown request is already pending, so a successful
    /// launch returns as soon as the listener is up.
    pub fn start_foreground(&mut self, pretrigger: bool) -> StepResult {
        let shutdown = TestShutdownSignal::new();
        if pretrigger {
            shutdown.fire();
        }
        let result = run_server_with(self.plan(LaunchMode::Foreground, shutdown));
        self.result = Some(result);
        Ok(())
    }

    /// Runs a second foreground launch against the port the background server
    /// is listening on.
    pub fn start_foreground_on_live_port(&mut self) -> StepResult {
        let addr = self
            .reporter
            .running_addr()
            .ok_or_else(|| "server never reported a listening address".to_owned())?;
        let ephemeral = self.config.port;
        self.config.port = addr.port();
        let outcome = self.start_foreground(false);
        self.config.port = ephemeral;
        outcome
    }

    pub fn wait_for_status(&self, expected: &str) -> StepResult {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            let snapshot = self.read_health().ok();
            let status = snapshot
                .as_ref()
                .and_then(|value| value.get("status"))
                .and_then(Value::as_str);
            if status == Some(expected) {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(format!("server did not publish a {expected} health snapshot"))
    }

    pub fn join_background(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "server not running".to_owned())?;
        match handle.join() {
            Ok(result) => {
                self.result = Some(result);
                Ok(())
            }
            Err(_) => Err("server thread panicked".to_owned()),
        }
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.fire();
    }

    pub fn reserve_port(&mut self) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind reserved port");
        self.config.port = listener.local_addr().expect("reserved addr").port();
        self.reserved = Some(listener);
    }

    pub fn request(&mut self, line: &str) -> StepResult {
        let addr = self
            .reporter
            .running_addr()
            .ok_or_else(|| "server never reported a listening address".to_owned())?;
        let mut stream = TcpStream::connect(addr).map_err(|error| error.to_string())?;
        stream
            .write_all(format!("{line}\n").as_bytes())
            .map_err(|error| error.to_string())?;
        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .map_err(|error| error.to_string())?;
        self.response = Some(response);
        Ok(())
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn lock_path(&self) -> PathBuf {
        self.paths.lock_path().to_path_buf()
    }

    pub fn pid_path(&self) -> PathBuf {
        self.paths.pid_path().to_path_buf()
    }

    pub fn health_path(&self) -> PathBuf {
        self.paths.health_path().to_path_buf()
    }

    pub fn read_health(&self) -> Result<Value, String> {
        let content = fs::read_to_string(self.health_path()).map_err(|error| error.to_string())?;
        serde_json::from_str(&content).map_err(|error| error.to_string())
    }

    /// Leaves a lock and a marker naming a process that has already exited.
    pub fn write_stale_runtime(&self) -> StepResult {
        let mut child = Command::new("true").spawn().map_err(|error| error.to_string())?;
        let pid = child.id();
        child.wait().map_err(|error| error.to_string())?;
        fs::write(self.lock_path(), b"").map_err(|error| error.to_string())?;
        fs::write(self.pid_path(), format!("{pid}\n")).map_err(|error| error.to_string())?;
        Ok(())
    }

    pub fn daemonizer_calls(&self) -> usize {
        self.daemonizer.calls()
    }

    pub fn reporter(&self) -> &RecordingLifecycleReporter {
        &self.reporter
    }

    pub fn last_result(&self) -> Option<&Result<(), LaunchError>> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&LaunchError> {
        self.result.as_ref()?.as_ref().err()
    }
}

impl Default for ProcessTestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessTestWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown.fire();
            let _ = handle.join();
        }
    }
}

#[derive(Clone, Default)]
pub struct TestDaemonizer {
    calls: Arc<AtomicUsize>,
}

impl TestDaemonizer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for TestDaemonizer {
    fn daemonize(&self, _paths: &RuntimePaths) -> Result<(), DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
pub struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    fn fire(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn trigger(&self) -> Result<ShutdownTrigger, ShutdownError> {
        let shutdown = self.clone();
        Ok(Box::new(move || shutdown.fire()))
    }

    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(())
    }
}
