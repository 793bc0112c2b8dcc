//! In-process execution host
//!
//! Runs assembled programs in boa_engine (pure Rust JavaScript engine). Every
//! load gets a fresh `Context` on its own worker thread, so nothing survives
//! from one session to the next, and the host waits at most `timeout_ms` for
//! the harness to settle.
//!
//! The worker evaluates in budgeted slices and checks its stop conditions
//! between slices, so a timed-out or destroyed sandbox stops executing and
//! its thread exits instead of spinning on.

use boa_engine::{Context, Script, Source};
use serde::Deserialize;
use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{self, Poll, Wake, Waker};
use std::thread;
use std::time::{Duration, Instant};

use super::harness::HarnessReport;
use super::LoadRequest;
use crate::constants::sandbox::DEFAULT_TIMEOUT_MS;
use crate::error::SandboxLoadError;

/// Loop iterations a program may run before the engine aborts it
const LOOP_ITERATION_LIMIT: u64 = 1_000_000;

/// Instruction cost the engine runs between two checks of the stop conditions
const SLICE_BUDGET: u32 = 4_096;

/// Globals a browser would provide, plus the host side of the harness
const PRELUDE: &str = r#"var window = globalThis;
var self = globalThis;
var console = { log: function () {}, info: function () {}, warn: function () {}, error: function () {}, debug: function () {} };
var setTimeout = function () { return 0; };
var clearTimeout = function () {};
var setInterval = function () { return 0; };
var clearInterval = function () {};
var requestAnimationFrame = function () { return 0; };
var cancelAnimationFrame = function () {};
var __forge_host = {
  root: { html: '' },
  last: null,
  mount: function (markup) { this.root.html = markup; },
  report: function (report) { this.last = report; }
};
"#;

/// Final expression of every evaluated program
const SETTLE_EXPR: &str =
    "\nJSON.stringify({ report: __forge_host.last, root: __forge_host.root.html });\n";

/// Something that can load an assembled program and wait for it to settle
pub trait ExecutionHost: Send + Sync {
    /// Short host name for logs
    fn name(&self) -> &'static str;

    /// Load the request's program into a fresh context and return the harness
    /// report. Hosts stop early once the request is cancelled.
    fn execute(&self, request: &LoadRequest) -> Result<HarnessReport, SandboxLoadError>;
}

#[derive(Deserialize)]
struct Settled {
    report: Option<HarnessReport>,
    root: String,
}

/// Why a worker gave up on its program
enum WorkerError {
    Script(String),
    Cancelled,
    Stopped,
}

/// Marks the worker finished however it leaves, panics included
struct WorkerGuard {
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicBool>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.store(true, Ordering::SeqCst);
    }
}

/// The worker polls the evaluation itself, so wake-ups carry no information
struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

/// boa_engine backed host
#[derive(Debug, Clone)]
pub struct BoaHost {
    timeout_ms: u64,
    active: Arc<AtomicUsize>,
}

impl Default for BoaHost {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl BoaHost {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Worker threads of this host (and its clones) that are still running
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl ExecutionHost for BoaHost {
    fn name(&self) -> &'static str {
        "boa"
    }

    fn execute(&self, request: &LoadRequest) -> Result<HarnessReport, SandboxLoadError> {
        let program = &request.program;
        let mut script = String::with_capacity(PRELUDE.len() + program.script.len() + SETTLE_EXPR.len());
        script.push_str(PRELUDE);
        script.push_str(&program.script);
        script.push_str(SETTLE_EXPR);

        // Run in a separate thread with timeout
        let completed = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let guard = WorkerGuard {
            active: Arc::clone(&self.active),
            completed: Arc::clone(&completed),
        };
        let worker_request = request.clone();
        let worker_stop = Arc::clone(&stop);

        self.active.fetch_add(1, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name(format!("forge-sandbox-{}", program.generation))
            .spawn(move || {
                let _guard = guard;
                run_script(&script, &worker_request, &worker_stop)
            })
            .map_err(|e| SandboxLoadError::Script(format!("failed to start sandbox worker: {}", e)))?;

        // Wait for completion with timeout
        let timeout = Duration::from_millis(self.timeout_ms);
        let start = Instant::now();
        while !completed.load(Ordering::SeqCst) {
            if start.elapsed() >= timeout {
                // The worker sees the flag at its next slice and exits on its own
                stop.store(true, Ordering::SeqCst);
                log::warn!(
                    "Sandbox generation {} did not settle within {}ms",
                    program.generation,
                    self.timeout_ms
                );
                return Err(SandboxLoadError::Timeout(self.timeout_ms));
            }
            thread::sleep(Duration::from_millis(5));
        }

        let output = match handle.join() {
            Ok(Ok(output)) => output,
            Ok(Err(WorkerError::Script(message))) => return Err(SandboxLoadError::Script(message)),
            Ok(Err(WorkerError::Cancelled)) => return Err(SandboxLoadError::Cancelled),
            Ok(Err(WorkerError::Stopped)) => return Err(SandboxLoadError::Timeout(self.timeout_ms)),
            Err(_) => {
                return Err(SandboxLoadError::Panicked(
                    "JavaScript execution panicked".to_string(),
                ))
            }
        };

        let settled: Settled = serde_json::from_str(&output)
            .map_err(|e| SandboxLoadError::MalformedReport(e.to_string()))?;
        let report = settled.report.ok_or_else(|| {
            SandboxLoadError::MalformedReport("the render harness never reported".to_string())
        })?;
        if report.markup() != settled.root {
            return Err(SandboxLoadError::MalformedReport(
                "root content does not match the reported markup".to_string(),
            ));
        }
        log::trace!(
            "Sandbox generation {} settled after {:?}",
            program.generation,
            start.elapsed()
        );
        Ok(report)
    }
}

/// Evaluate `script` slice by slice until it finishes, the request is
/// cancelled or the host raises `stop`
fn run_script(script: &str, request: &LoadRequest, stop: &AtomicBool) -> Result<String, WorkerError> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(LOOP_ITERATION_LIMIT);

    let parsed = Script::parse(Source::from_bytes(script), None, &mut context)
        .map_err(|e| WorkerError::Script(e.to_string()))?;

    let value = {
        let mut evaluation = pin!(parsed.evaluate_async_with_budget(&mut context, SLICE_BUDGET));
        let waker = Waker::from(Arc::new(NoopWake));
        let mut cx = task::Context::from_waker(&waker);
        loop {
            if let Poll::Ready(result) = evaluation.as_mut().poll(&mut cx) {
                break result.map_err(|e| WorkerError::Script(e.to_string()))?;
            }
            if request.is_cancelled() {
                log::debug!("Sandbox generation {} cancelled mid-run", request.generation);
                return Err(WorkerError::Cancelled);
            }
            if stop.load(Ordering::SeqCst) {
                return Err(WorkerError::Stopped);
            }
        }
    };

    value
        .to_string(&mut context)
        .map(|s| s.to_std_string_escaped())
        .map_err(|e| WorkerError::Script(e.to_string()))
}
