//! Process-wide runtime handle.
//!
//! The first parse starts a tokio runtime and reads the decoder limits from
//! the environment; every later parse reuses both. `shutdown_runtime` stops
//! the runtime for good.
//!
//! ```text
//! Idle ──acquire()──▶ Running ──shutdown()──▶ ShutDown
//!   └────────────────shutdown()─────────────────┘
//! ```
//!
//! A failed start leaves the state `Idle`, so the next parse retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use formdata_core::config::lookup_usize;
use formdata_core::{MultipartConfig, debug_runtime};
use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};

use crate::error::FfiError;

/// Environment variable selecting the number of worker threads.
pub const WORKER_THREADS_ENV_VAR: &str = "FORMDATA_WORKER_THREADS";
/// Environment variable overriding the shutdown timeout, in milliseconds.
pub const SHUTDOWN_TIMEOUT_ENV_VAR: &str = "FORMDATA_SHUTDOWN_TIMEOUT_MS";

/// Default time `shutdown` waits for outstanding runtime work.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

const THREAD_NAME: &str = "formdata-worker";

/// How the runtime is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 0 selects the current-thread scheduler.
    worker_threads: usize,
    shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `FORMDATA_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(n) = lookup_usize(&lookup, WORKER_THREADS_ENV_VAR) {
            config.worker_threads = n;
        }
        if let Some(ms) = lookup_usize(&lookup, SHUTDOWN_TIMEOUT_ENV_VAR) {
            config.shutdown_timeout =
                Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX));
        }
        config
    }

    /// Set the number of worker threads (0 = current-thread scheduler).
    #[must_use]
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = count;
        self
    }

    /// Set the shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn get_worker_threads(&self) -> usize {
        self.worker_threads
    }

    #[must_use]
    pub fn get_shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    fn build(&self) -> std::io::Result<Runtime> {
        let mut builder = if self.worker_threads == 0 {
            Builder::new_current_thread()
        } else {
            Builder::new_multi_thread()
        };
        if self.worker_threads > 0 {
            builder.worker_threads(self.worker_threads);
        }
        builder.thread_name(THREAD_NAME).build()
    }
}

/// A shared reference to the running runtime and the limits read at start-up.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    runtime: Arc<Runtime>,
    config: Arc<MultipartConfig>,
    shutdown_timeout: Duration,
}

impl RuntimeHandle {
    /// Start a runtime outside the global state.
    pub fn start(runtime: &RuntimeConfig, limits: MultipartConfig) -> Result<Self, FfiError> {
        let rt = runtime.build().map_err(|e| FfiError::RuntimeInit {
            detail: e.to_string(),
        })?;
        debug_runtime!(
            "runtime started ({}), limits: {} parts, {} bytes per file, {} bytes total",
            if runtime.worker_threads == 0 {
                "current-thread".to_string()
            } else {
                format!("{} workers", runtime.worker_threads)
            },
            limits.get_max_parts(),
            limits.get_max_file_size(),
            limits.get_max_total_size()
        );
        Ok(Self {
            runtime: Arc::new(rt),
            config: Arc::new(limits),
            shutdown_timeout: runtime.shutdown_timeout,
        })
    }

    /// Run `future` to completion, blocking the calling thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Decoder limits in effect for this runtime.
    #[must_use]
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Stop the runtime if no other clone is alive. Otherwise the last clone
    /// to drop stops it.
    fn stop(self) {
        match Arc::try_unwrap(self.runtime) {
            Ok(runtime) => {
                runtime.shutdown_timeout(self.shutdown_timeout);
                debug_runtime!("runtime stopped");
            }
            Err(shared) => {
                debug_runtime!(
                    "runtime still used by {} in-flight parse(s); it stops when they finish",
                    Arc::strong_count(&shared) - 1
                );
            }
        }
    }
}

/// Observable lifecycle state of the process-wide runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeStatus {
    Idle,
    Running,
    ShutDown,
}

enum RuntimeState {
    Idle,
    Running(RuntimeHandle),
    ShutDown,
}

static STATE: Mutex<RuntimeState> = parking_lot::const_mutex(RuntimeState::Idle);

/// Get the process-wide runtime, starting it on first use.
///
/// Concurrent first calls start exactly one runtime.
pub fn acquire() -> Result<RuntimeHandle, FfiError> {
    let mut state = STATE.lock();
    match &*state {
        RuntimeState::Running(handle) => return Ok(handle.clone()),
        RuntimeState::ShutDown => return Err(FfiError::RuntimeShutDown),
        RuntimeState::Idle => {}
    }

    let handle = RuntimeHandle::start(&RuntimeConfig::from_env(), MultipartConfig::from_env())?;
    *state = RuntimeState::Running(handle.clone());
    Ok(handle)
}

/// Shut the process-wide runtime down. Later [`acquire`] calls fail.
///
/// Returns `false` if the runtime was already shut down.
pub fn shutdown() -> bool {
    let previous = std::mem::replace(&mut *STATE.lock(), RuntimeState::ShutDown);
    match previous {
        RuntimeState::Running(handle) => {
            handle.stop();
            true
        }
        RuntimeState::Idle => {
            debug_runtime!("shutdown before first use");
            true
        }
        RuntimeState::ShutDown => false,
    }
}

#[must_use]
pub fn status() -> RuntimeStatus {
    match &*STATE.lock() {
        RuntimeState::Idle => RuntimeStatus::Idle,
        RuntimeState::Running(_) => RuntimeStatus::Running,
        RuntimeState::ShutDown => RuntimeStatus::ShutDown,
    }
}

/// Return to `Idle`, stopping any running runtime.
#[doc(hidden)]
pub fn reset_for_test() {
    let previous = std::mem::replace(&mut *STATE.lock(), RuntimeState::Idle);
    if let RuntimeState::Running(handle) = previous {
        handle.stop();
    }
}
