//! In-process host runtime.
//!
//! Holds a CMI data model in memory. Useful when the course runtime and the
//! host share a process, and as the host side of tests: clones share state,
//! so a handle kept by the caller sees every write the progress store makes
//! and can mutate values behind its back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use coursemark_core::{ConfigureOptions, InitResult};
use tracing::debug;

use super::{Backend, BackendError, BackendKind, Result};

/// In-memory host runtime.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

#[derive(Debug, Default)]
struct HostState {
    available: bool,
    version: String,
    values: HashMap<String, String>,
    options: Option<ConfigureOptions>,
    initialized: bool,
    terminated: bool,
    initialize_calls: usize,
    commits: usize,
}

impl MemoryHost {
    /// A host that accepts sessions and reports `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self::from_state(HostState {
            available: true,
            version: version.into(),
            ..HostState::default()
        })
    }

    /// A host that refuses every session, as when no LMS is present.
    pub fn unavailable() -> Self {
        Self::from_state(HostState::default())
    }

    fn from_state(state: HostState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a value before the session starts.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_value(key, value);
        self
    }

    /// Change a value from the host side.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().values.insert(key.into(), value.into());
    }

    /// Current value of a field.
    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    /// Options received through `configure`.
    pub fn options(&self) -> Option<ConfigureOptions> {
        self.lock().options.clone()
    }

    /// Number of `initialize` calls received.
    pub fn initialize_calls(&self) -> usize {
        self.lock().initialize_calls
    }

    /// Number of `commit` calls received.
    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    /// Whether the session was ended with `terminate`.
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    fn check_open(state: &HostState) -> Result<()> {
        if state.terminated {
            return Err(BackendError::Terminated);
        }
        if !state.initialized {
            return Err(BackendError::NotInitialized);
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryHost {
    fn kind(&self) -> BackendKind {
        BackendKind::Host
    }

    async fn configure(&mut self, options: &ConfigureOptions) -> Result<()> {
        self.lock().options = Some(options.clone());
        Ok(())
    }

    async fn initialize(&mut self) -> Result<InitResult> {
        let mut state = self.lock();
        state.initialize_calls += 1;
        if !state.available {
            debug!("Memory host refused initialize");
            return Ok(InitResult::failed());
        }
        state.initialized = true;
        state.terminated = false;
        Ok(InitResult::connected(state.version.clone()))
    }

    async fn terminate(&mut self) -> Result<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        state.terminated = true;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self.lock();
        Self::check_open(&state)?;
        Ok(state.values.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        state.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.lock();
        Self::check_open(&state)?;
        state.commits += 1;
        Ok(())
    }
}
