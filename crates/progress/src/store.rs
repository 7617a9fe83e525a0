//! The progress store.
//!
//! One store per learner session. It reconciles the host runtime, the local
//! durable store and its own in-memory view into a single location and
//! suspend payload, and derives the resume flags UI collaborators read.
//!
//! Session lifecycle:
//! ```text
//! Disconnected → Connecting → Connected ──hydrate──▶ ...
//!                           ↘ ConnectFailed (local store for the rest of the session)
//! ```

use std::sync::Arc;

use chrono::Utc;
use coursemark_core::suspend::{self, SuspendPatch, SuspendPayload};
use coursemark_core::{
    CmiFields, ConnectionPhase, ConnectionState, InitResult, ProgressSnapshot, SessionId,
    BOOKMARK_KEY, STATUS_COMPLETED, STATUS_INCOMPLETE, SUSPEND_DATA_KEY,
};
use coursemark_storage::{Backend, BackendError};
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::error::{ProgressError, Result};
use crate::language::{LanguagePreference, LoadOptions};

/// A store shared between tasks. Each action holds the lock for its whole
/// read-modify-write sequence.
pub type SharedProgressStore = Arc<tokio::sync::Mutex<ProgressStore>>;

/// Backend that reads and writes go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Active {
    /// The host runtime
    Host,
    /// The local durable store
    Local,
}

/// Outcome of [`ProgressStore::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Host session open; the store has hydrated.
    Connected {
        /// Version reported by the host
        version: String,
    },
    /// No host; the local store is active for the rest of the session.
    Fallback,
    /// A connect attempt was already made this session.
    AlreadyAttempted,
}

/// Values kept on both backends under different keys.
#[derive(Debug, Clone, Copy)]
enum Field {
    Location,
    Suspend,
}

/// Session progress state.
pub struct ProgressStore {
    session: SessionId,
    config: StoreConfig,
    host: Box<dyn Backend>,
    local: Box<dyn Backend>,
    active: Active,
    connection: ConnectionState,
    location: Option<u32>,
    suspend: Option<SuspendPayload>,
    resume_available: bool,
    resume_decision_made: bool,
    language: Option<Arc<dyn LanguagePreference>>,
}

impl ProgressStore {
    /// Create a store over a host runtime and a local fallback.
    ///
    /// The local store is active until [`ProgressStore::connect`] succeeds.
    pub fn new(host: impl Backend + 'static, local: impl Backend + 'static) -> Self {
        Self {
            session: SessionId::new(),
            config: StoreConfig::default(),
            host: Box::new(host),
            local: Box::new(local),
            active: Active::Local,
            connection: ConnectionState::default(),
            location: None,
            suspend: None,
            resume_available: false,
            resume_decision_made: false,
            language: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the collaborator that receives languages recovered by hydration.
    pub fn with_language_preference(mut self, language: Arc<dyn LanguagePreference>) -> Self {
        self.language = Some(language);
        self
    }

    /// Wrap the store for use from several tasks.
    pub fn into_shared(self) -> SharedProgressStore {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    // === Derived state ===

    /// Session identifier.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Connection state.
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Whether the host runtime is connected.
    pub fn connected(&self) -> bool {
        self.connection.connected()
    }

    /// Which backend reads and writes go to.
    pub fn active(&self) -> Active {
        self.active
    }

    /// Furthest location reached, `None` until determined.
    pub fn location(&self) -> Option<u32> {
        self.location
    }

    /// In-memory suspend payload.
    pub fn suspend_data(&self) -> Option<&SuspendPayload> {
        self.suspend.as_ref()
    }

    /// In-memory suspend payload in its stored form.
    pub fn encoded_suspend_data(&self) -> Option<String> {
        self.suspend.as_ref().map(suspend::encode)
    }

    /// Hydration found prior progress.
    pub fn resume_available(&self) -> bool {
        self.resume_available
    }

    /// The learner chose resume or restart.
    pub fn resume_decision_made(&self) -> bool {
        self.resume_decision_made
    }

    /// Read-only view for UI collaborators.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            session: self.session,
            timestamp: Utc::now(),
            location: self.location,
            resume_available: self.resume_available,
            resume_decision_made: self.resume_decision_made,
            connected: self.connected(),
            protocol_version: self.connection.protocol_version().to_string(),
        }
    }

    // === Session ===

    /// Connect to the host runtime.
    ///
    /// Only the first call does anything. On success the store hydrates
    /// immediately; on failure the local store stays active for the whole
    /// session and no retry is made.
    pub async fn connect(&mut self) -> ConnectOutcome {
        if self.connection.attempted() {
            info!(session = %self.session, "Connect skipped (already attempted)");
            return ConnectOutcome::AlreadyAttempted;
        }

        self.connection.phase = ConnectionPhase::Connecting;
        info!(session = %self.session, version = %self.config.protocol_version, "Connect attempted");

        let init = match self.open_host().await {
            Ok(init) => init,
            Err(e) => {
                warn!(session = %self.session, error = %e, "Host initialize failed");
                InitResult::failed()
            }
        };
        self.connection.init = init.clone();

        if !init.success {
            self.connection.phase = ConnectionPhase::ConnectFailed;
            self.active = Active::Local;
            warn!(session = %self.session, "Host runtime unavailable, running standalone");
            return ConnectOutcome::Fallback;
        }

        self.connection.phase = ConnectionPhase::Connected;
        self.active = Active::Host;
        info!(session = %self.session, version = %init.version, "Host runtime connected");

        self.hydrate_from_persistence().await;

        ConnectOutcome::Connected {
            version: init.version,
        }
    }

    async fn open_host(&mut self) -> std::result::Result<InitResult, BackendError> {
        let options = self.config.configure_options();
        self.host.configure(&options).await?;
        self.host.initialize().await
    }

    /// End the host session. Does nothing when not connected.
    ///
    /// Later writes go to the local store.
    pub async fn terminate(&mut self) {
        if !self.connected() {
            return;
        }

        match self.host.terminate().await {
            Ok(()) => info!(session = %self.session, "Host session terminated"),
            Err(e) => error!(session = %self.session, error = %e, "Host terminate failed"),
        }

        self.connection.phase = ConnectionPhase::Terminated;
        self.active = Active::Local;
    }

    /// Rebuild location, suspend payload and resume flags from persistence.
    ///
    /// Location precedence, first match wins:
    /// 1. host location, when connected and > 0
    /// 2. `location` in the stored suspend payload
    /// 3. the local bookmark
    ///
    /// A recovered language is handed to the language collaborator on a
    /// spawned task; its outcome never affects hydration.
    pub async fn hydrate_from_persistence(&mut self) {
        let suspend = self.get_suspend_data().await;

        let mut location = None;

        if self.connected() {
            let host_location = self.get_location().await;
            if host_location > 0 {
                location = Some(host_location);
            }
        }

        if location.is_none() {
            location = suspend.as_ref().and_then(SuspendPayload::location);
        }

        if location.is_none() {
            location = self
                .read(Active::Local, BOOKMARK_KEY)
                .await
                .and_then(|raw| raw.trim().parse::<u32>().ok());
        }

        let language = suspend
            .as_ref()
            .and_then(SuspendPayload::language)
            .map(str::to_string);

        self.location = location;
        self.resume_available = matches!(location, Some(loc) if loc > 0);
        self.resume_decision_made = false;
        self.suspend = suspend;

        info!(
            session = %self.session,
            location = ?self.location,
            resume_available = self.resume_available,
            "Hydrated from persistence"
        );

        if let Some(lang) = language {
            self.load_language(lang);
        }
    }

    fn load_language(&self, lang: String) {
        let Some(preference) = self.language.clone() else {
            debug!(session = %self.session, lang = %lang, "No language collaborator, preference ignored");
            return;
        };

        let session = self.session;
        tokio::spawn(async move {
            if let Err(e) = preference.load(&lang, LoadOptions { persist: false }).await {
                warn!(session = %session, lang = %lang, error = %e, "Language preference load failed");
            }
        });
    }

    // === Location ===

    /// Location currently stored on the active backend (0 when absent).
    pub async fn get_location(&self) -> u32 {
        let key = self.key(self.active, Field::Location);
        let Some(raw) = self.read(self.active, key).await else {
            return 0;
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return 0;
        }

        match raw.parse::<u32>() {
            Ok(location) => location,
            Err(_) => {
                warn!(session = %self.session, key, value = raw, "Stored location is not a number");
                0
            }
        }
    }

    /// Store `location` on the active backend and in the suspend payload.
    ///
    /// The merged payload is size-checked before either value is written, so
    /// a refused payload leaves the backend untouched.
    pub async fn set_location(&mut self, location: u32) -> Result<()> {
        let (next, encoded) = self
            .prepare_suspend(SuspendPatch::new().location(location))
            .await?;

        self.write(Field::Location, &location.to_string()).await?;
        self.write(Field::Suspend, &encoded).await?;

        self.suspend = Some(next);
        self.location = Some(location);
        Ok(())
    }

    /// Move forward to `location` if it is past what the backend holds.
    ///
    /// The comparison baseline is the backend value, not the in-memory
    /// location. Returns whether the location advanced.
    pub async fn update_location_if_advanced(&mut self, location: u32) -> Result<bool> {
        let current = self.get_location().await;

        if location > current {
            self.set_location(location).await?;
            info!(session = %self.session, from = current, to = location, "Location advanced");
            Ok(true)
        } else {
            info!(session = %self.session, current, attempted = location, "Location unchanged");
            Ok(false)
        }
    }

    // === Suspend data ===

    /// Decode the suspend payload stored on the active backend.
    ///
    /// Missing, empty or malformed data is treated as absent.
    pub async fn get_suspend_data(&self) -> Option<SuspendPayload> {
        let raw = self.read(self.active, self.key(self.active, Field::Suspend)).await?;
        if raw.is_empty() {
            return None;
        }

        match suspend::decode(&raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(session = %self.session, error = %e, "Failed to decode suspend data");
                None
            }
        }
    }

    /// Merge `patch` into the suspend payload and persist it.
    ///
    /// The merge base is the in-memory payload, or the stored one when
    /// nothing has been loaded yet. Under the legacy protocol an encoded
    /// payload over the size ceiling is refused and nothing is written.
    pub async fn set_suspend_data(&mut self, patch: SuspendPatch) -> Result<()> {
        let (next, encoded) = self.prepare_suspend(patch).await?;

        self.write(Field::Suspend, &encoded).await?;
        debug!(session = %self.session, len = suspend::encoded_len(&encoded), "Suspend data written");

        self.suspend = Some(next);
        Ok(())
    }

    async fn prepare_suspend(&self, patch: SuspendPatch) -> Result<(SuspendPayload, String)> {
        let next = match &self.suspend {
            Some(current) => SuspendPayload::merged(Some(current), patch),
            None => SuspendPayload::merged(self.get_suspend_data().await.as_ref(), patch),
        };
        let encoded = suspend::encode(&next);
        let len = suspend::encoded_len(&encoded);

        if self.connected() && self.connection.protocol().is_legacy() {
            let limit = self.config.legacy_suspend_limit;
            if len > limit {
                error!(session = %self.session, len, limit, "Suspend data exceeds legacy limit");
                return Err(ProgressError::PayloadTooLarge { len, limit });
            }
        }

        Ok((next, encoded))
    }

    // === Score, status, identity ===

    /// Raw score recorded on the host.
    pub async fn get_score(&self) -> Option<f64> {
        let fields = self.host_fields("get_score")?;

        let Some(raw) = self.read(Active::Host, fields.score_raw).await.filter(|s| !s.is_empty()) else {
            warn!(session = %self.session, "No score found");
            return None;
        };

        match raw.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => {
                info!(session = %self.session, score, "Score retrieved");
                Some(score)
            }
            _ => {
                error!(session = %self.session, value = %raw, "Invalid score value");
                None
            }
        }
    }

    /// Learner name reported by the host.
    pub async fn get_student_name(&self) -> Option<String> {
        let fields = self.host_fields("get_student_name")?;
        let name = self.read(Active::Host, fields.learner_name).await;
        info!(session = %self.session, name = ?name, "Learner name retrieved");
        name
    }

    /// Learner id reported by the host.
    pub async fn get_student_id(&self) -> Option<String> {
        let fields = self.host_fields("get_student_id")?;
        let id = self.read(Active::Host, fields.learner_id).await;
        info!(session = %self.session, id = ?id, "Learner id retrieved");
        id
    }

    /// Record a score out of 100 on the host.
    pub async fn set_score(&mut self, score: f64) -> Result<()> {
        let Some(fields) = self.host_fields("set_score") else {
            return Ok(());
        };

        info!(session = %self.session, score, "Setting score");
        self.host.set(fields.score_min, "0").await?;
        self.host.set(fields.score_max, "100").await?;
        self.host.set(fields.score_raw, &score.to_string()).await?;
        self.host.commit().await?;
        Ok(())
    }

    /// Mark the course completed on the host.
    pub async fn set_complete(&mut self) -> Result<()> {
        let Some(fields) = self.host_fields("set_complete") else {
            return Ok(());
        };

        self.host.set(fields.status, STATUS_COMPLETED).await?;
        self.host.commit().await?;
        info!(session = %self.session, version = %self.connection.protocol_version(), "Course marked complete");
        Ok(())
    }

    // === Resume decision ===

    /// The learner chose to resume. Location is left as hydrated.
    pub fn resume_course(&mut self) {
        self.resume_decision_made = true;
        info!(session = %self.session, "Learner chose to resume course");
    }

    /// The learner chose to start over.
    ///
    /// Resets the host record when connected and always clears the local
    /// bookmark and suspend data.
    pub async fn restart_course(&mut self) -> Result<()> {
        if self.connected() {
            let fields = self.connection.protocol().fields();
            self.host.set(fields.location, "0").await?;
            self.host.set(fields.suspend_data, "").await?;
            self.host.set(fields.status, STATUS_INCOMPLETE).await?;
            self.host.commit().await?;
        }

        self.local.remove(BOOKMARK_KEY).await?;
        self.local.remove(SUSPEND_DATA_KEY).await?;

        self.location = Some(0);
        self.suspend = None;
        self.resume_available = false;
        self.resume_decision_made = true;

        info!(session = %self.session, "Learner restarted course");
        Ok(())
    }

    // === Backend plumbing ===

    fn key(&self, which: Active, field: Field) -> &'static str {
        match (which, field) {
            (Active::Host, Field::Location) => self.connection.protocol().fields().location,
            (Active::Host, Field::Suspend) => self.connection.protocol().fields().suspend_data,
            (Active::Local, Field::Location) => BOOKMARK_KEY,
            (Active::Local, Field::Suspend) => SUSPEND_DATA_KEY,
        }
    }

    /// Host field names, or `None` (logged) when the host is not connected.
    fn host_fields(&self, action: &str) -> Option<&'static CmiFields> {
        if self.connected() {
            Some(self.connection.protocol().fields())
        } else {
            warn!(session = %self.session, action, "Host runtime not connected");
            None
        }
    }

    fn backend(&self, which: Active) -> &dyn Backend {
        match which {
            Active::Host => self.host.as_ref(),
            Active::Local => self.local.as_ref(),
        }
    }

    /// Read a key, treating backend failures as absent data.
    async fn read(&self, which: Active, key: &str) -> Option<String> {
        match self.backend(which).get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(session = %self.session, key, error = %e, "Backend read failed");
                None
            }
        }
    }

    /// Write a field to the active backend, committing on the host.
    ///
    /// While the host is active the local store gets a copy too; a failed
    /// copy is only logged.
    async fn write(&mut self, field: Field, value: &str) -> Result<()> {
        let local_key = self.key(Active::Local, field);

        if self.active == Active::Host {
            let key = self.key(Active::Host, field);
            self.host.set(key, value).await?;
            self.host.commit().await?;

            if let Err(e) = self.local.set(local_key, value).await {
                warn!(session = %self.session, key = local_key, error = %e, "Local copy failed");
            }
            return Ok(());
        }

        self.local.set(local_key, value).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("session", &self.session)
            .field("host", &self.host.kind())
            .field("local", &self.local.kind())
            .field("active", &self.active)
            .field("connection", &self.connection)
            .field("location", &self.location)
            .field("suspend", &self.suspend)
            .field("resume_available", &self.resume_available)
            .field("resume_decision_made", &self.resume_decision_made)
            .finish_non_exhaustive()
    }
}
