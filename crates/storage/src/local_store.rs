//! Local durable key/value store.
//!
//! Keeps a flat string map and writes it through to a single JSON file on
//! every mutation, so a crash between writes loses at most the write in
//! flight. Used as the fallback when no host runtime is present.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use coursemark_core::{ConfigureOptions, InitResult};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Backend, BackendKind, Result};

/// Version string reported by [`LocalStore::initialize`].
pub const LOCAL_VERSION: &str = "local";

/// File-backed local key/value store.
///
/// Clones share the same entries, so a handle kept outside the progress store
/// observes its writes.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    inner: Arc<Mutex<LocalInner>>,
}

#[derive(Debug, Default)]
struct LocalInner {
    entries: BTreeMap<String, String>,
    pending: bool,
}

impl LocalStore {
    /// Open (or create) a store persisted at `path`.
    ///
    /// An unreadable file is logged and replaced on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let entries = match fs::read_to_string(&path).await {
            Ok(json) => match serde_json::from_str::<BTreeMap<String, String>>(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Local store unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Local store opened");

        Ok(Self {
            path: Some(path),
            inner: Arc::new(Mutex::new(LocalInner {
                entries,
                pending: false,
            })),
        })
    }

    /// A store that lives only as long as the process.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            inner: Arc::new(Mutex::new(LocalInner::default())),
        }
    }

    /// File backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether writes happened since the last commit.
    pub async fn is_pending(&self) -> bool {
        self.inner.lock().await.pending
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Write-then-rename: the previous file stays intact until the new one is complete.
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn configure(&mut self, _options: &ConfigureOptions) -> Result<()> {
        Ok(())
    }

    async fn initialize(&mut self) -> Result<InitResult> {
        Ok(InitResult::connected(LOCAL_VERSION))
    }

    async fn terminate(&mut self) -> Result<()> {
        self.commit().await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().await.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(key.to_string(), value.to_string());
        inner.pending = true;
        self.persist(&inner.entries).await
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.entries.remove(key).is_some() {
            inner.pending = true;
            self.persist(&inner.entries).await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        // Writes are already on disk; commit only clears the pending marker.
        self.inner.lock().await.pending = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ephemeral_set_get_remove() {
        let mut store = LocalStore::ephemeral();
        assert_eq!(store.get("bookmark").await.unwrap(), None);

        store.set("bookmark", "2").await.unwrap();
        assert_eq!(store.get("bookmark").await.unwrap().as_deref(), Some("2"));
        assert!(store.is_pending().await);

        store.remove("bookmark").await.unwrap();
        assert_eq!(store.get("bookmark").await.unwrap(), None);

        store.commit().await.unwrap();
        assert!(!store.is_pending().await);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let mut store = LocalStore::ephemeral();
        let observer = store.clone();

        store.set("suspend_data", r#"{"v":1}"#).await.unwrap();
        assert_eq!(
            observer.get("suspend_data").await.unwrap().as_deref(),
            Some(r#"{"v":1}"#)
        );
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");

        {
            let mut store = LocalStore::open(&path).await.unwrap();
            store.set("bookmark", "3").await.unwrap();
            store.set("suspend_data", r#"{"location":3,"v":1}"#).await.unwrap();
            store.remove("suspend_data").await.unwrap();
        }

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("bookmark").await.unwrap().as_deref(), Some("3"));
        assert_eq!(reopened.get("suspend_data").await.unwrap(), None);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let mut store = LocalStore::open(&path).await.unwrap();
        assert_eq!(store.get("bookmark").await.unwrap(), None);

        store.set("bookmark", "1").await.unwrap();
        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("bookmark").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_initialize_always_succeeds() {
        let mut store = LocalStore::ephemeral();
        let init = store.initialize().await.unwrap();
        assert!(init.success);
        assert_eq!(init.version, LOCAL_VERSION);
    }
}
