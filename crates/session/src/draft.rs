//! Local draft persistence.
//!
//! [`DraftStore`] serializes a [`Session`] under a key derived from its
//! template id and hands the raw JSON to a [`DraftBackend`]. Loading never
//! fails from the caller's point of view: a missing, unreadable, corrupt or
//! incompatible draft is reported as absent, and corrupt entries are removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use liftlog_core::types::{EntityId, Timestamp};
use liftlog_core::workout::Session;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Storage key prefix; the template id is appended.
pub const DRAFT_KEY_PREFIX: &str = "workout_draft_";

/// Bumped whenever the stored session layout changes incompatibly.
pub const DRAFT_FORMAT_VERSION: u32 = 1;

/// Storage key for a template's draft.
pub fn draft_key(template_id: &EntityId) -> String {
    format!("{DRAFT_KEY_PREFIX}{template_id}")
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Draft I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Draft encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Raw key/value storage for serialized drafts.
#[async_trait]
pub trait DraftBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, DraftError>;

    /// Overwrite any previous value for `key`.
    async fn write(&self, key: &str, value: String) -> Result<(), DraftError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), DraftError>;
}

/// One JSON file per draft under a directory.
pub struct FileDraftBackend {
    dir: PathBuf,
}

impl FileDraftBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl DraftBackend for FileDraftBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, DraftError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file, then rename over the target so a crash
    /// mid-write never leaves a truncated draft.
    async fn write(&self, key: &str, value: String) -> Result<(), DraftError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DraftError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process map, the equivalent of browser local storage.
#[derive(Default)]
pub struct MemoryDraftBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryDraftBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DraftBackend for MemoryDraftBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, DraftError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), DraftError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DraftError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DraftStore
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DraftEnvelopeRef<'a> {
    version: u32,
    saved_at: Timestamp,
    session: &'a Session,
}

#[derive(Deserialize)]
struct DraftEnvelope {
    version: u32,
    #[allow(dead_code)]
    saved_at: Timestamp,
    session: Session,
}

/// Typed draft access keyed by template id. Cheap to clone.
#[derive(Clone)]
pub struct DraftStore {
    backend: Arc<dyn DraftBackend>,
}

impl DraftStore {
    pub fn new(backend: Arc<dyn DraftBackend>) -> Self {
        Self { backend }
    }

    /// Load the draft for `template_id`, or `None` if absent or unusable.
    ///
    /// Corrupt or incompatible entries are removed so the next load starts
    /// clean.
    pub async fn load(&self, template_id: &EntityId) -> Option<Session> {
        let key = draft_key(template_id);
        let raw = match self.backend.read(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(%template_id, error = %e, "Failed to read draft");
                return None;
            }
        };

        match decode(&raw, template_id) {
            Ok(session) => {
                tracing::debug!(%template_id, "Loaded workout draft");
                Some(session)
            }
            Err(reason) => {
                tracing::warn!(%template_id, reason, "Discarding unusable workout draft");
                if let Err(e) = self.backend.remove(&key).await {
                    tracing::warn!(%template_id, error = %e, "Failed to remove unusable draft");
                }
                None
            }
        }
    }

    /// Persist a full snapshot, replacing any earlier draft for the template.
    pub async fn save(&self, session: &Session) -> Result<(), DraftError> {
        let envelope = DraftEnvelopeRef {
            version: DRAFT_FORMAT_VERSION,
            saved_at: Utc::now(),
            session,
        };
        let json = serde_json::to_string(&envelope)?;
        self.backend
            .write(&draft_key(&session.template_id), json)
            .await?;
        tracing::debug!(template_id = %session.template_id, "Saved workout draft");
        Ok(())
    }

    pub async fn clear(&self, template_id: &EntityId) -> Result<(), DraftError> {
        self.backend.remove(&draft_key(template_id)).await?;
        tracing::debug!(%template_id, "Cleared workout draft");
        Ok(())
    }
}

fn decode(raw: &str, template_id: &EntityId) -> Result<Session, String> {
    let envelope: DraftEnvelope =
        serde_json::from_str(raw).map_err(|e| format!("malformed JSON: {e}"))?;
    if envelope.version != DRAFT_FORMAT_VERSION {
        return Err(format!("unsupported draft version {}", envelope.version));
    }
    if envelope.session.template_id != *template_id {
        return Err("draft belongs to a different template".into());
    }
    if !envelope.session.has_contiguous_sets() {
        return Err("set indices are not contiguous".into());
    }
    Ok(envelope.session)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use liftlog_core::workout::{ExerciseEntry, SetEntry, SetSource};
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            template_id: Uuid::new_v4(),
            template_name: "Arms".into(),
            logged_at: Utc::now(),
            exercises: vec![ExerciseEntry {
                exercise_id: Uuid::new_v4(),
                exercise_name: "Curl".into(),
                position: 0,
                sets: vec![
                    SetEntry {
                        set_index: 0,
                        reps: Some(12.0),
                        weight: Some(14.5),
                        error: None,
                        source: SetSource::LastWorkout,
                    },
                    SetEntry {
                        set_index: 1,
                        reps: None,
                        weight: Some(14.55),
                        error: Some("All fields are required".into()),
                        source: SetSource::LastWorkout,
                    },
                ],
            }],
        }
    }

    fn memory_store() -> (Arc<MemoryDraftBackend>, DraftStore) {
        let backend = Arc::new(MemoryDraftBackend::new());
        (backend.clone(), DraftStore::new(backend))
    }

    #[test]
    fn key_is_derived_from_template_id() {
        let id = Uuid::nil();
        assert_eq!(
            draft_key(&id),
            "workout_draft_00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_, store) = memory_store();
        let s = session();
        store.save(&s).await.unwrap();

        let loaded = store.load(&s.template_id).await.expect("draft present");
        assert_eq!(loaded, s);
        assert_eq!(
            loaded.exercises[0].completed(),
            s.exercises[0].completed()
        );
    }

    #[tokio::test]
    async fn load_absent_returns_none() {
        let (_, store) = memory_store();
        assert!(store.load(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_draft_is_discarded() {
        let (backend, store) = memory_store();
        let id = Uuid::new_v4();
        backend
            .write(&draft_key(&id), "{not json".into())
            .await
            .unwrap();

        assert!(store.load(&id).await.is_none());
        assert!(!backend.contains(&draft_key(&id)).await);
    }

    #[tokio::test]
    async fn draft_under_wrong_key_is_discarded() {
        let (backend, store) = memory_store();
        let s = session();
        store.save(&s).await.unwrap();
        let other = Uuid::new_v4();
        let raw = backend.raw(&draft_key(&s.template_id)).await.unwrap();
        backend.write(&draft_key(&other), raw).await.unwrap();

        assert!(store.load(&other).await.is_none());
        assert!(!backend.contains(&draft_key(&other)).await);
        assert!(store.load(&s.template_id).await.is_some());
    }

    #[tokio::test]
    async fn future_version_is_discarded() {
        let (backend, store) = memory_store();
        let s = session();
        let raw = serde_json::json!({
            "version": DRAFT_FORMAT_VERSION + 1,
            "saved_at": Utc::now(),
            "session": s,
        });
        backend
            .write(&draft_key(&s.template_id), raw.to_string())
            .await
            .unwrap();
        assert!(store.load(&s.template_id).await.is_none());
    }

    #[tokio::test]
    async fn clear_removes_only_that_template() {
        let (backend, store) = memory_store();
        let a = session();
        let b = session();
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        store.clear(&a.template_id).await.unwrap();
        assert!(store.load(&a.template_id).await.is_none());
        assert!(store.load(&b.template_id).await.is_some());
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn file_backend_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::new(Arc::new(FileDraftBackend::new(dir.path().join("drafts"))));
        let s = session();

        store.save(&s).await.unwrap();
        let path = dir
            .path()
            .join("drafts")
            .join(format!("{}.json", draft_key(&s.template_id)));
        assert!(path.exists());
        assert_eq!(store.load(&s.template_id).await, Some(s.clone()));

        store.clear(&s.template_id).await.unwrap();
        assert!(!path.exists());
        store.clear(&s.template_id).await.unwrap();
    }

    #[tokio::test]
    async fn file_backend_discards_truncated_draft() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileDraftBackend::new(dir.path());
        let id = Uuid::new_v4();
        backend
            .write(&draft_key(&id), r#"{"version":1,"session":{"templ"#.into())
            .await
            .unwrap();

        let store = DraftStore::new(Arc::new(backend));
        assert!(store.load(&id).await.is_none());
        assert!(!dir
            .path()
            .join(format!("{}.json", draft_key(&id)))
            .exists());
    }
}
