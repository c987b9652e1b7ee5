//! Persistence of generated quizzes.
//!
//! [`QuizStore`] keeps one [`QuizRecord`] per identifier under a namespace of
//! a generic [`KeyValueStore`]. Two backends are provided:
//!
//! * [`MemoryStore`]: process-local, for tests and embedding.
//! * [`FileStore`]: one pretty-printed JSON file per key under a root
//!   directory.
//!
//! Writes replace the whole value for a key (last write wins). `FileStore`
//! writes to a uniquely named temp file and renames it into place, so a reader
//! never observes a half-written record even if the writer is cancelled.

use crate::error::PersistenceError;
use crate::quiz::{QuizMetadata, QuizPackage, QuizResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Default namespace for quiz records.
pub const QUIZ_NAMESPACE: &str = "quizzes";

// ── Identifiers and records ──────────────────────────────────────────────

/// Opaque quiz identifier, `quiz_<unix-millis>_<8 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    /// A fresh identifier, unique per run.
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("quiz_{}_{}", Utc::now().timestamp_millis(), &suffix[..8]))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: QuizId,
    pub data: QuizResult,
    pub metadata: QuizMetadata,
    pub saved_at: DateTime<Utc>,
}

impl QuizRecord {
    pub fn new(id: QuizId, package: QuizPackage) -> Self {
        Self {
            id,
            data: package.data,
            metadata: package.metadata,
            saved_at: Utc::now(),
        }
    }

    pub fn package(&self) -> QuizPackage {
        QuizPackage {
            data: self.data.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

// ── Key-value backends ───────────────────────────────────────────────────

/// A string-keyed JSON value store.
///
/// Keys have the form `namespace/name`. Implementations must make `set`
/// atomic per key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError>;

    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, PersistenceError>;

    /// All keys under `namespace`, as full `namespace/name` keys.
    async fn keys(&self, namespace: &str) -> Result<Vec<String>, PersistenceError>;
}

/// In-process store backed by a `BTreeMap`.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> PersistenceError {
        PersistenceError::Unavailable("memory store lock poisoned".into())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        Ok(entries.remove(key).is_some())
    }

    async fn keys(&self, namespace: &str) -> Result<Vec<String>, PersistenceError> {
        let prefix = format!("{namespace}/");
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

/// Directory-backed store: key `ns/name` lives at `<root>/ns/name.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file, rejecting anything that could escape `root`.
    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let (namespace, name) = key
            .split_once('/')
            .ok_or_else(|| PersistenceError::InvalidKey(key.to_string()))?;
        if !is_safe_segment(namespace) || !is_safe_segment(name) {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(namespace).join(format!("{name}.json")))
    }
}

fn is_safe_segment(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('.')
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        // A key that could never have been written is simply absent.
        let Ok(path) = self.path_for(key) else {
            debug!("Key {key:?} is not storable; treating as missing");
            return Ok(None);
        };
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| PersistenceError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(&value).map_err(|source| {
            PersistenceError::Serialization {
                key: key.to_string(),
                source,
            }
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        // Atomic write: unique temp file, then rename over the target.
        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_error(&path, e));
        }

        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        let Ok(path) = self.path_for(key) else {
            debug!("Key {key:?} is not storable; nothing to delete");
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn keys(&self, namespace: &str) -> Result<Vec<String>, PersistenceError> {
        if !is_safe_segment(namespace) {
            return Err(PersistenceError::InvalidKey(namespace.to_string()));
        }
        let dir = self.root.join(namespace);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            // Skips in-flight `*.tmp` files as well as anything foreign.
            match file_name.strip_suffix(".json") {
                Some(name) if is_safe_segment(name) => keys.push(format!("{namespace}/{name}")),
                Some(_) => debug!("Ignoring foreign file {}", entry.path().display()),
                None => {}
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ── Quiz repository ──────────────────────────────────────────────────────

/// Save, list, fetch and delete quiz records by identifier.
#[derive(Clone)]
pub struct QuizStore {
    kv: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl QuizStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            namespace: QUIZ_NAMESPACE.to_string(),
        }
    }

    /// Quiz store over a [`FileStore`] rooted at `dir`.
    pub fn open_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(dir)))
    }

    /// Quiz store over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn key(&self, id: &QuizId) -> String {
        format!("{}/{}", self.namespace, id)
    }

    /// Store `record`, replacing any record with the same id.
    pub async fn save(&self, record: &QuizRecord) -> Result<(), PersistenceError> {
        let key = self.key(&record.id);
        let value = serde_json::to_value(record).map_err(|source| PersistenceError::Serialization {
            key: key.clone(),
            source,
        })?;
        self.kv.set(&key, value).await?;
        info!("Quiz saved: {}", record.id);
        Ok(())
    }

    /// All records, newest first.
    ///
    /// Records that no longer decode are skipped with a warning so one bad
    /// entry does not hide the rest. Backend I/O failures still propagate.
    pub async fn get_all(&self) -> Result<Vec<QuizRecord>, PersistenceError> {
        let mut records = Vec::new();
        for key in self.kv.keys(&self.namespace).await? {
            // A key listed a moment ago may already be gone.
            let value = match self.kv.get(&key).await {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e @ PersistenceError::Serialization { .. }) => {
                    warn!("Skipping unreadable quiz record: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match decode(&key, value) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable quiz record: {e}"),
            }
        }
        records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    /// `Ok(None)` when no record has this id.
    pub async fn get_by_id(&self, id: &QuizId) -> Result<Option<QuizRecord>, PersistenceError> {
        let key = self.key(id);
        match self.kv.get(&key).await? {
            Some(value) => decode(&key, value).map(Some),
            None => Ok(None),
        }
    }

    /// `Ok(false)` when no record has this id.
    pub async fn delete_by_id(&self, id: &QuizId) -> Result<bool, PersistenceError> {
        let removed = self.kv.delete(&self.key(id)).await?;
        if removed {
            info!("Quiz deleted: {}", id);
        } else {
            debug!("Quiz {} not found; nothing deleted", id);
        }
        Ok(removed)
    }
}

fn decode(key: &str, value: Value) -> Result<QuizRecord, PersistenceError> {
    serde_json::from_value(value).map_err(|source| PersistenceError::Serialization {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assemble::assemble;
    use crate::pipeline::intake::Document;
    use crate::quiz::GenerationSettings;
    use crate::sample::sample_quiz;
    use serde_json::json;

    fn record(id: &str) -> QuizRecord {
        let doc = Document::from_bytes("chem.txt", b"atoms".to_vec());
        let pkg = assemble(sample_quiz(&GenerationSettings::default(), doc.name()), &doc);
        QuizRecord::new(QuizId::new(id), pkg)
    }

    #[test]
    fn generated_ids_are_distinct_and_prefixed() {
        let a = QuizId::generate();
        let b = QuizId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("quiz_"));
        assert!(is_safe_segment(a.as_str()));
    }

    #[test]
    fn record_serialises_camel_case() {
        let json = serde_json::to_value(record("quiz_1")).unwrap();
        assert_eq!(json["id"], "quiz_1");
        assert!(json["savedAt"].is_string());
        assert!(json["data"]["mcqs"].is_array());
        assert_eq!(json["metadata"]["fileName"], "chem.txt");
    }

    #[tokio::test]
    async fn memory_round_trip_and_missing_ids() {
        let store = QuizStore::in_memory();
        let r = record("quiz_1");
        store.save(&r).await.unwrap();

        assert_eq!(store.get_by_id(&r.id).await.unwrap(), Some(r.clone()));
        assert_eq!(store.get_by_id(&QuizId::new("quiz_nope")).await.unwrap(), None);
        assert!(!store.delete_by_id(&QuizId::new("quiz_nope")).await.unwrap());

        assert!(store.delete_by_id(&r.id).await.unwrap());
        assert_eq!(store.get_by_id(&r.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_overwrites_same_id() {
        let store = QuizStore::in_memory();
        let mut r = record("quiz_1");
        store.save(&r).await.unwrap();
        r.data.study_guide.summary = "second write".into();
        store.save(&r).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data.study_guide.summary, "second write");
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let quizzes = QuizStore::new(Arc::clone(&kv));
        let drafts = QuizStore::new(kv).with_namespace("drafts");

        quizzes.save(&record("quiz_1")).await.unwrap();
        assert!(drafts.get_all().await.unwrap().is_empty());
        assert_eq!(quizzes.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_all_is_newest_first() {
        let store = QuizStore::in_memory();
        let mut old = record("quiz_a");
        old.saved_at = Utc::now() - chrono::Duration::hours(1);
        let new = record("quiz_b");
        store.save(&old).await.unwrap();
        store.save(&new).await.unwrap();

        let ids: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["quiz_b", "quiz_a"]);
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuizStore::open_dir(dir.path());
        let r = record("quiz_42");
        store.save(&r).await.unwrap();

        assert!(dir.path().join("quizzes/quiz_42.json").exists());
        assert_eq!(store.get_by_id(&r.id).await.unwrap(), Some(r.clone()));
        assert_eq!(store.get_all().await.unwrap().len(), 1);

        assert!(store.delete_by_id(&r.id).await.unwrap());
        assert!(!store.delete_by_id(&r.id).await.unwrap());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_ignores_temp_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let ns = dir.path().join("quizzes");
        std::fs::create_dir_all(&ns).unwrap();
        std::fs::write(ns.join("quiz_1.json.abc.tmp"), "{").unwrap();
        std::fs::write(ns.join("notes.md"), "hi").unwrap();

        let store = FileStore::new(dir.path());
        assert!(store.keys("quizzes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        for key in ["quizzes/../../etc/passwd", "noslash", "quizzes/", "quizzes/.hidden"] {
            assert!(
                matches!(store.set(key, json!({})).await, Err(PersistenceError::InvalidKey(_))),
                "{key}"
            );
        }
    }

    #[tokio::test]
    async fn unstorable_ids_are_missing_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuizStore::open_dir(dir.path());
        store.save(&record("quiz_1")).await.unwrap();

        for id in ["quiz 1", "../quiz_1", "a/b", ".hidden", ""] {
            let id = QuizId::new(id);
            assert_eq!(store.get_by_id(&id).await.unwrap(), None, "{id}");
            assert!(!store.delete_by_id(&id).await.unwrap(), "{id}");
        }
        assert!(dir.path().join("quizzes/quiz_1.json").exists());
    }

    #[tokio::test]
    async fn listing_survives_foreign_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuizStore::open_dir(dir.path());
        store.save(&record("quiz_1")).await.unwrap();
        store.save(&record("quiz_2")).await.unwrap();

        let ns = dir.path().join("quizzes");
        std::fs::write(ns.join("my notes.json"), "{}").unwrap();
        std::fs::write(ns.join(".x.json"), "{}").unwrap();
        std::fs::write(ns.join("quiz_bad.json"), "{ not json").unwrap();
        std::fs::write(ns.join("quiz_partial.json"), r#"{"id":"quiz_partial"}"#).unwrap();

        let keys = FileStore::new(dir.path()).keys("quizzes").await.unwrap();
        assert!(!keys.iter().any(|k| k.contains(' ') || k.contains("/.")), "{keys:?}");

        let mut ids: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["quiz_1", "quiz_2"]);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_serialization_error() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("quizzes/quiz_bad", json!({ "id": "quiz_bad" })).await.unwrap();
        let store = QuizStore::new(kv);

        assert!(matches!(
            store.get_by_id(&QuizId::new("quiz_bad")).await,
            Err(PersistenceError::Serialization { .. })
        ));
    }
}
