use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::{
    backend::{DocumentStorage, JsonFileStorage},
    document::{Collection, Document},
    record::Record,
};
use crate::errors::ServiceError;

/// Timestamp format used for `createdAt`/`updatedAt`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// File-backed collection store.
///
/// The whole document is loaded, modified and saved on every write. All of
/// those cycles go through one mutex, so concurrent writers never lose each
/// other's changes.
pub struct RecordStore {
    storage: Arc<dyn DocumentStorage>,
    seed_demo_user: bool,
    lock: Mutex<()>,
    degraded: AtomicBool,
}

impl RecordStore {
    pub fn new(storage: Arc<dyn DocumentStorage>, seed_demo_user: bool) -> Arc<Self> {
        Arc::new(Self { storage, seed_demo_user, lock: Mutex::new(()), degraded: AtomicBool::new(false) })
    }

    /// Open a JSON file store, creating and seeding the file if missing.
    pub async fn open<P: Into<PathBuf>>(path: P, seed_demo_user: bool) -> Arc<Self> {
        let store = Self::new(Arc::new(JsonFileStorage::new(path)), seed_demo_user);
        let doc = store.load().await;
        debug!(location = %store.location(), users = doc.users.len(), "record store opened");
        store
    }

    /// Read the persisted document.
    ///
    /// A missing document is seeded and written. Unreadable content degrades
    /// to an empty document and raises the `degraded` flag; the file is left
    /// as it is until the next successful save.
    pub async fn load(&self) -> Document {
        let _guard = self.lock.lock().await;
        self.load_unlocked().await
    }

    async fn load_unlocked(&self) -> Document {
        match self.storage.read().await {
            Ok(Some(doc)) => {
                self.degraded.store(false, Ordering::SeqCst);
                doc
            }
            Ok(None) => {
                let doc = Document::seed(self.seed_demo_user, &timestamp());
                match self.storage.write(&doc).await {
                    Ok(()) => debug!(location = %self.location(), "created new database file"),
                    Err(e) => error!(location = %self.location(), error = %e, "failed to persist seed document"),
                }
                self.degraded.store(false, Ordering::SeqCst);
                doc
            }
            Err(e) => {
                warn!(location = %self.location(), error = %e, "document unreadable; serving empty document");
                self.degraded.store(true, Ordering::SeqCst);
                Document::default()
            }
        }
    }

    /// Overwrite the persisted document with `doc`.
    pub async fn save(&self, doc: &Document) -> Result<(), ServiceError> {
        let _guard = self.lock.lock().await;
        self.save_unlocked(doc).await
    }

    async fn save_unlocked(&self, doc: &Document) -> Result<(), ServiceError> {
        self.storage.write(doc).await.map_err(|e| {
            error!(location = %self.location(), error = %e, "failed to save document");
            e
        })?;
        self.degraded.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Run one load-modify-save cycle under the store lock. `f` gets the
    /// document and the timestamp to stamp. Nothing is saved if `f` fails.
    pub async fn transact<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Document, &str) -> Result<T, ServiceError>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.load_unlocked().await;
        let out = f(&mut doc, &timestamp())?;
        self.save_unlocked(&doc).await?;
        Ok(out)
    }

    pub async fn insert(&self, c: Collection, fields: Map<String, Value>) -> Result<Record, ServiceError> {
        let rec = self.transact(|doc, now| doc.insert(c, fields, now)).await?;
        debug!(collection = %c, id = ?rec.id, "record inserted");
        Ok(rec)
    }

    /// Merge `fields` into the record with `id`; `Ok(None)` when there is no
    /// such record, in which case nothing is written. Updating a user also
    /// upserts its profile.
    pub async fn update(&self, c: Collection, id: u64, fields: Map<String, Value>) -> Result<Option<Record>, ServiceError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load_unlocked().await;
        let Some(rec) = doc.apply_update(c, id, fields, &timestamp())? else {
            debug!(collection = %c, id, "update target not found");
            return Ok(None);
        };
        self.save_unlocked(&doc).await?;
        debug!(collection = %c, id, "record updated");
        Ok(Some(rec))
    }

    pub async fn upsert_by(&self, c: Collection, key: &str, value: Value, fields: Map<String, Value>) -> Result<Record, ServiceError> {
        self.transact(|doc, now| doc.upsert_by(c, key, value, fields, now)).await
    }

    pub async fn find_by_id(&self, c: Collection, id: u64) -> Option<Record> {
        self.load().await.find_by_id(c, id).cloned()
    }

    pub async fn find_by<F>(&self, c: Collection, pred: F) -> Option<Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.load().await.find_by(c, pred).cloned()
    }

    pub async fn find_by_field(&self, c: Collection, key: &str, value: &Value) -> Option<Record> {
        self.load().await.find_by_field(c, key, value).cloned()
    }

    pub async fn list(&self, c: Collection) -> Vec<Record> {
        let mut doc = self.load().await;
        std::mem::take(doc.collection_mut(c))
    }

    /// True after the last load found unreadable content.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn location(&self) -> String {
        self.storage.location()
    }

    pub async fn persisted_len(&self) -> Option<u64> {
        self.storage.persisted_len().await
    }
}
