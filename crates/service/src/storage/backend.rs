use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use tokio::{fs, sync::RwLock};
use tracing::debug;

use super::document::Document;
use crate::errors::ServiceError;

/// Where a `Document` is persisted.
///
/// `read` distinguishes "nothing persisted yet" (`Ok(None)`) from content that
/// exists but does not parse (`Err(ServiceError::Corrupt)`).
#[async_trait::async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn read(&self) -> Result<Option<Document>, ServiceError>;
    /// Overwrite the persisted document. Not crash-atomic.
    async fn write(&self, doc: &Document) -> Result<(), ServiceError>;
    /// Size in bytes of the persisted content, `None` if nothing is persisted.
    async fn persisted_len(&self) -> Option<u64>;
    fn location(&self) -> String;
}

fn parse(bytes: &[u8]) -> Result<Document, ServiceError> {
    serde_json::from_slice(bytes).map_err(|e| ServiceError::Corrupt(e.to_string()))
}

fn render(doc: &Document) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec_pretty(doc).map_err(|e| ServiceError::Storage(e.to_string()))
}

/// Pretty-printed JSON file on local disk.
pub struct JsonFileStorage {
    file_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into() }
    }
}

#[async_trait::async_trait]
impl DocumentStorage for JsonFileStorage {
    async fn read(&self) -> Result<Option<Document>, ServiceError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => parse(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, doc: &Document) -> Result<(), ServiceError> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let data = render(doc)?;
        debug!(path = %self.file_path.display(), bytes = data.len(), "writing document");
        fs::write(&self.file_path, data).await?;
        Ok(())
    }

    async fn persisted_len(&self) -> Option<u64> {
        fs::metadata(&self.file_path).await.ok().map(|m| m.len())
    }

    fn location(&self) -> String {
        self.file_path.display().to_string()
    }
}

/// In-process storage holding the serialized text, so corrupt content and
/// failing writes can be simulated.
#[derive(Default)]
pub struct MemoryStorage {
    raw: RwLock<Option<Vec<u8>>>,
    read_only: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary persisted bytes, valid or not.
    pub fn with_raw(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: RwLock::new(Some(raw.into())), read_only: AtomicBool::new(false) }
    }

    /// When set, every `write` fails with a storage error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub async fn raw(&self) -> Option<Vec<u8>> {
        self.raw.read().await.clone()
    }
}

#[async_trait::async_trait]
impl DocumentStorage for MemoryStorage {
    async fn read(&self) -> Result<Option<Document>, ServiceError> {
        match self.raw.read().await.as_deref() {
            Some(bytes) => parse(bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, doc: &Document) -> Result<(), ServiceError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(ServiceError::Storage("memory storage is read-only".into()));
        }
        let data = render(doc)?;
        *self.raw.write().await = Some(data);
        Ok(())
    }

    async fn persisted_len(&self) -> Option<u64> {
        self.raw.read().await.as_ref().map(|b| b.len() as u64)
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
