//! Plain persistent store: one JSON document in a directory.
//!
//! No hardware protection and no biometric gate. Every value the vault
//! writes is already ciphertext except the salt, so the file is as
//! sensitive as the passphrase is weak. Meant for headless use and tests.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{EncryptedStorage, StorageError};

/// File name inside the storage directory.
pub const STORE_FILE_NAME: &str = "seedkeep-store.json";

type Document = BTreeMap<String, String>;

/// [`EncryptedStorage`] over `<dir>/seedkeep-store.json`.
///
/// Writes go to a temporary sibling and are renamed into place, so a crash
/// leaves either the old or the new document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE_NAME),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the JSON document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Document, StorageError> {
        let path = self.path.clone();
        blocking(move || read_document(&path)).await
    }

    async fn store(&self, document: Document) -> Result<(), StorageError> {
        let path = self.path.clone();
        blocking(move || write_document(&path, &document)).await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Backend(format!("storage task failed: {e}")))?
}

fn backend(context: &str, path: &Path, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{context} {}: {err}", path.display()))
}

fn read_document(path: &Path) -> Result<Document, StorageError> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|e| backend("corrupt store", path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Document::new()),
        Err(e) => Err(backend("cannot read", path, e)),
    }
}

fn write_document(path: &Path, document: &Document) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| backend("cannot create", parent, e))?;
    }
    let json = serde_json::to_vec_pretty(document).map_err(|e| backend("cannot encode", path, e))?;
    let tmp = path.with_extension("json.tmp");

    let mut file = open_private(&tmp).map_err(|e| backend("cannot create", &tmp, e))?;
    file.write_all(&json)
        .and_then(|()| file.sync_all())
        .map_err(|e| backend("cannot write", &tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| backend("cannot replace", path, e))
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn no_gate() -> StorageError {
    StorageError::BiometricUnavailable("file storage has no biometric gate".into())
}

#[async_trait]
impl EncryptedStorage for FileStorage {
    async fn get_item(
        &self,
        key: &str,
        auth_prompt: Option<&str>,
    ) -> Result<Option<String>, StorageError> {
        if auth_prompt.is_some() {
            return Err(no_gate());
        }
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(
        &self,
        key: &str,
        value: &str,
        auth_prompt: Option<&str>,
    ) -> Result<bool, StorageError> {
        if auth_prompt.is_some() {
            return Err(no_gate());
        }
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        document.insert(key.to_owned(), value.to_owned());
        self.store(document).await?;
        Ok(true)
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        if document.remove(key).is_some() {
            self.store(document).await?;
        }
        Ok(())
    }
}
