mod local_fs;

pub use local_fs::LocalFileStorage;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Longest extension carried over from a client filename.
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("file not found")]
    NotFound,
    #[error("invalid file name")]
    InvalidName,
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file that has been fully written and published under its generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// Backend holding uploaded files. The upload root is the system of record:
/// nothing is cached between calls.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Opens a staging area for an incoming file. Nothing becomes visible to
    /// `list` until the returned writer is committed.
    async fn stage(&self) -> Result<Box<dyn StagedWrite>, StorageError>;
    async fn list(&self) -> Result<Vec<String>, StorageError>;
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// Incoming file contents. Dropping a writer without committing discards it.
#[async_trait]
pub trait StagedWrite: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError>;

    /// Bytes written so far.
    fn written(&self) -> u64;

    /// Publishes the staged bytes under `name` in a single rename.
    async fn commit(self: Box<Self>, name: &str) -> Result<StoredFile, StorageError>;
}

/// Extension to keep from a client supplied filename.
///
/// Only the text after the last `.` of the final path component counts, and
/// only when it is short and ASCII alphanumeric. A leading dot (`.bashrc`)
/// does not start an extension.
pub fn extension_of(filename: &str) -> Option<&str> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext)
}

/// Builds a fresh `<uuid>[.<ext>]` name for an upload.
pub fn generate_name(original: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match original.and_then(extension_of) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Whether `name` can refer to an entry directly inside the upload root.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
