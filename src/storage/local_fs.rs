use super::*;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Appended to the upload root's name to form the staging directory.
const STAGING_SUFFIX: &str = ".staging";

pub struct LocalFileStorage {
    storage_path: PathBuf,
    staging_path: PathBuf,
}

impl LocalFileStorage {
    /// Creates the upload root and, next to it, the directory partial uploads
    /// are written to. Both live on the same filesystem so publishing is a
    /// plain rename.
    pub fn new(storage_path: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&storage_path)?;
        let staging_path = staging_dir_for(&std::fs::canonicalize(&storage_path)?)?;
        std::fs::create_dir_all(&staging_path)?;

        Ok(Self {
            storage_path,
            staging_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.storage_path
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_path
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_name(name) {
            return Err(StorageError::InvalidName);
        }
        Ok(self.storage_path.join(name))
    }
}

/// `<parent>/<root name>.staging` for an absolute upload root.
fn staging_dir_for(root: &Path) -> Result<PathBuf, StorageError> {
    let Some(root_name) = root.file_name() else {
        return Err(std::io::Error::other("upload root must not be a filesystem root").into());
    };

    let mut name = OsString::from(root_name);
    name.push(STAGING_SUFFIX);
    Ok(root.with_file_name(name))
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn stage(&self) -> Result<Box<dyn StagedWrite>, StorageError> {
        let path = self.staging_path.join(Uuid::new_v4().to_string());
        let file = fs::File::create(&path).await?;

        Ok(Box::new(LocalStagedFile {
            file: Some(file),
            path,
            root: self.storage_path.clone(),
            written: 0,
            committed: false,
        }))
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(&self.storage_path).await?;

        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }

        Ok(files)
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let file_path = self.path_for(name)?;

        fs::remove_file(file_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::Io(e),
        })
    }
}

struct LocalStagedFile {
    file: Option<fs::File>,
    path: PathBuf,
    root: PathBuf,
    written: u64,
    committed: bool,
}

#[async_trait]
impl StagedWrite for LocalStagedFile {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("staged file already closed"))?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }

    async fn commit(mut self: Box<Self>, name: &str) -> Result<StoredFile, StorageError> {
        if !is_valid_name(name) {
            return Err(StorageError::InvalidName);
        }

        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        fs::rename(&self.path, self.root.join(name)).await?;
        self.committed = true;

        Ok(StoredFile {
            name: name.to_string(),
            size: self.written,
        })
    }
}

impl Drop for LocalStagedFile {
    fn drop(&mut self) {
        if !self.committed {
            // The handle must be closed before unlinking on some platforms.
            self.file.take();
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to discard staged upload");
                }
            }
        }
    }
}
