//! Object store — one file per object id.
//!
//! Objects live flat under the store root:
//!   {root}/{id}.dat
//!
//! The path is built only from the numeric id, so no client-supplied text
//! ever reaches the filesystem. Writes go to `{id}.dat.part` and are renamed
//! into place on commit, so a reader never sees a half-written object.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Extension of committed objects.
pub const OBJECT_EXTENSION: &str = "dat";

/// Extension appended while an object is being written.
pub const STAGING_EXTENSION: &str = "part";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {0} not found")]
    NotFound(u32),

    #[error("failed to create store root {0}: {1}")]
    RootFailed(PathBuf, std::io::Error),

    #[error("I/O error on {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// Maps object ids to files under a root directory.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Open a store rooted at the given directory, creating it if needed.
    ///
    /// Staging files left behind by an interrupted process are removed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::RootFailed(root.clone(), e))?;
        let store = Self { root };
        let swept = store.sweep_staging();
        if swept > 0 {
            tracing::info!(root = %store.root.display(), swept, "removed stale staging files");
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a committed object.
    pub fn object_path(&self, id: u32) -> PathBuf {
        self.root.join(format!("{id}.{OBJECT_EXTENSION}"))
    }

    fn staging_path(&self, id: u32) -> PathBuf {
        self.root
            .join(format!("{id}.{OBJECT_EXTENSION}.{STAGING_EXTENSION}"))
    }

    /// Start writing a new object. The previous object with this id, if any,
    /// stays readable until the writer is committed.
    pub async fn create(&self, id: u32) -> Result<ObjectWriter, StoreError> {
        let staging = self.staging_path(id);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .await
            .map_err(|e| StoreError::Io(staging.clone(), e))?;
        Ok(ObjectWriter {
            id,
            file,
            staging,
            target: self.object_path(id),
            finished: false,
        })
    }

    /// Open a committed object for reading.
    pub async fn open(&self, id: u32) -> Result<ObjectReader, StoreError> {
        let path = self.object_path(id);
        match File::open(&path).await {
            Ok(file) => Ok(ObjectReader { id, file, path }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(StoreError::Io(path, e)),
        }
    }

    /// Delete a committed object.
    pub async fn remove(&self, id: u32) -> Result<(), StoreError> {
        let path = self.object_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(StoreError::Io(path, e)),
        }
    }

    pub async fn contains(&self, id: u32) -> bool {
        fs::try_exists(self.object_path(id)).await.unwrap_or(false)
    }

    fn sweep_staging(&self) -> usize {
        let mut swept = 0;
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some(STAGING_EXTENSION)
                    && std::fs::remove_file(&path).is_ok()
                {
                    swept += 1;
                }
            }
        }
        swept
    }
}

/// An object being written. Dropped without `commit`, it leaves no trace.
#[derive(Debug)]
pub struct ObjectWriter {
    id: u32,
    file: File,
    staging: PathBuf,
    target: PathBuf,
    finished: bool,
}

impl ObjectWriter {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Append bytes. Returns how many were written; fewer than requested
    /// means the underlying file stopped accepting data.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<usize, StoreError> {
        let mut written = 0;
        while written < bytes.len() {
            match self.file.write(&bytes[written..]).await {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StoreError::Io(self.staging.clone(), e)),
            }
        }
        // Writes are buffered; a failing disk only reports on flush.
        self.file
            .flush()
            .await
            .map_err(|e| StoreError::Io(self.staging.clone(), e))?;
        Ok(written)
    }

    /// Bytes written so far, as seen by the filesystem.
    pub async fn size(&mut self) -> Result<u64, StoreError> {
        self.file
            .flush()
            .await
            .map_err(|e| StoreError::Io(self.staging.clone(), e))?;
        let meta = self
            .file
            .metadata()
            .await
            .map_err(|e| StoreError::Io(self.staging.clone(), e))?;
        Ok(meta.len())
    }

    /// Sync and atomically move the object into place.
    pub async fn commit(mut self) -> Result<(), StoreError> {
        self.file
            .sync_all()
            .await
            .map_err(|e| StoreError::Io(self.staging.clone(), e))?;
        fs::rename(&self.staging, &self.target)
            .await
            .map_err(|e| StoreError::Io(self.target.clone(), e))?;
        self.finished = true;
        tracing::trace!(object_id = self.id, "object committed");
        Ok(())
    }

    /// Throw the partial object away.
    pub async fn discard(mut self) {
        self.finished = true;
        if let Err(e) = fs::remove_file(&self.staging).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(object_id = self.id, error = %e, "failed to remove staging file");
            }
        }
    }
}

#[cfg(test)]
impl ObjectWriter {
    /// Swap the staging file for a read-only handle so every write fails.
    pub(crate) async fn make_unwritable(&mut self) {
        self.file = File::open(&self.staging).await.unwrap();
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = std::fs::remove_file(&self.staging);
        }
    }
}

/// A committed object open for reading.
#[derive(Debug)]
pub struct ObjectReader {
    id: u32,
    file: File,
    path: PathBuf,
}

impl ObjectReader {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Read until `buf` is full or the object is exhausted. A return value
    /// smaller than `buf.len()` means end of object.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StoreError::Io(self.path.clone(), e)),
            }
        }
        Ok(filled)
    }

    pub async fn size(&self) -> Result<u64, StoreError> {
        self.file
            .metadata()
            .await
            .map(|m| m.len())
            .map_err(|e| StoreError::Io(self.path.clone(), e))
    }
}
