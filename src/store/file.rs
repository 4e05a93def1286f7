use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::core::{Error, Result};
use super::{MemoryStore, VariableStore, STORE_SIZE};

/// Snapshot format version
const SNAPSHOT_VERSION: u8 = 1;

/// On-disk form of the store image
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    version: u8,
    bytes: Vec<u8>,
}

/// Variable store persisted to a file
///
/// Writes go to an in-memory image; `commit` rewrites the file when the
/// image changed since the last commit.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    image: MemoryStore,
    dirty: bool,
}

impl FileStore {
    /// Opens the store at `path`, starting erased if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let image = if path.exists() {
            let raw = fs::read(&path)?;
            let snapshot: StoreSnapshot = bincode::deserialize(&raw)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(Error::store(format!(
                    "Unsupported snapshot version {}",
                    snapshot.version
                )));
            }
            let bytes: [u8; STORE_SIZE] = snapshot.bytes.as_slice().try_into().map_err(|_| {
                Error::store(format!(
                    "Snapshot holds {} bytes, expected {}",
                    snapshot.bytes.len(),
                    STORE_SIZE
                ))
            })?;
            tracing::debug!(path = %path.display(), "Loaded variable store snapshot");
            MemoryStore::from_image(bytes)
        } else {
            tracing::debug!(path = %path.display(), "No snapshot found, starting erased");
            MemoryStore::new()
        };

        Ok(FileStore {
            path,
            image,
            dirty: false,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VariableStore for FileStore {
    fn read_byte(&self, addr: u16) -> u8 {
        self.image.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if usize::from(addr) < STORE_SIZE && self.image.read_byte(addr) != value {
            self.image.write_byte(addr, value);
            self.dirty = true;
        }
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let snapshot = StoreSnapshot {
            version: SNAPSHOT_VERSION,
            bytes: self.image.image().to_vec(),
        };
        let encoded = bincode::serialize(&snapshot)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        tracing::trace!(path = %self.path.display(), "Variable store committed");
        Ok(())
    }
}
