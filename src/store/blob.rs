//! Blob Store Module
//!
//! File-per-key payload storage with key-ordered iteration.
//!
//! Keys are hex-encoded into filenames so arbitrary UTF-8 keys map onto
//! filesystem-safe names. Lowercase fixed-width hex preserves the
//! lexicographic order of the underlying key bytes, so a sorted directory
//! listing yields keys in key order.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::Result;

// == Blob Store ==
/// Stores opaque byte payloads keyed by string, one file per key.
///
/// The store has no expiration knowledge; lifecycle decisions belong to the
/// metadata store and the engine. All operations go through `tokio::fs`.
#[derive(Debug)]
pub struct BlobStore {
    /// Directory holding one `<hex key>.blob` file per item
    dir: PathBuf,
}

impl BlobStore {
    // == Open ==
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Maps a key to its backing file path.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.blob", hex::encode(key.as_bytes())))
    }

    // == Put ==
    /// Writes (or overwrites) the payload for `key`.
    pub async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    // == Get ==
    /// Reads the payload for `key`, or None if absent.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    // == Exists ==
    /// Checks whether a payload exists for `key`.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match fs::metadata(self.path_for(key)).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    // == Delete ==
    /// Removes the payload for `key`. Not an error if the key is absent.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    // == Clear ==
    /// Removes all payloads.
    pub async fn clear(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    // == Keys ==
    /// Returns all stored keys in ascending key order.
    ///
    /// Files whose names do not decode back to a UTF-8 key are skipped; only
    /// this store writes into its directory, so such files are foreign.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(encoded) = name.strip_suffix(".blob") else { continue };
            let Ok(bytes) = hex::decode(encoded) else { continue };
            let Ok(key) = String::from_utf8(bytes) else { continue };
            keys.push(key);
        }
        keys.sort();
        Ok(keys)
    }
}
