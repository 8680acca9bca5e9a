//! Save slots as JSON files in a directory.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use guild_game::{SaveStorage, StorageError};
use log::debug;

const SLOT_EXTENSION: &str = "json";
const MAX_KEY_LEN: usize = 64;

/// One `<key>.json` file per slot under `root`. Clones share the directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

/// Listing entry for a stored slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub key: String,
    pub modified: DateTime<Local>,
    pub bytes: u64,
}

impl FileStorage {
    /// Open `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| io_error(&root.display().to_string(), source))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{SLOT_EXTENSION}")))
    }

    /// Metadata for `key`, `None` if the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid keys or unreadable metadata.
    pub fn slot_info(&self, key: &str) -> Result<Option<SlotInfo>, StorageError> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(SlotInfo {
                key: key.to_string(),
                modified: meta
                    .modified()
                    .map(DateTime::<Local>::from)
                    .map_err(|source| io_error(key, source))?,
                bytes: meta.len(),
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(key, source)),
        }
    }

    /// Every stored slot, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn slots(&self) -> Result<Vec<SlotInfo>, StorageError> {
        let root = self.root.display().to_string();
        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|source| io_error(&root, source))? {
            let path = entry.map_err(|source| io_error(&root, source))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_key(key).is_err() {
                continue;
            }
            if let Some(info) = self.slot_info(key)? {
                slots.push(info);
            }
        }
        slots.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(slots)
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl SaveStorage for FileStorage {
    fn save(&self, key: &str, json: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|source| io_error(key, source))?;
        fs::rename(&staging, &path).map_err(|source| io_error(key, source))?;
        debug!("wrote {} bytes to {}", json.len(), path.display());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(json)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(key, source)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(key, source)),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.path_for(key)?.is_file())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("guild-sim-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn slots_round_trip_through_files() {
        let storage = FileStorage::open(temp_dir("roundtrip")).unwrap();
        assert!(!storage.exists("alpha").unwrap());
        storage.save("alpha", r#"{"a":1}"#).unwrap();
        assert!(storage.exists("alpha").unwrap());
        assert_eq!(storage.load("alpha").unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert!(storage.root().join("alpha.json").is_file());

        storage.save("alpha", "{}").unwrap();
        assert_eq!(storage.load("alpha").unwrap().as_deref(), Some("{}"));

        storage.delete("alpha").unwrap();
        storage.delete("alpha").unwrap();
        assert!(storage.load("alpha").unwrap().is_none());
    }

    #[test]
    fn rejects_keys_that_escape_the_directory() {
        let storage = FileStorage::open(temp_dir("keys")).unwrap();
        let long = "x".repeat(65);
        for key in ["", "../evil", "a/b", "dot.name", long.as_str()] {
            assert!(
                matches!(storage.save(key, "{}"), Err(StorageError::InvalidKey(_))),
                "{key:?} accepted"
            );
        }
        assert!(storage.save("greedy-1337_b", "{}").is_ok());
    }

    #[test]
    fn lists_slots_with_timestamps() {
        let storage = FileStorage::open(temp_dir("listing")).unwrap();
        storage.save("b", "{}").unwrap();
        storage.save("a", "[1,2]").unwrap();
        fs::write(storage.root().join("notes.txt"), "ignored").unwrap();

        let slots = storage.slots().unwrap();
        let keys: Vec<&str> = slots.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(slots[0].bytes, 5);
        assert!(slots[0].modified <= Local::now());
        assert!(storage.slot_info("missing").unwrap().is_none());
    }

    #[test]
    fn clones_share_the_directory() {
        let storage = FileStorage::open(temp_dir("clones")).unwrap();
        let twin = storage.clone();
        twin.save("shared", "{}").unwrap();
        assert!(storage.exists("shared").unwrap());
    }
}
