//! File-backed substrate with atomic replace.
//!
//! One file per key. Writes go to a temporary file in the same directory,
//! are synced, then renamed over the target, so a reader never observes a
//! half-written value. There is deliberately no cross-process lock: the
//! store keeps the same last-write-wins semantics as browser storage.

use palaver_core::error::Result;
use palaver_core::storage::KeyValueStore;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{ErrorKind, Write as IoWrite};
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// Key-value store persisted as `<dir>/<escaped key>.json`.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", escape_key(key)))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.{EXTENSION}.tmp", escape_key(key)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let tmp_path = self.temp_path_for(key);
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(value.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, self.path_for(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(stem) = name.strip_suffix(&format!(".{EXTENSION}")) else {
                continue;
            };
            match unescape_key(stem) {
                Some(key) => keys.push(key),
                None => tracing::warn!(file = name, "Skipping file with undecodable key name"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Percent-encodes `key` into a file stem.
///
/// A leading `.` is encoded too so keys never collide with temp files.
fn escape_key(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

fn unescape_key(escaped: &str) -> Option<String> {
    urlencoding::decode(escaped).ok().map(Cow::into_owned)
}
