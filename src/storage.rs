use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Settings, Task};

const SETTINGS_FILE: &str = "settings.json";
const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXT: &str = "json";
const BACKUP_STAMP: &str = "%Y%m%d_%H%M%S";
const HOME_ENV: &str = "TASK_SHELL_HOME";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt data in {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backup '{0}' not found")]
    NotFound(String),
}

/// Name of a backup blob, `backup_YYYYMMDD_HHMMSS`. Ordering follows the embedded timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackupId(String);

impl BackupId {
    pub fn at(timestamp: NaiveDateTime) -> Self {
        Self(format!("{BACKUP_PREFIX}{}", timestamp.format(BACKUP_STAMP)))
    }

    /// Accepts `backup_YYYYMMDD_HHMMSS` with or without the `.json` extension.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let stem = name
            .strip_suffix(&format!(".{BACKUP_EXT}"))
            .unwrap_or(name);
        let stamp = stem.strip_prefix(BACKUP_PREFIX)?;
        NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP).ok()?;
        Some(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.{BACKUP_EXT}", self.0)
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data directory: `TASK_SHELL_HOME` when set, the working directory otherwise.
pub fn default_root() -> PathBuf {
    std::env::var_os(HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub struct Storage {
    root: PathBuf,
    store_path: PathBuf,
    backup_dir: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self::with_settings(root, &Settings::default())
    }

    pub fn with_settings(root: PathBuf, settings: &Settings) -> Self {
        let store_path = root.join(&settings.store_file);
        let backup_dir = root.join(&settings.backup_dir);
        Self {
            root,
            store_path,
            backup_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.backup_dir)?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let path = self.root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Settings::default());
        }
        self.load_json(&path)
    }

    /// A missing store blob is an empty collection.
    pub fn load_store(&self) -> Result<Vec<Task>, StorageError> {
        if !self.store_path.exists() {
            return Ok(Vec::new());
        }
        self.load_json(&self.store_path)
    }

    pub fn save_store(&self, tasks: &[Task]) -> Result<(), StorageError> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write_atomic(&self.store_path, tasks)
    }

    pub fn write_backup(&self, tasks: &[Task]) -> Result<BackupId, StorageError> {
        self.write_backup_at(tasks, chrono::Local::now().naive_local())
    }

    /// Backups sharing a second overwrite each other.
    pub fn write_backup_at(
        &self,
        tasks: &[Task],
        timestamp: NaiveDateTime,
    ) -> Result<BackupId, StorageError> {
        self.ensure_dirs()?;
        let id = BackupId::at(timestamp);
        self.write_atomic(&self.backup_dir.join(id.file_name()), tasks)?;
        Ok(id)
    }

    /// Unordered; files outside the naming scheme are skipped.
    pub fn list_backups(&self) -> Result<Vec<BackupId>, StorageError> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut results = Vec::new();
        for entry in entries.filter_map(|entry| entry.ok()) {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.ends_with(&format!(".{BACKUP_EXT}")) {
                continue;
            }
            if let Some(id) = BackupId::parse(name) {
                results.push(id);
            }
        }
        Ok(results)
    }

    pub fn backup_exists(&self, id: &BackupId) -> bool {
        self.backup_dir.join(id.file_name()).is_file()
    }

    pub fn read_backup(&self, id: &BackupId) -> Result<Vec<Task>, StorageError> {
        let path = self.backup_dir.join(id.file_name());
        if !path.is_file() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        self.load_json(&path)
    }

    pub fn read_from_path(&self, source: &Path) -> Result<Vec<Task>, StorageError> {
        if !source.is_file() {
            return Err(StorageError::NotFound(source.display().to_string()));
        }
        self.load_json(source)
    }

    fn load_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        serde_json::from_str(&buf).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_atomic<T: Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}
