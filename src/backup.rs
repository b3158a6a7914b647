use std::path::Path;

use crate::error::{Error, Result};
use crate::models::BackupPolicy;
use crate::storage::{BackupId, Storage, StorageError};
use crate::store::TaskStore;

/// Where an import was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    Backup(BackupId),
    Path(String),
}

impl std::fmt::Display for ImportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportSource::Backup(id) => write!(f, "{id}"),
            ImportSource::Path(path) => f.write_str(path),
        }
    }
}

/// What the startup restore step did.
#[derive(Debug)]
pub enum StartupRestore {
    Skipped,
    Restored(BackupId),
    /// The store blob stays as loaded.
    Failed(Error),
}

/// Couples the task store with persistence and the configured backup policy.
pub struct BackupCoordinator {
    storage: Storage,
    policy: BackupPolicy,
}

impl BackupCoordinator {
    pub fn new(storage: Storage, policy: BackupPolicy) -> Self {
        Self { storage, policy }
    }

    pub fn policy(&self) -> &BackupPolicy {
        &self.policy
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Loads the persisted store, then applies startup restore when configured.
    /// Only an unreadable store blob is fatal; a failed restore is handed back to the caller.
    pub fn load(&self) -> Result<(TaskStore, StartupRestore)> {
        let mut store = TaskStore::new(self.storage.load_store()?);
        log::info!(
            "store loaded path={} tasks={}",
            self.storage.store_path().display(),
            store.len()
        );
        if !self.policy.on_startup_restore_latest {
            return Ok((store, StartupRestore::Skipped));
        }
        let restore = match self.restore_latest(&mut store) {
            Ok(Some(id)) => StartupRestore::Restored(id),
            Ok(None) => StartupRestore::Skipped,
            Err(err) => {
                log::warn!("startup restore failed, keeping store blob: {err}");
                StartupRestore::Failed(err)
            }
        };
        Ok((store, restore))
    }

    /// Persists a committed mutation; also snapshots it when backing up on every mutation.
    pub fn commit(&self, store: &TaskStore) -> Result<Option<BackupId>> {
        self.storage.save_store(store.tasks())?;
        if !self.policy.on_every_mutation {
            return Ok(None);
        }
        let id = self.storage.write_backup(store.tasks())?;
        log::info!("mutation backup written id={id}");
        Ok(Some(id))
    }

    pub fn export(&self, store: &TaskStore) -> Result<BackupId> {
        let id = self.storage.write_backup(store.tasks())?;
        log::info!("backup exported id={id} tasks={}", store.len());
        Ok(id)
    }

    pub fn on_exit(&self, store: &TaskStore) -> Result<Option<BackupId>> {
        if !self.policy.on_exit {
            return Ok(None);
        }
        self.export(store).map(Some)
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<BackupId>> {
        let mut ids = self.storage.list_backups()?;
        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// The most recent backup becomes authoritative and overwrites the store blob.
    pub fn restore_latest(&self, store: &mut TaskStore) -> Result<Option<BackupId>> {
        let Some(latest) = self.storage.list_backups()?.into_iter().max() else {
            return Ok(None);
        };
        let restored = TaskStore::new(self.storage.read_backup(&latest)?);
        self.storage.save_store(restored.tasks())?;
        *store = restored;
        log::info!("restored latest backup id={latest} tasks={}", store.len());
        Ok(Some(latest))
    }

    /// Resolves a backup name first, then a file path.
    pub fn import(&self, store: &mut TaskStore, id_or_path: &str) -> Result<ImportSource> {
        let target = id_or_path.trim();
        let known = BackupId::parse(target).filter(|id| self.storage.backup_exists(id));
        let (tasks, source) = match known {
            Some(id) => (self.storage.read_backup(&id)?, ImportSource::Backup(id)),
            None => {
                let path = Path::new(target);
                if target.is_empty() || !path.is_file() {
                    return Err(StorageError::NotFound(target.to_string()).into());
                }
                (
                    self.storage.read_from_path(path)?,
                    ImportSource::Path(target.to_string()),
                )
            }
        };
        store.replace_all(tasks);
        self.storage.save_store(store.tasks())?;
        log::info!("imported source={source} tasks={}", store.len());
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use chrono::NaiveDate;
    use std::fs;

    fn stamp(s: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, s)
            .unwrap()
    }

    fn coordinator(dir: &tempfile::TempDir, policy: BackupPolicy) -> BackupCoordinator {
        BackupCoordinator::new(Storage::new(dir.path().to_path_buf()), policy)
    }

    fn store_with(titles: &[&str]) -> TaskStore {
        TaskStore::new(titles.iter().map(|title| Task::new(*title)).collect())
    }

    #[test]
    fn commit_persists_and_only_backs_up_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let plain = coordinator(&dir, BackupPolicy::default());
        let store = store_with(&["a"]);

        assert_eq!(plain.commit(&store).unwrap(), None);
        assert_eq!(plain.storage().load_store().unwrap(), store.tasks());
        assert!(plain.list().unwrap().is_empty());

        let eager = coordinator(
            &dir,
            BackupPolicy {
                on_every_mutation: true,
                ..BackupPolicy::default()
            },
        );
        let id = eager.commit(&store).unwrap().expect("backup on mutation");
        assert_eq!(eager.storage().read_backup(&id).unwrap(), store.tasks());
    }

    #[test]
    fn on_exit_follows_policy() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&["a"]);

        let off = coordinator(
            &dir,
            BackupPolicy {
                on_exit: false,
                ..BackupPolicy::default()
            },
        );
        assert_eq!(off.on_exit(&store).unwrap(), None);
        assert!(off.list().unwrap().is_empty());

        let on = coordinator(&dir, BackupPolicy::default());
        let id = on.on_exit(&store).unwrap().expect("exit backup");
        assert_eq!(on.list().unwrap(), vec![id]);
    }

    #[test]
    fn list_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let backups = coordinator(&dir, BackupPolicy::default());
        let storage = backups.storage();
        let first = storage.write_backup_at(&[], stamp(1)).unwrap();
        let third = storage.write_backup_at(&[], stamp(3)).unwrap();
        let second = storage.write_backup_at(&[], stamp(2)).unwrap();
        assert_eq!(backups.list().unwrap(), vec![third, second, first]);
    }

    #[test]
    fn restore_latest_without_backups_keeps_loaded_store() {
        let dir = tempfile::tempdir().unwrap();
        let backups = coordinator(&dir, BackupPolicy::default());
        let mut store = store_with(&["kept"]);
        assert_eq!(backups.restore_latest(&mut store).unwrap(), None);
        assert_eq!(store.titles(), vec!["kept"]);
    }

    #[test]
    fn restore_latest_overwrites_store_blob_with_newest_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backups = coordinator(&dir, BackupPolicy::default());
        let storage = backups.storage();
        storage.write_backup_at(&[Task::new("old")], stamp(1)).unwrap();
        let newest = storage.write_backup_at(&[Task::new("new")], stamp(9)).unwrap();
        storage.save_store(&[Task::new("current")]).unwrap();

        let mut store = TaskStore::new(storage.load_store().unwrap());
        assert_eq!(backups.restore_latest(&mut store).unwrap(), Some(newest));
        assert_eq!(store.titles(), vec!["new"]);
        assert_eq!(storage.load_store().unwrap(), vec![Task::new("new")]);
    }

    #[test]
    fn load_applies_startup_restore_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.save_store(&[Task::new("current")]).unwrap();
        let id = storage.write_backup_at(&[Task::new("backup")], stamp(5)).unwrap();

        let (store, restored) = coordinator(&dir, BackupPolicy::default()).load().unwrap();
        assert_eq!(store.titles(), vec!["current"]);
        assert!(matches!(restored, StartupRestore::Skipped));

        let policy = BackupPolicy {
            on_startup_restore_latest: true,
            ..BackupPolicy::default()
        };
        let (store, restored) = coordinator(&dir, policy).load().unwrap();
        assert_eq!(store.titles(), vec!["backup"]);
        assert!(matches!(restored, StartupRestore::Restored(got) if got == id));
    }

    fn write_corrupt_backup(dir: &tempfile::TempDir, id: &BackupId) {
        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        fs::write(backup_dir.join(id.file_name()), b"{ broken").unwrap();
    }

    #[test]
    fn load_keeps_store_blob_when_latest_backup_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.save_store(&[Task::new("current")]).unwrap();
        storage.write_backup_at(&[Task::new("older")], stamp(1)).unwrap();
        write_corrupt_backup(&dir, &BackupId::at(stamp(9)));

        let policy = BackupPolicy {
            on_startup_restore_latest: true,
            ..BackupPolicy::default()
        };
        let (store, restored) = coordinator(&dir, policy).load().unwrap();
        assert_eq!(store.titles(), vec!["current"]);
        assert!(matches!(
            restored,
            StartupRestore::Failed(Error::Storage(StorageError::Corrupt { .. }))
        ));
        assert_eq!(storage.load_store().unwrap(), vec![Task::new("current")]);
    }

    #[test]
    fn load_fails_on_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tasks.json"), b"[{]").unwrap();
        let err = coordinator(&dir, BackupPolicy::default())
            .load()
            .expect_err("corrupt store");
        assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })));
    }

    #[test]
    fn import_by_name_replaces_everything_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let backups = coordinator(&dir, BackupPolicy::default());
        let id = backups
            .storage()
            .write_backup_at(&[Task::new("from backup")], stamp(7))
            .unwrap();

        let mut store = store_with(&["unsaved", "other"]);
        let source = backups.import(&mut store, &id.file_name()).unwrap();
        assert_eq!(source, ImportSource::Backup(id));
        assert_eq!(store.titles(), vec!["from backup"]);
        assert_eq!(
            backups.storage().load_store().unwrap(),
            vec![Task::new("from backup")]
        );
    }

    #[test]
    fn import_by_path_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backups = coordinator(&dir, BackupPolicy::default());
        let external = dir.path().join("shared.json");
        fs::write(
            &external,
            serde_json::to_string_pretty(&vec![Task::new("shared")]).unwrap(),
        )
        .unwrap();

        let mut store = TaskStore::default();
        let path = external.to_string_lossy().to_string();
        assert_eq!(
            backups.import(&mut store, &path).unwrap(),
            ImportSource::Path(path.clone())
        );
        assert_eq!(store.titles(), vec!["shared"]);

        for missing in ["backup_20260102_030400", "nowhere.json", ""] {
            let err = backups.import(&mut store, missing).unwrap_err();
            assert!(matches!(err, Error::Storage(StorageError::NotFound(_))));
        }
        // Failed imports leave the store untouched.
        assert_eq!(store.titles(), vec!["shared"]);
    }

    #[test]
    fn import_of_corrupt_backup_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backups = coordinator(&dir, BackupPolicy::default());
        backups.storage().save_store(&[Task::new("saved")]).unwrap();
        let id = BackupId::at(stamp(4));
        write_corrupt_backup(&dir, &id);

        let mut store = store_with(&["saved", "unsaved"]);
        let err = backups.import(&mut store, id.as_str()).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })));
        assert_eq!(store.titles(), vec!["saved", "unsaved"]);
        assert_eq!(
            backups.storage().load_store().unwrap(),
            vec![Task::new("saved")]
        );
    }
}
