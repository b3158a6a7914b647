use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub history: Vec<String>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            history: Vec::new(),
        }
    }

    /// Case-insensitive title comparison; titles are the only identity a task has.
    pub fn is_named(&self, name: &str) -> bool {
        self.title.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// When backups are taken besides an explicit `backup export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackupPolicy {
    #[serde(default)]
    pub on_every_mutation: bool,
    #[serde(default = "default_on_exit")]
    pub on_exit: bool,
    #[serde(default)]
    pub on_startup_restore_latest: bool,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            on_every_mutation: false,
            on_exit: default_on_exit(),
            on_startup_restore_latest: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_store_file")]
    pub store_file: String,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    #[serde(default = "default_confirm_delete")]
    pub confirm_delete: bool,
    #[serde(default)]
    pub backup: BackupPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_file: default_store_file(),
            backup_dir: default_backup_dir(),
            confirm_delete: default_confirm_delete(),
            backup: BackupPolicy::default(),
        }
    }
}

fn default_on_exit() -> bool {
    true
}

fn default_store_file() -> String {
    "tasks.json".to_string()
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_confirm_delete() -> bool {
    true
}
