use crate::models::Task;
use crate::storage::BackupId;
use crate::store::{Filter, SearchHit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub index: usize,
    pub title: String,
    pub completed: bool,
}

impl TaskRow {
    pub fn new(index: usize, task: &Task) -> Self {
        Self {
            index,
            title: task.title.clone(),
            completed: task.completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub task: TaskRow,
    pub notes: Vec<(usize, String)>,
}

impl From<SearchHit<'_>> for SearchRow {
    fn from(hit: SearchHit<'_>) -> Self {
        Self {
            task: TaskRow::new(hit.index, hit.task),
            notes: hit
                .notes
                .into_iter()
                .map(|(n, note)| (n, note.to_string()))
                .collect(),
        }
    }
}

/// Everything the interpreter hands to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Status { severity: Severity, message: String },
    Tasks { filter: Filter, rows: Vec<TaskRow> },
    History { title: String, notes: Vec<String> },
    SearchResults { keyword: String, rows: Vec<SearchRow> },
    Backups(Vec<BackupId>),
    Help(&'static str),
    ClearScreen,
}

impl Event {
    pub fn info(message: impl Into<String>) -> Self {
        Self::status(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::status(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::status(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::status(Severity::Error, message)
    }

    fn status(severity: Severity, message: impl Into<String>) -> Self {
        Self::Status {
            severity,
            message: message.into(),
        }
    }
}
