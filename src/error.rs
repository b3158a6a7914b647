use crate::storage::StorageError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task title must not be empty")]
    InvalidTitle,
    #[error("task '{0}' already exists")]
    DuplicateTitle(String),
    #[error("task '{0}' not found")]
    NotFound(String),
    #[error("note must not be empty")]
    InvalidNote,
    #[error("task '{0}' has no notes to edit")]
    EmptyHistory(String),
    #[error("note number {index} is out of range (1-{len})")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("usage: {0}")]
    Usage(String),
    #[error("unrecognized command '{0}', type 'help' for the command list")]
    UnrecognizedCommand(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
