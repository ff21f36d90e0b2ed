//! Crate-wide error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GanttError {
    #[error("No renderable surface: {0}")]
    InvalidSurface(String),

    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Unknown unit '{0}'")]
    InvalidUnit(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Popup for task '{0}' has no anchor bar")]
    PopupWithoutTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Import error: {0}")]
    Import(String),
}

pub type Result<T> = std::result::Result<T, GanttError>;

/// Why an edit to a bar was refused. Rejected edits leave geometry untouched
/// and fire no events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditRejection {
    #[error("task '{0}' does not exist")]
    UnknownTask(String),

    #[error("chart is view-only")]
    ViewOnly,

    #[error("both edges of '{0}' are locked")]
    BothEdgesLocked(String),

    #[error("start edge of '{0}' is locked")]
    StartLocked(String),

    #[error("end edge of '{0}' is locked")]
    EndLocked(String),

    #[error("end of '{0}' would fall before its start")]
    EndBeforeStart(String),

    #[error("'{task}' would start before predecessor '{predecessor}' ends")]
    DependencyFloor { task: String, predecessor: String },

    #[error("subtask '{0}' has a locked edge")]
    DescendantLocked(String),

    #[error("resource change disabled for '{0}'")]
    ResourceChangeDisabled(String),

    #[error("resources '{from}' and '{to}' are not related")]
    ResourceNotRelated { from: String, to: String },

    #[error("no resource row at index {0}")]
    NoSuchRow(i64),
}

pub type EditResult<T> = std::result::Result<T, EditRejection>;
