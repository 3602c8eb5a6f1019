use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Library error ───────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum Error {
    /// The driver called the collector out of order or with bad input.
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A histogram dict could not be interpreted.
    #[error("malformed histogram dicts: {0}")]
    HistogramDicts(String),

    #[error("artifact storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    pub fn histogram_dicts(message: impl Into<String>) -> Self {
        Self::HistogramDicts(message.into())
    }

    /// True for defects in the driver rather than runtime conditions.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

// ─── Driver misuse ───────────────────────────────────────────────

/// Programmer misuse of the lifecycle. The rejected operation leaves the
/// aggregate untouched; callers are expected to treat these as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("story '{open}' is already running")]
    AlreadyRunning { open: String },

    #[error("no story is currently running")]
    NotRunning,

    #[error("expected story '{expected}', got '{actual}'")]
    StoryMismatch { expected: String, actual: String },

    #[error("'url' is a reserved value name")]
    ReservedValueName,

    #[error("value '{name}' was recorded in '{expected}', got '{actual}'")]
    UnitMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("summary values cannot be added while a story is running")]
    SummaryValueDuringRun,

    #[error("summary value '{name}' must not be bound to a story")]
    SummaryValueHasStory { name: String },

    #[error("value '{name}' has no story")]
    PageValueWithoutStory { name: String },

    #[error("the benchmark was interrupted; no further stories may run")]
    SweepInterrupted,

    #[error("interrupt start index {index} exceeds {len} stories")]
    InterruptIndexOutOfRange { index: usize, len: usize },

    #[error("artifacts cannot be uploaded while a story is running")]
    UploadWhileRunning,
}

// ─── Collaborator errors ─────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StorageError {
    /// Network / IO hiccup; the caller may retry.
    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("storage rejected '{remote_name}': {message}")]
    Rejected {
        remote_name: String,
        message: String,
    },
}

/// A platform query that is supported but failed while running.
#[derive(Error, Debug)]
#[error("platform query '{query}' failed: {message}")]
pub struct PlatformError {
    pub query: &'static str,
    pub message: String,
}
