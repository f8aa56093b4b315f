use std::path::PathBuf;

/// The one error taxonomy shared by every crate in the workspace (§7).
///
/// Library code never panics on a caller-reachable condition; every
/// fallible operation returns this type (or a crate type that converts
/// into it) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File absent, wrong magic, unsupported version, or an internally
    /// inconsistent header (e.g. matrix size != lines * electrodes).
    #[error("invalid input in {context}: {detail}")]
    InvalidInput { context: String, detail: String },

    /// Empty volume, empty point cloud, all-background MRI, zero median
    /// distance, or any other structurally-empty intermediate result.
    #[error("degenerate result in {context}: {detail}")]
    Degenerate { context: String, detail: String },

    /// A statistic was requested over fewer samples than it requires
    /// (e.g. the median of zero samples).
    #[error("not enough data for {operation}: need at least {needed}, have {have}")]
    NotEnoughData {
        operation: String,
        needed: usize,
        have: usize,
    },

    /// Caller supplied an index outside a declared dimension.
    #[error("index {index} out of range 0..{bound} in {context}")]
    OutOfRange {
        context: String,
        index: usize,
        bound: usize,
    },

    /// User abort, observed via a [`crate::Progress`] gauge.
    #[error("operation cancelled during {stage}")]
    Cancelled { stage: String },

    /// Underlying filesystem read/write failure.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn invalid_input(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::InvalidInput {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub fn degenerate(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Degenerate {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub fn not_enough_data(operation: impl Into<String>, needed: usize, have: usize) -> Self {
        Error::NotEnoughData {
            operation: operation.into(),
            needed,
            have,
        }
    }

    pub fn out_of_range(context: impl Into<String>, index: usize, bound: usize) -> Self {
        Error::OutOfRange {
            context: context.into(),
            index,
            bound,
        }
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        Error::Cancelled {
            stage: stage.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// The single-line diagnostic the CLI prints on failure (§7): stage +
    /// error kind, no traceback.
    pub fn diagnostic_line(&self, stage: &str) -> String {
        format!("[{stage}] {self}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
