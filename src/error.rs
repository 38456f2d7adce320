//! Error types for the clustering engine.

use thiserror::Error;

/// Failures reported by a compute dispatch backend.
///
/// Every backend failure is fatal for the run that observed it: the
/// orchestrator surfaces the first one and never retries.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested grid is malformed (zero-sized groups, or a global size
    /// that is not a multiple of the group size).
    #[error("invalid nd-range: global size {global_size}, local size {local_size}")]
    InvalidRange {
        global_size: usize,
        local_size: usize,
    },

    /// The grid does not have enough work groups to cover the output buffer.
    #[error("kernel `{kernel}` needs {required} work groups, grid provides {available}")]
    GridTooSmall {
        kernel: &'static str,
        required: usize,
        available: usize,
    },

    /// A kernel declared a zero-width output chunk per work group.
    #[error("kernel `{kernel}` declares an empty output chunk per work group")]
    EmptyGroupOutput { kernel: &'static str },

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    /// A work group panicked while executing a kernel.
    #[error("kernel `{kernel}` aborted: {message}")]
    KernelPanicked {
        kernel: &'static str,
        message: String,
    },
}

/// Errors returned by the public clustering API.
#[derive(Debug, Error)]
pub enum KMeansError {
    #[error("cluster count {actual} exceeds the supported maximum of {max}")]
    TooManyClusters { actual: usize, max: usize },

    #[error("cluster count must be at least 1")]
    NoClusters,

    #[error("point count {actual} exceeds the supported maximum of {max}")]
    TooManyPoints { actual: usize, max: usize },

    #[error("point count must be at least 1")]
    NoPoints,

    /// A caller buffer does not match the declared element count.
    #[error("{buffer} holds {actual} elements, expected {expected}")]
    LengthMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// The accumulated partial counts do not add up to the number of points.
    #[error("partial bank accounts for {actual} points, expected {expected}")]
    PartialCountMismatch { expected: u64, actual: u64 },

    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file or config document could not be decoded.
    #[error("format error: {0}")]
    Format(String),
}

impl KMeansError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// True for errors raised while validating inputs, before any dispatch.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::TooManyClusters { .. }
                | Self::NoClusters
                | Self::TooManyPoints { .. }
                | Self::NoPoints
                | Self::LengthMismatch { .. }
                | Self::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KMeansError>;
