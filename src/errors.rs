// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera sender

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Pipeline construction or runtime errors
    Pipeline(PipelineError),
    /// Forward error correction errors
    Fec(FecError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Pipeline-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// GStreamer could not be initialized
    InitializationFailed(String),
    /// A required stage could not be created by the media runtime
    StageInstantiationFailed {
        stage: String,
        factory: String,
        reason: String,
    },
    /// Two stages could not be linked (usually a caps mismatch)
    LinkFailed { from: String, to: String },
    /// Pipeline refused a state change
    StateChangeFailed(String),
    /// Error posted on the bus while running
    Runtime(String),
}

/// Shard encoding and reconstruction errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FecError {
    /// Invalid (k, r) pair, rejected before any encode call
    InvalidConfiguration { k: u32, r: u32, reason: String },
    /// Memory for a shard buffer could not be reserved
    ShardAllocationFailed { index: usize, shard_size: usize },
    /// Fewer than k shards survived
    InsufficientShards { available: usize, required: usize },
    /// A surviving shard does not have the common shard size
    ShardSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
    /// Shard slot count differs from k + r
    ShardCountMismatch { expected: usize, actual: usize },
    /// Requested payload length exceeds what the data shards can hold
    InputLengthOutOfRange { input_len: usize, capacity: usize },
    /// Selected generator rows are not invertible
    SingularMatrix,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            AppError::Fec(e) => write!(f, "FEC error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InitializationFailed(msg) => {
                write!(f, "Initialization failed: {}", msg)
            }
            PipelineError::StageInstantiationFailed {
                stage,
                factory,
                reason,
            } => write!(
                f,
                "Failed to create stage '{}' ({}): {}",
                stage, factory, reason
            ),
            PipelineError::LinkFailed { from, to } => {
                write!(f, "Failed to link {} to {}", from, to)
            }
            PipelineError::StateChangeFailed(msg) => write!(f, "State change failed: {}", msg),
            PipelineError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for FecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FecError::InvalidConfiguration { k, r, reason } => {
                write!(f, "Invalid shard configuration k={} r={}: {}", k, r, reason)
            }
            FecError::ShardAllocationFailed { index, shard_size } => write!(
                f,
                "Resource exhausted allocating shard {} ({} bytes)",
                index, shard_size
            ),
            FecError::InsufficientShards {
                available,
                required,
            } => write!(
                f,
                "Not enough shards to reconstruct: {} available, {} required",
                available, required
            ),
            FecError::ShardSizeMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "Shard {} has {} bytes, expected {}",
                index, actual, expected
            ),
            FecError::ShardCountMismatch { expected, actual } => {
                write!(f, "Expected {} shard slots, got {}", expected, actual)
            }
            FecError::InputLengthOutOfRange {
                input_len,
                capacity,
            } => write!(
                f,
                "Payload length {} exceeds data shard capacity {}",
                input_len, capacity
            ),
            FecError::SingularMatrix => write!(f, "Decode matrix is singular"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for PipelineError {}
impl std::error::Error for FecError {}

// Conversions from sub-errors to AppError
impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<FecError> for AppError {
    fn from(err: FecError) -> Self {
        AppError::Fec(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<gstreamer::glib::Error> for PipelineError {
    fn from(err: gstreamer::glib::Error) -> Self {
        PipelineError::InitializationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_failure_mentions_shard() {
        let err = AppError::from(FecError::ShardAllocationFailed {
            index: 3,
            shard_size: 144,
        });
        let msg = err.to_string();
        assert!(msg.contains("shard 3"));
        assert!(msg.contains("144"));
    }

    #[test]
    fn test_stage_failure_names_factory() {
        let err = PipelineError::StageInstantiationFailed {
            stage: "enc".into(),
            factory: "x264enc".into(),
            reason: "no such element".into(),
        };
        assert!(err.to_string().contains("x264enc"));
    }
}
