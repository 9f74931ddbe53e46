use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Comparison error: {0}")]
    Comparison(String),
}

pub type Result<T> = std::result::Result<T, DirDiffError>;

/// Failure of a single directory walk
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WalkError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WalkError::Io {
            path: path.into(),
            source,
        }
    }

    /// Kind of the underlying IO failure, if any
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            WalkError::NotADirectory(_) => None,
            WalkError::Io { source, .. } => Some(source.kind()),
        }
    }

    pub fn failure_code(&self) -> FailureCode {
        match self {
            WalkError::NotADirectory(_) => FailureCode::InvalidInput,
            WalkError::Io { source, .. } => FailureCode::from_io_error(source),
        }
    }
}

#[cfg(unix)]
fn is_not_a_directory(err: &io::Error) -> bool {
    const ENOTDIR: i32 = 20;
    err.raw_os_error() == Some(ENOTDIR)
}

#[cfg(not(unix))]
fn is_not_a_directory(_err: &io::Error) -> bool {
    false
}

/// Failure category reported to hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    /// Caller-supplied data is structurally wrong
    InvalidInput,
    /// Path does not exist or disappeared before it was read
    NotFound,
    /// The operating system denied access
    PermissionDenied,
    /// Unexpected failure or invariant violation
    InternalError,
}

impl FailureCode {
    /// Map an IO error kind onto the host-facing taxonomy
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FailureCode::NotFound,
            io::ErrorKind::PermissionDenied => FailureCode::PermissionDenied,
            _ => FailureCode::InternalError,
        }
    }

    /// Like `from_io_kind`, but a path component that is not a directory
    /// (`ENOTDIR`) is the caller's mistake rather than an internal failure
    pub fn from_io_error(err: &io::Error) -> Self {
        if is_not_a_directory(err) {
            return FailureCode::InvalidInput;
        }
        Self::from_io_kind(err.kind())
    }

    /// Only internal errors may succeed when retried unchanged
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureCode::InternalError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureCode::InvalidInput => "INVALID_INPUT",
            FailureCode::NotFound => "NOT_FOUND",
            FailureCode::PermissionDenied => "PERMISSION_DENIED",
            FailureCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Pipeline step at which an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    ValidateInput,
    ScanDirectory,
    ClassifyResult,
    ReadFile,
    Unexpected,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::ValidateInput => "validate_input",
            PipelineStep::ScanDirectory => "scan_directory",
            PipelineStep::ClassifyResult => "classify_result",
            PipelineStep::ReadFile => "read_file",
            PipelineStep::Unexpected => "unexpected",
        }
    }
}

/// Operation that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    Compare,
    FileDiff,
}

impl FailureSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureSource::Compare => "compare",
            FailureSource::FileDiff => "file_diff",
        }
    }
}

/// Typed failure returned across the core boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub code: FailureCode,
    pub message: String,
    #[serde(rename = "source")]
    pub origin: FailureSource,
    pub step: PipelineStep,
    pub retryable: bool,
}

impl OperationFailure {
    pub fn new(
        code: FailureCode,
        origin: FailureSource,
        step: PipelineStep,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            origin,
            step,
            retryable: code.is_retryable(),
        }
    }

    pub fn invalid_input(origin: FailureSource, step: PipelineStep, message: impl Into<String>) -> Self {
        Self::new(FailureCode::InvalidInput, origin, step, message)
    }

    pub fn internal(origin: FailureSource, step: PipelineStep, message: impl Into<String>) -> Self {
        Self::new(FailureCode::InternalError, origin, step, message)
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let retry = if self.retryable {
            "retry available"
        } else {
            "retry unlikely to help"
        };
        write!(
            f,
            "{} (source: {} / step: {} / code: {} / {})",
            self.message,
            self.origin.as_str(),
            self.step.as_str(),
            self.code.as_str(),
            retry
        )
    }
}

impl std::error::Error for OperationFailure {}
