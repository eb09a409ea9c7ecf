use std::path::PathBuf;

use thiserror::Error;

pub type VvResult<T> = Result<T, VvError>;

#[derive(Debug, Error)]
pub enum VvError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing command `{command}` on PATH")]
    CommandMissing { command: String },

    #[error("command failed: `{command}` (status: {status}){stderr_suffix}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr_suffix: String,
    },

    #[error("command timed out after {timeout_ms}ms: `{command}`{stderr_suffix}")]
    CommandTimedOut {
        command: String,
        timeout_ms: u64,
        stderr_suffix: String,
    },

    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("reference file not found: {path}")]
    ReferenceNotFound { path: PathBuf },

    #[error("candidate file not found: {path}")]
    CandidateNotFound { path: PathBuf },

    #[error("output already exists: {path} (use overwrite to replace)")]
    OutputAlreadyExists { path: PathBuf },

    #[error("audio conversion failed: {0}")]
    ConversionFailed(String),

    #[error("audio conversion timed out after {timeout_ms}ms: {path}")]
    ConversionTimeout { path: PathBuf, timeout_ms: u64 },

    #[error("audio probe failed: {0}")]
    ProbeFailed(String),

    #[error("scoring process `{engine}` timed out after {timeout_ms}ms")]
    ProcessTimeout { engine: String, timeout_ms: u64 },

    #[error("scoring process failed (status: {status}){stderr_suffix}")]
    ProcessError { status: i32, stderr_suffix: String },

    #[error("failed to parse verification score from engine output: {0}")]
    ScoreUnparseable(String),

    #[error("cannot locate biometric SDK: {0}")]
    SdkNotFound(String),

    #[error("scoring engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl VvError {
    #[must_use]
    pub fn from_command_failure(command: String, status: i32, stderr: String) -> Self {
        Self::CommandFailed {
            command,
            status,
            stderr_suffix: stderr_suffix(&stderr),
        }
    }

    #[must_use]
    pub fn from_command_timeout(command: String, timeout_ms: u64, stderr: String) -> Self {
        Self::CommandTimedOut {
            command,
            timeout_ms,
            stderr_suffix: stderr_suffix(&stderr),
        }
    }

    #[must_use]
    pub fn from_process_failure(status: i32, stderr: String) -> Self {
        Self::ProcessError {
            status,
            stderr_suffix: stderr_suffix(&stderr),
        }
    }

    /// Stable, unique, machine-readable error code for every variant.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "VV-IO",
            Self::Json(_) => "VV-JSON",
            Self::CommandMissing { .. } => "VV-CMD-MISSING",
            Self::CommandFailed { .. } => "VV-CMD-FAILED",
            Self::CommandTimedOut { .. } => "VV-CMD-TIMEOUT",
            Self::InputNotFound { .. } => "VV-INPUT-NOT-FOUND",
            Self::ReferenceNotFound { .. } => "VV-REFERENCE-NOT-FOUND",
            Self::CandidateNotFound { .. } => "VV-CANDIDATE-NOT-FOUND",
            Self::OutputAlreadyExists { .. } => "VV-OUTPUT-EXISTS",
            Self::ConversionFailed(_) => "VV-CONVERT-FAILED",
            Self::ConversionTimeout { .. } => "VV-CONVERT-TIMEOUT",
            Self::ProbeFailed(_) => "VV-PROBE-FAILED",
            Self::ProcessTimeout { .. } => "VV-PROCESS-TIMEOUT",
            Self::ProcessError { .. } => "VV-PROCESS-ERROR",
            Self::ScoreUnparseable(_) => "VV-SCORE-UNPARSEABLE",
            Self::SdkNotFound(_) => "VV-SDK-NOT-FOUND",
            Self::EngineUnavailable(_) => "VV-ENGINE-UNAVAILABLE",
            Self::InvalidRequest(_) => "VV-INVALID-REQUEST",
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("; stderr: {trimmed}")
    }
}
