// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdminError>;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("`{command}` exited with status {status}\nStandard error output:\n{stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("no revision found on {branch} at or before {timestamp}")]
    RevisionNotFound { branch: String, timestamp: String },

    #[error("no deployment found for stack {stack} in environment {environment}")]
    NoDeploymentFound { stack: String, environment: String },

    /// A skip signal, not a failure: the metrics key is already populated.
    #[error("code metrics for {repo} at {timestamp} already recorded")]
    AlreadyRecorded { repo: String, timestamp: String },

    #[error("could not parse cloc output: {0}")]
    ClocParse(String),

    #[error("sync to {environment} declined")]
    SyncDeclined { environment: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
