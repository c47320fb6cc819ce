use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SandboxError {
    #[error("No active workspace")]
    NoActiveWorkspace,

    #[error("Access denied: {path} ({reason})")]
    AccessDenied { path: String, reason: String },

    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    #[error("Command blocked: {reason}")]
    CommandBlocked { reason: String },
}

impl SandboxError {
    pub(crate) fn denied(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Tool-level failure; always reported to the model, never fatal to a turn
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error(transparent)]
    SandboxViolation(#[from] SandboxError),

    #[error("{message}")]
    Execution {
        message: String,
        /// Partial output captured before the failure
        metadata: Option<Value>,
    },
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            metadata: None,
        }
    }

    pub fn execution_with(message: impl Into<String>, metadata: Value) -> Self {
        Self::Execution {
            message: message.into(),
            metadata: Some(metadata),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::Validation(_) => "validation_error",
            Self::PermissionDenied => "permission_denied",
            Self::SandboxViolation(_) => "sandbox_violation",
            Self::Execution { .. } => "execution_error",
        }
    }
}
