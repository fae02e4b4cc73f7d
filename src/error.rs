use toolbridge_runner::RunError;

/// Failures surfaced by [`ToolClient`](crate::ToolClient).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No detection strategy found the tool.
    #[error("`{binary}` was not found locally, globally, or through `{runner}`")]
    NotDetected { binary: String, runner: String },

    /// Rejected before any process was started.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("the detected tool does not support `{feature}`")]
    UnsupportedFeature { feature: String },

    #[error(transparent)]
    Run(#[from] RunError),
}

impl ToolError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// True when nothing was spawned, so retrying with the same input is
    /// pointless.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidInput { .. } | Self::UnsupportedFeature { .. } => true,
            Self::Run(err) => matches!(err, RunError::CommandNotAllowed { .. }),
            Self::NotDetected { .. } => false,
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
