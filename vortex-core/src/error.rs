use thiserror::Error;

pub type VortexResult<T> = Result<T, VortexError>;

#[derive(Debug, Error)]
pub enum VortexError {
    /// Degenerate discretization, rejected before any step runs.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Iteration > 1 reached Propose without a previous hypothesis and evaluation.
    #[error("iteration {iteration}: no previous hypothesis and evaluation to revise from")]
    MissingRevisionContext { iteration: u32 },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl VortexError {
    pub fn grid(message: impl Into<String>) -> Self {
        Self::InvalidGrid(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
