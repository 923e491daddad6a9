/// Errors produced by layout resolution and contract building.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("no session found: {reason}")]
    NotFound { reason: String },

    #[error("contract violation: {reason}")]
    ContractViolation { reason: String },

    #[error("io failure on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl LayoutError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }
}
