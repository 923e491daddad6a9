/// Errors produced while packaging a session bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    #[error("forbidden content under session directory: {path}")]
    ScopeViolation { path: String },

    #[error("integrity check failed: {reason}")]
    IntegrityMissing { reason: String },

    #[error("io failure on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl BundleError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
