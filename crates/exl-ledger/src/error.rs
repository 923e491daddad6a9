/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("io failure on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("ledger already exists at {path}")]
    AlreadyExists { path: String },

    #[error("ledger chain broken at line {index}; refusing to resume")]
    BrokenChain { index: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
