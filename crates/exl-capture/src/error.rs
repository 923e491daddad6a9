use exl_ledger::LedgerError;

/// Errors produced while capturing command output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {command}: {reason}")]
    Spawn { command: String, reason: String },

    #[error("failed while waiting on {command}: {reason}")]
    Wait { command: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
