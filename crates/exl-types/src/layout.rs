use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which on-disk layout strategy produced a session location.
///
/// The resolver decides the mode once; consumers carry this tag instead of
/// re-inferring it from path shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Session lives under `<exec>/milestone/<session>` (canonical layout).
    Milestone,
    /// Session is a direct child of the exec directory.
    DirectSession,
    /// The exec directory itself is the session.
    FlatExec,
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Milestone => "milestone",
            Self::DirectSession => "direct_session",
            Self::FlatExec => "flat_exec",
        };
        write!(f, "{s}")
    }
}

/// A resolved session directory.
///
/// Immutable once returned by the resolver. `exec_id` and `session_id` are
/// the directory names the resolver matched; in [`LayoutMode::FlatExec`]
/// they are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionLocation {
    /// Absolute path of the session directory.
    pub session_dir: PathBuf,
    /// Name of the `exec_` directory the session was found under.
    pub exec_id: String,
    /// Name of the session directory.
    pub session_id: String,
    /// The strategy that located this session.
    pub mode: LayoutMode,
}
