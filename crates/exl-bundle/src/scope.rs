use std::path::Path;

use walkdir::WalkDir;

use crate::error::BundleError;

/// Watcher-internal artifacts that must never leave the machine inside a
/// bundle. Matched against every path component under the session dir.
pub const FORBIDDEN_MARKERS: [&str; 2] = ["watcher_health.json", "watcher_state.json"];

/// Session-directory names that identify a temporary workspace rather
/// than a real session.
const TEMP_SUFFIXES: [&str; 2] = [".tmp", ".partial"];
const TEMP_PREFIX: &str = "tmp_";

fn is_temp_workspace(name: &str) -> bool {
    TEMP_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.starts_with(TEMP_PREFIX)
}

/// Walk the whole session directory and refuse to package it if any
/// forbidden marker appears or the directory itself is a temporary
/// workspace. Runs to completion before the packager produces any
/// output; the error names the offending path.
pub fn check_scope(session_dir: &Path) -> Result<(), BundleError> {
    if let Some(name) = session_dir.file_name().and_then(|n| n.to_str()) {
        if is_temp_workspace(name) {
            return Err(BundleError::ScopeViolation {
                path: session_dir.display().to_string(),
            });
        }
    }

    for entry in WalkDir::new(session_dir) {
        let entry = entry.map_err(|e| BundleError::Io {
            path: session_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = entry.file_name().to_string_lossy();
        if FORBIDDEN_MARKERS.iter().any(|m| *m == name) {
            return Err(BundleError::ScopeViolation {
                path: entry.path().display().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn clean_session_passes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("summary.txt"), "s").unwrap();
        fs::create_dir(dir.path().join("artifacts")).unwrap();
        assert!(check_scope(dir.path()).is_ok());
    }

    #[test]
    fn forbidden_marker_at_top_level_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("watcher_health.json"), "{}").unwrap();
        let err = check_scope(dir.path()).unwrap_err();
        assert!(matches!(err, BundleError::ScopeViolation { .. }));
    }

    #[test]
    fn forbidden_marker_deep_in_the_tree_is_rejected() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("artifacts/deep/deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("watcher_state.json"), "{}").unwrap();
        let err = check_scope(dir.path()).unwrap_err();
        let BundleError::ScopeViolation { path } = err else {
            panic!("expected scope violation");
        };
        assert!(path.contains("watcher_state.json"));
    }

    #[test]
    fn temp_workspace_names_are_rejected() {
        let parent = TempDir::new().unwrap();
        for name in ["sess.tmp", "sess.partial", "tmp_sess"] {
            let dir = parent.path().join(name);
            fs::create_dir(&dir).unwrap();
            let err = check_scope(&dir).unwrap_err();
            assert!(matches!(err, BundleError::ScopeViolation { .. }), "{name}");
        }
    }
}
