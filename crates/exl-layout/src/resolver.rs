use std::path::{Path, PathBuf};
use std::time::SystemTime;

use exl_types::{LayoutMode, SessionLocation};

use crate::error::LayoutError;

/// Files whose presence marks a directory as a usable session.
pub const MARKER_FILES: [&str; 2] = ["summary.txt", "report.txt"];

const EXEC_PREFIX: &str = "exec_";
const MILESTONE_DIR: &str = "milestone";

fn has_marker(dir: &Path) -> bool {
    MARKER_FILES.iter().any(|m| dir.join(m).is_file())
}

/// Resolve the most recent usable session under `root`.
///
/// Exec directories are ordered by name descending (callers embed a
/// sortable timestamp in the name); sessions within an exec directory by
/// modification time descending. These are two different orderings and
/// are kept separate on purpose. The newest exec directory that yields a
/// session under any strategy wins; older exec directories are only
/// consulted when newer ones yield nothing.
pub fn find_latest_session(root: &Path) -> Result<SessionLocation, LayoutError> {
    if !root.is_dir() {
        return Err(LayoutError::not_found(format!(
            "root {} does not exist",
            root.display()
        )));
    }

    let mut exec_dirs = Vec::new();
    let entries = std::fs::read_dir(root).map_err(|e| LayoutError::io(root, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LayoutError::io(root, &e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(EXEC_PREFIX) && entry.path().is_dir() {
            exec_dirs.push((name, entry.path()));
        }
    }
    if exec_dirs.is_empty() {
        return Err(LayoutError::not_found(format!(
            "no exec_ directories under {}",
            root.display()
        )));
    }
    exec_dirs.sort_by(|a, b| b.0.cmp(&a.0));

    for (exec_id, exec_dir) in &exec_dirs {
        if let Some(location) = resolve_within_exec(exec_dir, exec_id)? {
            tracing::debug!(
                exec = %exec_id,
                session = %location.session_id,
                mode = %location.mode,
                "resolved latest session"
            );
            return Ok(location);
        }
    }
    Err(LayoutError::not_found(format!(
        "no exec directory under {} holds a usable session",
        root.display()
    )))
}

/// Resolve an explicitly named session.
///
/// Tries the milestone path, then the direct-child path; `session_id`
/// equal to `exec_id` addresses the flat-exec case. Each candidate must
/// carry a marker file.
pub fn find_specific_session(
    root: &Path,
    exec_id: &str,
    session_id: &str,
) -> Result<SessionLocation, LayoutError> {
    let exec_dir = root.join(exec_id);

    let milestone_candidate = exec_dir.join(MILESTONE_DIR).join(session_id);
    if milestone_candidate.is_dir() && has_marker(&milestone_candidate) {
        return Ok(SessionLocation {
            session_dir: milestone_candidate,
            exec_id: exec_id.to_string(),
            session_id: session_id.to_string(),
            mode: LayoutMode::Milestone,
        });
    }

    if session_id != MILESTONE_DIR {
        let direct_candidate = exec_dir.join(session_id);
        if direct_candidate.is_dir() && has_marker(&direct_candidate) {
            return Ok(SessionLocation {
                session_dir: direct_candidate,
                exec_id: exec_id.to_string(),
                session_id: session_id.to_string(),
                mode: LayoutMode::DirectSession,
            });
        }
    }

    if session_id == exec_id && exec_dir.is_dir() && has_marker(&exec_dir) {
        return Ok(SessionLocation {
            session_dir: exec_dir,
            exec_id: exec_id.to_string(),
            session_id: session_id.to_string(),
            mode: LayoutMode::FlatExec,
        });
    }

    Err(LayoutError::not_found(format!(
        "{exec_id}/{session_id} matches no layout under {}",
        root.display()
    )))
}

fn resolve_within_exec(
    exec_dir: &Path,
    exec_id: &str,
) -> Result<Option<SessionLocation>, LayoutError> {
    let milestone_dir = exec_dir.join(MILESTONE_DIR);
    if milestone_dir.is_dir() {
        if let Some((name, path)) = newest_marked_subdir(&milestone_dir, None)? {
            return Ok(Some(SessionLocation {
                session_dir: path,
                exec_id: exec_id.to_string(),
                session_id: name,
                mode: LayoutMode::Milestone,
            }));
        }
    }

    if let Some((name, path)) = newest_marked_subdir(exec_dir, Some(MILESTONE_DIR))? {
        return Ok(Some(SessionLocation {
            session_dir: path,
            exec_id: exec_id.to_string(),
            session_id: name,
            mode: LayoutMode::DirectSession,
        }));
    }

    if has_marker(exec_dir) {
        return Ok(Some(SessionLocation {
            session_dir: exec_dir.to_path_buf(),
            exec_id: exec_id.to_string(),
            session_id: exec_id.to_string(),
            mode: LayoutMode::FlatExec,
        }));
    }

    Ok(None)
}

/// Marker-bearing subdirectories of `parent`, newest mtime first; name
/// descending breaks mtime ties so the choice stays deterministic.
fn newest_marked_subdir(
    parent: &Path,
    exclude: Option<&str>,
) -> Result<Option<(String, PathBuf)>, LayoutError> {
    let mut candidates: Vec<(SystemTime, String, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(parent).map_err(|e| LayoutError::io(parent, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LayoutError::io(parent, &e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if exclude == Some(name.as_str()) {
            continue;
        }
        let path = entry.path();
        if !path.is_dir() || !has_marker(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| LayoutError::io(&path, &e))?;
        candidates.push((modified, name, path));
    }
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(candidates.into_iter().next().map(|(_, name, path)| (name, path)))
}
