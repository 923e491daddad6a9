use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exl_chain::sha256_hex;
use exl_types::SessionLocation;

use crate::error::LayoutError;
use crate::resolver::MARKER_FILES;

const ARTIFACTS_DIR: &str = "artifacts";

/// The engine contract for a resolved session, consumed by desktop
/// tooling. Field names are camelCase on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContract {
    /// Absolute path of the session directory.
    pub session_root: String,
    /// Path of the session's `summary.txt`.
    pub summary_file: String,
    /// Path of the session's `report.txt` (may not exist; see `warnings`).
    pub report_file: String,
    /// Folder holding the session's artifacts; the session root itself
    /// when no `artifacts/` subdirectory exists.
    pub artifacts_folder: String,
    pub session_id: String,
    /// RFC 3339 modification time of the session directory.
    pub created_at: String,
    /// Non-fatal observations, e.g. a missing report file.
    pub warnings: Vec<String>,
    /// SHA-256 of each marker file present, keyed by file name.
    pub hashes: BTreeMap<String, String>,
}

/// Build the contract for a resolved session.
///
/// A missing `summary.txt` violates the contract; a missing `report.txt`
/// is only a warning. Marker files that exist are hashed so downstream
/// consumers can pin their content.
pub fn build_contract(location: &SessionLocation) -> Result<SessionContract, LayoutError> {
    let session_dir = &location.session_dir;
    let summary_path = session_dir.join(MARKER_FILES[0]);
    let report_path = session_dir.join(MARKER_FILES[1]);

    if !summary_path.is_file() {
        return Err(LayoutError::ContractViolation {
            reason: format!("{} has no summary.txt", session_dir.display()),
        });
    }

    let mut warnings = Vec::new();
    if !report_path.is_file() {
        warnings.push(format!("{} has no report.txt", session_dir.display()));
    }

    let mut hashes = BTreeMap::new();
    for marker in MARKER_FILES {
        let path = session_dir.join(marker);
        if path.is_file() {
            let bytes = std::fs::read(&path).map_err(|e| LayoutError::io(&path, &e))?;
            hashes.insert(marker.to_string(), sha256_hex(&bytes));
        }
    }

    let artifacts_dir = session_dir.join(ARTIFACTS_DIR);
    let artifacts_folder = if artifacts_dir.is_dir() {
        artifacts_dir
    } else {
        session_dir.clone()
    };

    let created_at = created_at_rfc3339(session_dir)?;

    Ok(SessionContract {
        session_root: session_dir.display().to_string(),
        summary_file: summary_path.display().to_string(),
        report_file: report_path.display().to_string(),
        artifacts_folder: artifacts_folder.display().to_string(),
        session_id: location.session_id.clone(),
        created_at,
        warnings,
        hashes,
    })
}

fn created_at_rfc3339(dir: &Path) -> Result<String, LayoutError> {
    let modified = std::fs::metadata(dir)
        .and_then(|m| m.modified())
        .map_err(|e| LayoutError::io(dir, &e))?;
    Ok(DateTime::<Utc>::from(modified).to_rfc3339())
}
