use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use exl_chain::{sha256_hex, GENESIS};
use exl_types::SessionLocation;

use crate::archive::write_archive;
use crate::error::BundleError;
use crate::manifest::{Manifest, SessionSummary};
use crate::scope::check_scope;

/// Files a session may contribute to its bundle, in archive order. The
/// list is fixed; packaging filters it to the files that actually exist.
pub const REQUIRED_FILES: [&str; 5] = [
    "summary.txt",
    "report.txt",
    "session_summary.json",
    "ledger.ndjson",
    "changes.ndjson",
];

const SESSION_SUMMARY: &str = "session_summary.json";
const LEDGER_FILE: &str = "ledger.ndjson";
const CHANGES_LOG: &str = "changes.ndjson";
const MANIFEST_ENTRY: &str = "manifest.json";
const LEGACY_MANIFEST_ENTRY: &str = "manifest.legacy.json";

/// Package a resolved session into a deterministic tar bundle.
///
/// Returns the path of the archive, `<dest_dir>/<session_id>.bundle.tar`.
/// The scope guard and the required-file check both short-circuit before
/// any output is produced; from the caller's point of view packaging
/// either fully succeeds or leaves nothing at the output path.
pub fn pack(
    location: &SessionLocation,
    source_tag: &str,
    dest_dir: &Path,
) -> Result<PathBuf, BundleError> {
    let session_dir = &location.session_dir;
    check_scope(session_dir)?;

    // Snapshot every present file once; hashing and archive writing both
    // work from these bytes, never from a re-read.
    let files = snapshot_files(session_dir)?;
    if files.is_empty() {
        return Err(BundleError::IntegrityMissing {
            reason: format!(
                "none of {} exist under {}",
                REQUIRED_FILES.join(", "),
                session_dir.display()
            ),
        });
    }

    let mut sha256_by_file = BTreeMap::new();
    for (name, bytes) in &files {
        sha256_by_file.insert(name.clone(), sha256_hex(bytes));
    }

    let summary = match lookup(&files, SESSION_SUMMARY) {
        Some(bytes) => SessionSummary::parse(bytes)?,
        None => SessionSummary::default(),
    };

    let changes_report = match lookup(&files, CHANGES_LOG) {
        Some(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            exl_ledger::verify(text.lines())
        }
        // No change log: a trivially verified empty chain.
        None => exl_ledger::ChainReport {
            valid: true,
            head_hash: GENESIS.to_string(),
            broken_at: None,
        },
    };
    let changes_log_verified = changes_report.valid
        && summary
            .changes_head
            .as_ref()
            .map_or(true, |expected| *expected == changes_report.head_hash);

    let (ledger_start, ledger_stop) = ledger_bounds(lookup(&files, LEDGER_FILE));
    let manifest = Manifest {
        session_id: location.session_id.clone(),
        source: source_tag.to_string(),
        started_at: summary.started_at.clone().or(ledger_start),
        stopped_at: summary.stopped_at.clone().or(ledger_stop),
        file_list: files.iter().map(|(name, _)| name.clone()).collect(),
        sha256_by_file,
        changes_log_expected_head_hash: summary.changes_head.clone(),
        changes_log_computed_head_hash: changes_report.head_hash.clone(),
        changes_log_verified,
    };

    let canonical = manifest.canonical_text()?;
    let legacy = manifest.legacy_text()?;

    // Both manifest forms land loose in the session dir first, are
    // embedded into the archive, and are deleted once the archive is in
    // place; the archive is the sole persisted copy.
    let canonical_path = session_dir.join(MANIFEST_ENTRY);
    let legacy_path = session_dir.join(LEGACY_MANIFEST_ENTRY);
    write_atomic(&canonical_path, canonical.as_bytes())?;
    write_atomic(&legacy_path, legacy.as_bytes())?;

    let mut entries: Vec<(&str, &[u8])> = Vec::with_capacity(files.len() + 2);
    entries.push((MANIFEST_ENTRY, canonical.as_bytes()));
    for (name, bytes) in &files {
        entries.push((name.as_str(), bytes.as_slice()));
    }
    entries.push((LEGACY_MANIFEST_ENTRY, legacy.as_bytes()));

    std::fs::create_dir_all(dest_dir).map_err(|e| BundleError::io(dest_dir, &e))?;
    let archive_path = dest_dir.join(format!("{}.bundle.tar", location.session_id));
    write_archive(&archive_path, &entries)?;

    std::fs::remove_file(&canonical_path).map_err(|e| BundleError::io(&canonical_path, &e))?;
    std::fs::remove_file(&legacy_path).map_err(|e| BundleError::io(&legacy_path, &e))?;

    tracing::info!(
        session = %location.session_id,
        mode = %location.mode,
        files = manifest.file_list.len(),
        verified = changes_log_verified,
        archive = %archive_path.display(),
        "packed session bundle"
    );
    Ok(archive_path)
}

fn snapshot_files(session_dir: &Path) -> Result<Vec<(String, Vec<u8>)>, BundleError> {
    let mut files = Vec::new();
    for name in REQUIRED_FILES {
        let path = session_dir.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => files.push((name.to_string(), bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BundleError::io(&path, &e)),
        }
    }
    Ok(files)
}

fn lookup<'a>(files: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    files
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, bytes)| bytes.as_slice())
}

/// First and last event timestamps of the ledger snapshot, when parseable.
fn ledger_bounds(bytes: Option<&[u8]>) -> (Option<String>, Option<String>) {
    let Some(bytes) = bytes else {
        return (None, None);
    };
    let text = String::from_utf8_lossy(bytes);
    let ts_of = |line: &str| {
        serde_json::from_str::<Value>(line)
            .ok()
            .and_then(|v| v.get("ts").and_then(Value::as_str).map(str::to_string))
    };
    let first = text.lines().next().and_then(ts_of);
    let last = text.lines().last().and_then(ts_of);
    (first, last)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BundleError> {
    let dir = path.parent().ok_or_else(|| BundleError::Io {
        path: path.display().to_string(),
        reason: "path has no parent directory".into(),
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| BundleError::io(path, &e))?;
    tmp.write_all(bytes).map_err(|e| BundleError::io(path, &e))?;
    tmp.persist(path).map_err(|e| BundleError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}
