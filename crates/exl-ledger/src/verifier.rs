use std::path::Path;

use serde_json::Value;

use exl_chain::{canonicalize, chain_step, GENESIS};

use crate::error::LedgerError;

/// Result of replaying a ledger's raw lines through the chain primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    /// True only if every line parsed and every link held.
    pub valid: bool,
    /// Hash carried by the last parseable line, or the genesis sentinel
    /// when no line parsed. Meaningful even when `valid` is false: it is
    /// the head an external record can be compared against to see how far
    /// the chain can be trusted.
    pub head_hash: String,
    /// Zero-based index of the first line that failed a check.
    pub broken_at: Option<usize>,
}

/// The canonical text a line's hash is computed over: the parsed object
/// with both chain fields removed. Writers and this verifier share it;
/// there is no second derivation of the rule.
pub(crate) fn chain_payload_text(value: &Value) -> String {
    let mut stripped = value.clone();
    if let Some(obj) = stripped.as_object_mut() {
        obj.remove("prev_hash");
        obj.remove("hash");
    }
    canonicalize(&stripped)
}

/// Replay raw ledger lines in order and check every chain link.
///
/// A malformed line marks the report invalid at that index but does not
/// stop the scan, so the report still carries the head hash of the last
/// parseable line. A link mismatch likewise records the first failing
/// index and keeps scanning without advancing the running previous hash,
/// which means a single tampered line breaks every line after it.
pub fn verify<'a, I>(lines: I) -> ChainReport
where
    I: IntoIterator<Item = &'a str>,
{
    fn mark(index: usize, valid: &mut bool, broken_at: &mut Option<usize>) {
        *valid = false;
        broken_at.get_or_insert(index);
    }

    let mut valid = true;
    let mut broken_at = None;
    let mut head_hash = GENESIS.to_string();
    let mut running_prev = GENESIS.to_string();

    for (index, line) in lines.into_iter().enumerate() {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!(index, %err, "unparseable ledger line");
                mark(index, &mut valid, &mut broken_at);
                continue;
            }
        };
        let (stored_prev, stored_hash) = match (
            value.get("prev_hash").and_then(Value::as_str),
            value.get("hash").and_then(Value::as_str),
        ) {
            (Some(p), Some(h)) => (p.to_string(), h.to_string()),
            _ => {
                mark(index, &mut valid, &mut broken_at);
                continue;
            }
        };

        head_hash = stored_hash.clone();

        let expected = chain_step(&running_prev, &chain_payload_text(&value));
        if stored_prev != running_prev || expected != stored_hash {
            mark(index, &mut valid, &mut broken_at);
            continue;
        }
        running_prev = stored_hash;
    }

    ChainReport {
        valid,
        head_hash,
        broken_at,
    }
}

/// Read a ledger file and verify its chain. A missing or unreadable file
/// is an I/O error, not an invalid chain.
pub fn verify_file(path: &Path) -> Result<ChainReport, LedgerError> {
    let text = std::fs::read_to_string(path).map_err(|e| LedgerError::io(path, &e))?;
    Ok(verify(text.lines()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exl_types::{EventDraft, EventLevel};
    use tempfile::TempDir;

    use crate::writer::LedgerWriter;

    fn build_ledger(dir: &TempDir, count: usize) -> (std::path::PathBuf, Vec<String>) {
        let path = dir.path().join("ledger.ndjson");
        let mut writer = LedgerWriter::create("sess_t", &path).unwrap();
        let mut hashes = Vec::new();
        for i in 0..count {
            let event = writer
                .append(
                    EventDraft::new(EventLevel::Info, "note")
                        .with_payload(serde_json::json!({"i": i, "tag": format!("alpha{i}")})),
                )
                .unwrap();
            hashes.push(event.hash);
        }
        (path, hashes)
    }

    #[test]
    fn empty_input_is_a_valid_empty_chain() {
        let report = verify([]);
        assert!(report.valid);
        assert_eq!(report.head_hash, GENESIS);
        assert_eq!(report.broken_at, None);
    }

    #[test]
    fn appended_events_verify_end_to_end() {
        let dir = TempDir::new().unwrap();
        let (path, hashes) = build_ledger(&dir, 5);
        let report = verify_file(&path).unwrap();
        assert!(report.valid);
        assert_eq!(report.broken_at, None);
        assert_eq!(&report.head_hash, hashes.last().unwrap());
    }

    #[test]
    fn flipped_payload_byte_breaks_at_that_line_and_does_not_heal() {
        let dir = TempDir::new().unwrap();
        let (path, hashes) = build_ledger(&dir, 4);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        // Flip one byte of line 1's payload, leaving its chain fields alone.
        lines[1] = lines[1].replacen("alpha1", "alphb1", 1);
        let report = verify(lines.iter().map(String::as_str));
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(1));
        // Head still reflects the last parseable line.
        assert_eq!(&report.head_hash, hashes.last().unwrap());
    }

    #[test]
    fn tampering_the_first_line_breaks_from_genesis() {
        let dir = TempDir::new().unwrap();
        let (path, _) = build_ledger(&dir, 3);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines[0] = lines[0].replacen("alpha0", "alphb0", 1);
        let report = verify(lines.iter().map(String::as_str));
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(0));
    }

    #[test]
    fn unparseable_line_is_recorded_but_scanning_continues() {
        let dir = TempDir::new().unwrap();
        let (path, hashes) = build_ledger(&dir, 3);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines.insert(1, "not json".to_string());
        let report = verify(lines.iter().map(String::as_str));
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(1));
        assert_eq!(&report.head_hash, hashes.last().unwrap());
    }

    #[test]
    fn line_missing_chain_fields_is_a_format_break() {
        let report = verify([r#"{"ts":"2025-01-01T00:00:00Z","seq":1}"#]);
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(0));
        assert_eq!(report.head_hash, GENESIS);
    }

    #[test]
    fn first_line_must_chain_from_genesis() {
        let dir = TempDir::new().unwrap();
        let (path, _) = build_ledger(&dir, 2);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines[0] = lines[0].replacen("GENESIS", "genesis", 1);
        let report = verify(lines.iter().map(String::as_str));
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(0));
    }

    #[test]
    fn missing_file_is_an_io_error_not_an_invalid_chain() {
        let dir = TempDir::new().unwrap();
        let err = verify_file(&dir.path().join("absent.ndjson")).unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
    }
}
