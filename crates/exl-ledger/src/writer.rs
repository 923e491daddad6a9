use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use exl_chain::{chain_step, GENESIS};
use exl_types::{EventDraft, LedgerEvent};

use crate::error::LedgerError;
use crate::verifier;

/// Per-session chain state.
///
/// Owned exclusively by one [`LedgerWriter`]; created on session start,
/// mutated only by successful appends, discarded on session stop. Never
/// shared across sessions or processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerState {
    pub session_id: String,
    pub file_path: PathBuf,
    pub seq: u64,
    pub last_hash: Option<String>,
}

/// Appends hash-chained events to a session's NDJSON ledger file.
///
/// The append discipline is durable-write-then-commit: the full event line
/// is written and fsynced before `seq` and `last_hash` advance. A failed
/// write therefore leaves the state exactly as it was, and a retried
/// append reuses the same sequence number and previous hash.
#[derive(Debug)]
pub struct LedgerWriter {
    state: LedgerState,
    file: File,
}

impl LedgerWriter {
    /// Start a fresh ledger. The file must not already exist.
    pub fn create(session_id: impl Into<String>, path: &Path) -> Result<Self, LedgerError> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => LedgerError::AlreadyExists {
                    path: path.display().to_string(),
                },
                _ => LedgerError::io(path, &e),
            })?;
        Ok(Self {
            state: LedgerState {
                session_id: session_id.into(),
                file_path: path.to_path_buf(),
                seq: 0,
                last_hash: None,
            },
            file,
        })
    }

    /// Reopen an existing ledger, recovering `seq` and `last_hash` by
    /// replaying the file through the shared verifier. A broken chain is
    /// refused rather than silently extended.
    pub fn resume(session_id: impl Into<String>, path: &Path) -> Result<Self, LedgerError> {
        let text = std::fs::read_to_string(path).map_err(|e| LedgerError::io(path, &e))?;
        let line_count = text.lines().count();
        let report = verifier::verify(text.lines());
        if !report.valid {
            return Err(LedgerError::BrokenChain {
                index: report.broken_at.unwrap_or(0),
            });
        }
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| LedgerError::io(path, &e))?;
        let last_hash = (line_count > 0).then(|| report.head_hash.clone());
        tracing::debug!(
            path = %path.display(),
            seq = line_count,
            "resumed ledger"
        );
        Ok(Self {
            state: LedgerState {
                session_id: session_id.into(),
                file_path: path.to_path_buf(),
                seq: line_count as u64,
                last_hash,
            },
            file,
        })
    }

    /// Assign the next sequence number, chain-hash the event, durably
    /// append the line, and only then commit `seq` and `last_hash`.
    pub fn append(&mut self, draft: EventDraft) -> Result<LedgerEvent, LedgerError> {
        let seq = self.state.seq + 1;
        let prev_hash = self
            .state
            .last_hash
            .clone()
            .unwrap_or_else(|| GENESIS.to_string());

        let mut event = LedgerEvent {
            ts: draft.ts,
            level: draft.level,
            kind: draft.kind,
            session_id: self.state.session_id.clone(),
            seq,
            payload: draft.payload,
            prev_hash: prev_hash.clone(),
            hash: String::new(),
        };
        let value =
            serde_json::to_value(&event).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        event.hash = chain_step(&prev_hash, &verifier::chain_payload_text(&value));

        let mut line = serde_json::to_string(&event)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.sync_data())
            .map_err(|e| LedgerError::io(&self.state.file_path, &e))?;

        // Durable write succeeded; commit seq, then the head hash.
        self.state.seq = seq;
        self.state.last_hash = Some(event.hash.clone());
        Ok(event)
    }

    /// Sequence number of the last committed event (0 before the first).
    pub fn seq(&self) -> u64 {
        self.state.seq
    }

    /// Hash of the last committed event.
    pub fn last_hash(&self) -> Option<&str> {
        self.state.last_hash.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub fn file_path(&self) -> &Path {
        &self.state.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exl_types::{EventDraft, EventLevel};
    use tempfile::TempDir;

    fn draft(i: usize) -> EventDraft {
        EventDraft::new(EventLevel::Info, "note").with_payload(serde_json::json!({ "i": i }))
    }

    #[test]
    fn seq_runs_from_one_with_no_gaps() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::create("s1", &dir.path().join("l.ndjson")).unwrap();
        let seqs: Vec<u64> = (0..6).map(|i| writer.append(draft(i)).unwrap().seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn first_event_chains_from_genesis() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::create("s1", &dir.path().join("l.ndjson")).unwrap();
        let event = writer.append(draft(0)).unwrap();
        assert_eq!(event.prev_hash, exl_chain::GENESIS);
        assert_eq!(writer.last_hash(), Some(event.hash.as_str()));
    }

    #[test]
    fn each_event_carries_the_previous_hash() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::create("s1", &dir.path().join("l.ndjson")).unwrap();
        let first = writer.append(draft(0)).unwrap();
        let second = writer.append(draft(1)).unwrap();
        assert_eq!(second.prev_hash, first.hash);
        assert_ne!(second.hash, first.hash);
    }

    #[test]
    fn written_file_verifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.ndjson");
        let mut writer = LedgerWriter::create("s1", &path).unwrap();
        let mut last = String::new();
        for i in 0..4 {
            last = writer.append(draft(i)).unwrap().hash;
        }
        let report = crate::verifier::verify_file(&path).unwrap();
        assert!(report.valid);
        assert_eq!(report.head_hash, last);
    }

    #[test]
    fn create_refuses_an_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.ndjson");
        let _writer = LedgerWriter::create("s1", &path).unwrap();
        let err = LedgerWriter::create("s1", &path).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists { .. }));
    }

    #[test]
    fn resume_continues_the_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.ndjson");
        let first_hash;
        {
            let mut writer = LedgerWriter::create("s1", &path).unwrap();
            writer.append(draft(0)).unwrap();
            first_hash = writer.append(draft(1)).unwrap().hash;
        }
        let mut writer = LedgerWriter::resume("s1", &path).unwrap();
        assert_eq!(writer.seq(), 2);
        let third = writer.append(draft(2)).unwrap();
        assert_eq!(third.seq, 3);
        assert_eq!(third.prev_hash, first_hash);
        let report = crate::verifier::verify_file(&path).unwrap();
        assert!(report.valid);
    }

    #[test]
    fn resume_refuses_a_broken_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.ndjson");
        {
            let mut writer = LedgerWriter::create("s1", &path).unwrap();
            writer.append(draft(0)).unwrap();
            writer.append(draft(1)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replacen(r#""i":0"#, r#""i":9"#, 1)).unwrap();
        let err = LedgerWriter::resume("s1", &path).unwrap_err();
        assert_eq!(err, LedgerError::BrokenChain { index: 0 });
    }

    #[test]
    fn resume_of_an_empty_ledger_starts_at_genesis() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("l.ndjson");
        drop(LedgerWriter::create("s1", &path).unwrap());
        let mut writer = LedgerWriter::resume("s1", &path).unwrap();
        assert_eq!(writer.seq(), 0);
        let event = writer.append(draft(0)).unwrap();
        assert_eq!(event.prev_hash, exl_chain::GENESIS);
    }
}
