use serde::{Deserialize, Serialize};

use exl_ledger::LedgerWriter;
use exl_types::{EventDraft, EventLevel, LedgerEvent};

use crate::error::CaptureError;
use crate::redact::Redactor;

pub const OUTPUT_EVENT: &str = "command_output";
pub const TRUNCATED_EVENT: &str = "command_output_truncated";

/// Which process stream a chunk arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Size limits applied to captured output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureBudget {
    /// Cap applied to each chunk before it is queued for logging.
    pub max_chunk_bytes: usize,
    /// Cumulative per-invocation byte budget.
    pub max_total_bytes: usize,
}

impl Default for CaptureBudget {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 8 * 1024,
            max_total_bytes: 256 * 1024,
        }
    }
}

/// Per-invocation output capture.
///
/// Chunks are ingested strictly in arrival order through one exclusive
/// ledger writer borrow, which is what keeps the ledger's ordering
/// guarantee. After the budget is exhausted a single truncation marker
/// is appended and every later chunk is dropped silently; the producing
/// process never sees backpressure.
pub struct OutputCapture<'a, R: Redactor> {
    writer: &'a mut LedgerWriter,
    redactor: &'a R,
    budget: CaptureBudget,
    used: usize,
    truncated: bool,
}

impl<'a, R: Redactor> OutputCapture<'a, R> {
    pub fn new(writer: &'a mut LedgerWriter, redactor: &'a R, budget: CaptureBudget) -> Self {
        Self {
            writer,
            redactor,
            budget,
            used: 0,
            truncated: false,
        }
    }

    /// Redact, cap, and append one output chunk.
    ///
    /// Returns the appended event, or `None` once the invocation's budget
    /// is spent. The chunk that crosses the budget line is trimmed to the
    /// remaining allowance and followed by the truncation marker.
    pub fn ingest(
        &mut self,
        stream: StreamKind,
        bytes: &[u8],
    ) -> Result<Option<LedgerEvent>, CaptureError> {
        if self.truncated {
            return Ok(None);
        }

        let mut text = String::from_utf8_lossy(bytes).into_owned();
        truncate_at_char_boundary(&mut text, self.budget.max_chunk_bytes);

        let remaining = self.budget.max_total_bytes - self.used;
        let crossed = text.len() >= remaining;
        if crossed {
            truncate_at_char_boundary(&mut text, remaining);
        }
        self.used += text.len();

        let mut appended = None;
        if !text.is_empty() {
            let redaction = self.redactor.redact(&text);
            let event = self.writer.append(
                EventDraft::new(EventLevel::Info, OUTPUT_EVENT).with_payload(serde_json::json!({
                    "stream": stream,
                    "text": redaction.text,
                    "redacted": redaction.redacted,
                    "hits": redaction.hits,
                })),
            )?;
            appended = Some(event);
        }

        if crossed {
            self.truncated = true;
            tracing::debug!(
                budget = self.budget.max_total_bytes,
                "output budget exhausted; dropping further chunks"
            );
            self.writer.append(
                EventDraft::new(EventLevel::Warn, TRUNCATED_EVENT).with_payload(
                    serde_json::json!({
                        "budget_bytes": self.budget.max_total_bytes,
                    }),
                ),
            )?;
        }
        Ok(appended)
    }

    /// Whether the budget has been exhausted for this invocation.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes counted against the budget so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Append an event unrelated to output chunks (start/exit records)
    /// through the same in-order queue.
    pub(crate) fn append_raw(&mut self, draft: EventDraft) -> Result<LedgerEvent, CaptureError> {
        Ok(self.writer.append(draft)?)
    }
}

fn truncate_at_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redact::{PassthroughRedactor, Redaction, Redactor};
    use exl_ledger::LedgerWriter;
    use tempfile::TempDir;

    struct SecretRedactor;

    impl Redactor for SecretRedactor {
        fn redact(&self, text: &str) -> Redaction {
            let hits = text.matches("secret").count() as u32;
            Redaction {
                text: text.replace("secret", "[redacted]"),
                redacted: hits > 0,
                hits,
            }
        }
    }

    fn writer(dir: &TempDir) -> LedgerWriter {
        LedgerWriter::create("sess_c", &dir.path().join("ledger.ndjson")).unwrap()
    }

    fn ledger_lines(dir: &TempDir) -> Vec<serde_json::Value> {
        std::fs::read_to_string(dir.path().join("ledger.ndjson"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn chunks_are_capped_before_logging() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir);
        let redactor = PassthroughRedactor;
        let mut capture = OutputCapture::new(
            &mut w,
            &redactor,
            CaptureBudget {
                max_chunk_bytes: 10,
                max_total_bytes: 1024,
            },
        );
        let event = capture
            .ingest(StreamKind::Stdout, &[b'x'; 100])
            .unwrap()
            .unwrap();
        let text = event.payload.unwrap()["text"].as_str().unwrap().to_string();
        assert_eq!(text.len(), 10);
        assert_eq!(capture.used(), 10);
    }

    #[test]
    fn budget_exhaustion_emits_one_marker_then_drops() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir);
        let redactor = PassthroughRedactor;
        let mut capture = OutputCapture::new(
            &mut w,
            &redactor,
            CaptureBudget {
                max_chunk_bytes: 10,
                max_total_bytes: 25,
            },
        );
        for _ in 0..5 {
            capture.ingest(StreamKind::Stdout, &[b'a'; 10]).unwrap();
        }
        assert!(capture.truncated());
        // Dropped chunks append nothing.
        assert!(capture.ingest(StreamKind::Stdout, b"late").unwrap().is_none());
        drop(capture);

        let lines = ledger_lines(&dir);
        let kinds: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
        // Chunks of 10 + 10 + trimmed 5, then exactly one marker.
        assert_eq!(
            kinds,
            vec![OUTPUT_EVENT, OUTPUT_EVENT, OUTPUT_EVENT, TRUNCATED_EVENT]
        );
        let trimmed = lines[2]["payload"]["text"].as_str().unwrap();
        assert_eq!(trimmed.len(), 5);
    }

    #[test]
    fn ledger_stays_verifiable_after_truncation() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir);
        let redactor = PassthroughRedactor;
        let mut capture = OutputCapture::new(
            &mut w,
            &redactor,
            CaptureBudget {
                max_chunk_bytes: 4,
                max_total_bytes: 8,
            },
        );
        for _ in 0..4 {
            capture.ingest(StreamKind::Stderr, b"abcd").unwrap();
        }
        drop(capture);
        let report = exl_ledger::verify_file(&dir.path().join("ledger.ndjson")).unwrap();
        assert!(report.valid);
    }

    #[test]
    fn chunks_pass_through_the_redactor() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir);
        let redactor = SecretRedactor;
        let mut capture =
            OutputCapture::new(&mut w, &redactor, CaptureBudget::default());
        let event = capture
            .ingest(StreamKind::Stdout, b"the secret value")
            .unwrap()
            .unwrap();
        let payload = event.payload.unwrap();
        assert_eq!(payload["text"], "the [redacted] value");
        assert_eq!(payload["redacted"], true);
        assert_eq!(payload["hits"], 1);
    }

    #[test]
    fn exact_budget_fit_still_marks_truncation() {
        let dir = TempDir::new().unwrap();
        let mut w = writer(&dir);
        let redactor = PassthroughRedactor;
        let mut capture = OutputCapture::new(
            &mut w,
            &redactor,
            CaptureBudget {
                max_chunk_bytes: 16,
                max_total_bytes: 16,
            },
        );
        capture.ingest(StreamKind::Stdout, &[b'z'; 16]).unwrap();
        assert!(capture.truncated());
    }

    #[test]
    fn multibyte_text_is_cut_on_a_char_boundary() {
        let mut text = "héllo".to_string();
        truncate_at_char_boundary(&mut text, 2);
        assert_eq!(text, "h");
    }
}
