use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use exl_types::{EventDraft, EventLevel};

use crate::capture::{OutputCapture, StreamKind};
use crate::error::CaptureError;
use crate::redact::Redactor;

pub const STARTED_EVENT: &str = "command_started";
pub const EXITED_EVENT: &str = "command_exited";

const READ_CHUNK_BYTES: usize = 4096;
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag for a running command.
///
/// Cancelling terminates the underlying process, which immediately stops
/// further output; a truncated or cancelled capture cannot be resumed.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a captured command invocation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the output budget was exhausted.
    pub truncated: bool,
    /// Whether the invocation was cancelled.
    pub cancelled: bool,
}

/// Spawn a command and stream its output into the ledger.
///
/// Stdout and stderr are read in background threads; every chunk flows
/// through one in-order queue into a single consumer, so ledger order is
/// arrival order. No timeout is enforced; the only way to stop a command
/// early is the cancel token, which kills the process.
pub fn run_command<R: Redactor>(
    mut command: Command,
    capture: &mut OutputCapture<'_, R>,
    cancel: &CancelToken,
) -> Result<CommandOutcome, CaptureError> {
    let program = command.get_program().to_string_lossy().into_owned();
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| CaptureError::Spawn {
        command: program.clone(),
        reason: e.to_string(),
    })?;

    capture.append_raw(
        EventDraft::new(EventLevel::Info, STARTED_EVENT)
            .with_payload(serde_json::json!({ "program": program })),
    )?;

    let (tx, rx) = mpsc::channel::<(StreamKind, Vec<u8>)>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(StreamKind::Stdout, stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(StreamKind::Stderr, stderr, tx.clone()));
    }
    drop(tx);

    let mut cancelled = false;
    loop {
        if cancel.is_cancelled() && !cancelled {
            cancelled = true;
            if let Err(err) = child.kill() {
                tracing::debug!(%program, %err, "kill after cancel failed");
            }
        }
        match rx.recv_timeout(CANCEL_POLL) {
            Ok((stream, bytes)) => {
                capture.ingest(stream, &bytes)?;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    for reader in readers {
        let _ = reader.join();
    }

    let status = child.wait().map_err(|e| CaptureError::Wait {
        command: program.clone(),
        reason: e.to_string(),
    })?;

    let outcome = CommandOutcome {
        exit_code: status.code(),
        truncated: capture.truncated(),
        cancelled,
    };
    capture.append_raw(
        EventDraft::new(EventLevel::Info, EXITED_EVENT).with_payload(serde_json::json!({
            "program": program,
            "exit_code": outcome.exit_code,
            "truncated": outcome.truncated,
            "cancelled": outcome.cancelled,
        })),
    )?;
    Ok(outcome)
}

fn spawn_reader<S: Read + Send + 'static>(
    kind: StreamKind,
    mut stream: S,
    tx: mpsc::Sender<(StreamKind, Vec<u8>)>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK_BYTES];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((kind, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
