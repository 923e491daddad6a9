//! Command-output capture for ExecLedger.
//!
//! Output from an embedded process arrives in asynchronous chunks. Each
//! chunk is redacted, capped in size, and appended to the session ledger
//! in arrival order through one [`OutputCapture`] per invocation. A
//! cumulative byte budget bounds what a single command may write to the
//! ledger: once it is exhausted a single truncation marker is recorded
//! and everything further is dropped without applying backpressure to
//! the process, which keeps running.
//!
//! Redaction is an opaque boundary: the [`Redactor`] trait is all the
//! capture layer knows about it.

pub mod capture;
pub mod error;
pub mod redact;
pub mod runner;

pub use capture::{CaptureBudget, OutputCapture, StreamKind};
pub use error::CaptureError;
pub use redact::{PassthroughRedactor, Redaction, Redactor};
pub use runner::{run_command, CancelToken, CommandOutcome};
