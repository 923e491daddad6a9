//! Append-only session ledger for ExecLedger.
//!
//! This crate owns the two sides of the ledger's integrity story:
//! - [`LedgerWriter`] appends hash-chained events to a session's NDJSON
//!   ledger file, committing sequence and head-hash state only after the
//!   line is durably on disk
//! - [`verifier`] replays raw ledger lines through the shared chain
//!   primitive and reports validity, the first break point, and the
//!   recoverable head hash
//!
//! # Design Rules
//!
//! 1. One writer per live session; `append(&mut self)` serializes the
//!    compute-write-commit sequence by ownership.
//! 2. The durable write happens before any state commit. A failed write
//!    leaves `seq` and `last_hash` untouched, so a retry reuses them and
//!    the file never carries an orphaned sequence number.
//! 3. Verification is side-effect-free and shared: live tooling and
//!    export packaging call the same [`verifier::verify`].

pub mod error;
pub mod verifier;
pub mod writer;

pub use error::LedgerError;
pub use verifier::{verify, verify_file, ChainReport};
pub use writer::{LedgerState, LedgerWriter};
