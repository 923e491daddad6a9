//! Foundation types for ExecLedger.
//!
//! This crate provides the shared vocabulary used throughout the ExecLedger
//! system. Every other ExecLedger crate depends on `exl-types`.
//!
//! # Key Types
//!
//! - [`LedgerEvent`] -- One hash-chained line of a session ledger
//! - [`EventDraft`] -- The caller-supplied portion of an event, before chain fields are assigned
//! - [`EventLevel`] -- Severity classification for ledger events
//! - [`LayoutMode`] -- Which on-disk layout strategy produced a session location
//! - [`SessionLocation`] -- A resolved session directory plus the mode that found it

pub mod event;
pub mod layout;

pub use event::{EventDraft, EventLevel, LedgerEvent};
pub use layout::{LayoutMode, SessionLocation};
