//! Session layout resolution for ExecLedger.
//!
//! Sessions live under an artifacts root in one of three layouts, tried in
//! fixed order per exec directory:
//!
//! 1. **Milestone** -- `<root>/exec_*/milestone/<session>` (canonical)
//! 2. **Direct session** -- `<root>/exec_*/<session>`
//! 3. **Flat exec** -- `<root>/exec_*` is itself the session
//!
//! A directory counts as a session only when it carries a marker file
//! (`summary.txt` or `report.txt`). Exec directories are ordered by name,
//! newest first; sessions within an exec directory by modification time.
//! The resolver returns a [`SessionLocation`](exl_types::SessionLocation)
//! whose [`LayoutMode`](exl_types::LayoutMode) tag travels with it --
//! consumers never re-infer the mode from path shape.
//!
//! [`contract`] builds the engine contract JSON that desktop tooling
//! consumes for a resolved session.

pub mod contract;
pub mod error;
pub mod resolver;

pub use contract::{build_contract, SessionContract};
pub use error::LayoutError;
pub use resolver::{find_latest_session, find_specific_session, MARKER_FILES};
