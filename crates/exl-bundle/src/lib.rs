//! Bundle packaging for ExecLedger.
//!
//! [`pack`] turns a resolved session directory into a single
//! byte-reproducible tar archive containing the canonical manifest, the
//! session's required files, and a legacy human-readable manifest.
//!
//! # Design Rules
//!
//! 1. The scope guard runs to completion before any output exists:
//!    forbidden watch/temp artifacts anywhere under the session
//!    directory abort the export.
//! 2. Every file is read exactly once; hashes and archive bytes come
//!    from the same snapshot.
//! 3. Manifests and the archive are written with the
//!    temp-file-then-rename discipline, so a crash never leaves a
//!    half-written file at a final path.
//! 4. Archive entries carry a fixed mtime and mode in a fixed order;
//!    identical inputs produce byte-identical archives.

pub mod archive;
pub mod error;
pub mod manifest;
pub mod packager;
pub mod scope;

pub use error::BundleError;
pub use manifest::Manifest;
pub use packager::{pack, REQUIRED_FILES};
