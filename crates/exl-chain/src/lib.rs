//! Chain primitives for ExecLedger.
//!
//! Two pure functions form the integrity core of every ledger in the
//! system: [`canonicalize`], which renders structured data as
//! deterministic JSON text, and [`chain_step`], which links one ledger
//! line to its predecessor with a SHA-256 digest.
//!
//! # Design Rules
//!
//! 1. Every hash computed from structured data goes through
//!    [`canonicalize`]. A second serializer anywhere in the chain breaks
//!    cross-tool verifiability.
//! 2. [`chain_step`] is the only place the hashing rule lives. Writers and
//!    verifiers both call it; neither re-derives it.
//! 3. Both functions are side-effect-free and infallible.

pub mod canonical;
pub mod step;

pub use canonical::canonicalize;
pub use step::{chain_step, sha256_hex, GENESIS};
