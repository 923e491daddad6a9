use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use exl_chain::canonicalize;

use crate::error::BundleError;

/// Metadata record describing exactly which files, with which hashes,
/// are inside a bundle. Created once per export and embedded into the
/// archive in two renderings: canonical (sorted-key single line, for
/// hashing and diffing) and legacy (pretty-printed, for humans).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub session_id: String,
    /// Tag naming what produced this export.
    pub source: String,
    pub started_at: Option<String>,
    pub stopped_at: Option<String>,
    /// Archive file order; `sha256_by_file` is keyed by exactly this list.
    pub file_list: Vec<String>,
    pub sha256_by_file: BTreeMap<String, String>,
    /// Head hash the session recorded for its change log, when it did.
    pub changes_log_expected_head_hash: Option<String>,
    /// Head hash recomputed by replaying the change log.
    pub changes_log_computed_head_hash: String,
    /// True when the change-log chain is valid and, if an expected head
    /// was recorded, the computed head matches it.
    pub changes_log_verified: bool,
}

impl Manifest {
    /// Canonical single-line rendering with deterministically ordered keys.
    pub fn canonical_text(&self) -> Result<String, BundleError> {
        let value =
            serde_json::to_value(self).map_err(|e| BundleError::Serialization(e.to_string()))?;
        Ok(canonicalize(&value))
    }

    /// Pretty-printed rendering for human tooling.
    pub fn legacy_text(&self) -> Result<String, BundleError> {
        serde_json::to_string_pretty(self).map_err(|e| BundleError::Serialization(e.to_string()))
    }
}

/// Optional per-session metadata file (`session_summary.json`). Anything
/// the session did not record stays `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub stopped_at: Option<String>,
    /// Head hash the session recorded for its change log.
    #[serde(default)]
    pub changes_head: Option<String>,
}

impl SessionSummary {
    pub fn parse(bytes: &[u8]) -> Result<Self, BundleError> {
        serde_json::from_slice(bytes)
            .map_err(|e| BundleError::Serialization(format!("session_summary.json: {e}")))
    }
}
