use sha2::{Digest, Sha256};

/// Previous-hash sentinel for the first link of every chain.
pub const GENESIS: &str = "GENESIS";

/// Compute the chain hash linking one ledger line to its predecessor.
///
/// `SHA-256(prev_hash + "\n" + canonical_payload)`, rendered as lowercase
/// hex. Pure function of its two inputs.
pub fn chain_step(prev_hash: &str, canonical_payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lowercase-hex SHA-256 of raw bytes. Used for per-file manifest hashes
/// and contract hashes; not part of the chain rule.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
