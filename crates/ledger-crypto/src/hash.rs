use ledger_core::Hash;
use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash of the canonical body bytes of an entry (or any other record whose id
/// is content-addressed the same way).
pub fn hash_to_id(canonical_body_bytes: &[u8]) -> Hash {
    Hash::from_bytes(sha256(canonical_body_bytes))
}
