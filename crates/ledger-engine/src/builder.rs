use ledger_core::{to_canonical_bytes, Entry, EntryBody, EntryPayload, Hash, LamportClock, PublicKey, Timestamp};
use ledger_crypto::KeyPair;

use crate::error::EngineError;

/// Builds a new [`Entry`]: computes `entry_id` over the canonical body
/// (§4.1, invariant I2) and signs the hex-encoded id with the creating
/// device's key — the signature covers the UTF-8 bytes of the hex string,
/// not the raw 32-byte digest, so existing records stay interoperable.
pub struct EntryBuilder {
    previous_hash: Option<Hash>,
    lamport_clock: LamportClock,
    timestamp: Timestamp,
    payload: EntryPayload,
}

impl EntryBuilder {
    pub fn new(
        previous_hash: Option<Hash>,
        lamport_clock: LamportClock,
        timestamp: Timestamp,
        payload: EntryPayload,
    ) -> Self {
        Self {
            previous_hash,
            lamport_clock,
            timestamp,
            payload,
        }
    }

    /// Compute `entry_id`, sign it with `device`, and assemble the finished
    /// [`Entry`]. `device` is the key whose public half becomes
    /// `creator_device_pubkey`.
    pub fn build(self, device: &KeyPair) -> Result<Entry, EngineError> {
        let body = EntryBody {
            previous_hash: &self.previous_hash,
            lamport_clock: self.lamport_clock,
            timestamp: self.timestamp,
            creator_device_pubkey: &device.public_key,
            payload: &self.payload,
        };
        let entry_id = entry_id_of(&body)?;
        let signature = device.sign(entry_id.to_hex().as_bytes());

        Ok(Entry {
            entry_id,
            previous_hash: self.previous_hash,
            lamport_clock: self.lamport_clock,
            timestamp: self.timestamp,
            creator_device_pubkey: device.public_key,
            signature,
            payload: self.payload,
        })
    }
}

/// Recompute the content-addressed id of an entry body. Used both by the
/// builder (to mint a fresh entry) and by the validator (to check hash
/// integrity, invariant I2, against an entry already on the wire).
pub fn entry_id_of(body: &EntryBody<'_>) -> Result<Hash, EngineError> {
    let bytes = to_canonical_bytes(body)?;
    Ok(ledger_crypto::hash_to_id(&bytes))
}

/// Verify an already-built entry's hash and signature (invariants I2, I3).
/// Does not check authorization or payload rules — see `validate::validate_entry`.
pub fn verify_entry_integrity(entry: &Entry) -> Result<(), EngineError> {
    let recomputed = entry_id_of(&entry.body())?;
    if recomputed != entry.entry_id {
        return Err(EngineError::HashMismatch);
    }
    ledger_crypto::verify_signature(
        &entry.creator_device_pubkey,
        entry.entry_id.to_hex().as_bytes(),
        &entry.signature,
    )
    .map_err(|_| EngineError::SignatureInvalid)
}

/// Convenience helper: construct and sign a `Genesis` entry for a brand-new
/// group. `creator_device_pubkey` is implicitly `creator.public_key` — a
/// Genesis entry is always self-created and self-authorizing.
pub fn build_genesis(
    creator: &KeyPair,
    group_id: ledger_core::GroupId,
    group_name: String,
    creator_display_name: String,
    timestamp: Timestamp,
) -> Result<Entry, EngineError> {
    let payload = EntryPayload::Genesis {
        group_id,
        group_name,
        creator_root_pubkey: creator.public_key,
        creator_display_name,
    };
    EntryBuilder::new(None, 0, timestamp, payload).build(creator)
}
