use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Amount, GroupId, Hash, LamportClock, PublicKey, Signature, Timestamp};

// ── Auxiliary authenticated records ─────────────────────────────────────────

/// A root-signed attestation binding `device_public_key` to `root_public_key`.
/// Embedded inside a `DeviceAuthorized` entry; `authorized_at` MUST equal the
/// entry's `timestamp` at validation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceAuthorization {
    pub device_public_key: PublicKey,
    pub root_public_key: PublicKey,
    pub authorized_at: Timestamp,
    pub signature: Signature,
}

/// The canonically-signed portion of a `DeviceAuthorization` (everything but
/// the signature itself).
#[derive(Serialize)]
pub struct DeviceAuthorizationBody<'a> {
    pub device_public_key: &'a PublicKey,
    pub root_public_key: &'a PublicKey,
    pub authorized_at: Timestamp,
}

impl DeviceAuthorization {
    pub fn body(&self) -> DeviceAuthorizationBody<'_> {
        DeviceAuthorizationBody {
            device_public_key: &self.device_public_key,
            root_public_key: &self.root_public_key,
            authorized_at: self.authorized_at,
        }
    }
}

/// A root-signed grant permitting the holder to join `group_id` before
/// `expires_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InviteToken {
    pub group_id: GroupId,
    pub inviter_root_pubkey: PublicKey,
    pub expires_at: Timestamp,
    pub signature: Signature,
}

#[derive(Serialize)]
pub struct InviteTokenBody<'a> {
    pub group_id: &'a GroupId,
    pub inviter_root_pubkey: &'a PublicKey,
    pub expires_at: Timestamp,
}

impl InviteToken {
    pub fn body(&self) -> InviteTokenBody<'_> {
        InviteTokenBody {
            group_id: &self.group_id,
            inviter_root_pubkey: &self.inviter_root_pubkey,
            expires_at: self.expires_at,
        }
    }
}

/// A root-signed endorsement of a `RootKeyRotation`, from a co-signing member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecoveryCoSignature {
    pub signer_root_pubkey: PublicKey,
    pub signature: Signature,
}

#[derive(Serialize)]
pub struct RecoveryCoSignatureBody<'a> {
    pub previous_root_pubkey: &'a PublicKey,
    pub new_root_pubkey: &'a PublicKey,
    pub group_id: &'a GroupId,
}

// ── Expense payload (shared by ExpenseCreated and the correction target) ───

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpensePayload {
    pub description: String,
    pub amount_minor_units: Amount,
    pub currency: String,
    pub paid_by_root_pubkey: PublicKey,
    pub splits: BTreeMap<PublicKey, Amount>,
}

// ── EntryPayload (the tagged-union discriminant) ────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry_type")]
pub enum EntryPayload {
    Genesis {
        group_id: GroupId,
        group_name: String,
        creator_root_pubkey: PublicKey,
        creator_display_name: String,
    },
    MemberAdded {
        member_root_pubkey: PublicKey,
        member_display_name: String,
        invite_token: InviteToken,
    },
    MemberRemoved {
        member_root_pubkey: PublicKey,
        reason: Option<String>,
    },
    DeviceAuthorized {
        owner_root_pubkey: PublicKey,
        device_public_key: PublicKey,
        device_name: String,
        authorization_signature: Signature,
    },
    DeviceRevoked {
        owner_root_pubkey: PublicKey,
        device_public_key: PublicKey,
        reason: Option<String>,
    },
    ExpenseCreated {
        #[serde(flatten)]
        expense: ExpensePayload,
    },
    ExpenseCorrection {
        referenced_entry_id: Hash,
        correction_reason: Option<String>,
        corrected_expense: ExpensePayload,
    },
    ExpenseVoided {
        voided_entry_id: Hash,
        reason: Option<String>,
    },
    RootKeyRotation {
        previous_root_pubkey: PublicKey,
        new_root_pubkey: PublicKey,
        co_signatures: Vec<RecoveryCoSignature>,
    },
}

impl EntryPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EntryPayload::Genesis { .. } => "Genesis",
            EntryPayload::MemberAdded { .. } => "MemberAdded",
            EntryPayload::MemberRemoved { .. } => "MemberRemoved",
            EntryPayload::DeviceAuthorized { .. } => "DeviceAuthorized",
            EntryPayload::DeviceRevoked { .. } => "DeviceRevoked",
            EntryPayload::ExpenseCreated { .. } => "ExpenseCreated",
            EntryPayload::ExpenseCorrection { .. } => "ExpenseCorrection",
            EntryPayload::ExpenseVoided { .. } => "ExpenseVoided",
            EntryPayload::RootKeyRotation { .. } => "RootKeyRotation",
        }
    }
}

// ── Entry ────────────────────────────────────────────────────────────────────

/// One immutable, signed record in a group's append-only chain.
///
/// `entry_id` is the SHA-256 of the canonical (RFC 8785 JCS) serialization of
/// every field below except `signature` itself — see [`EntryBody`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: Hash,
    pub previous_hash: Option<Hash>,
    pub lamport_clock: LamportClock,
    pub timestamp: Timestamp,
    pub creator_device_pubkey: PublicKey,
    pub signature: Signature,
    #[serde(flatten)]
    pub payload: EntryPayload,
}

/// The hashed/signed portion of an [`Entry`] — everything but `entry_id` and
/// `signature`. Mirrors the split between a record and its signature cover
/// used throughout the payload types above: nothing is signed that is not
/// first canonicalized.
#[derive(Serialize)]
pub struct EntryBody<'a> {
    pub previous_hash: &'a Option<Hash>,
    pub lamport_clock: LamportClock,
    pub timestamp: Timestamp,
    pub creator_device_pubkey: &'a PublicKey,
    #[serde(flatten)]
    pub payload: &'a EntryPayload,
}

impl Entry {
    /// Extract the body covered by `entry_id` and `signature`.
    pub fn body(&self) -> EntryBody<'_> {
        EntryBody {
            previous_hash: &self.previous_hash,
            lamport_clock: self.lamport_clock,
            timestamp: self.timestamp,
            creator_device_pubkey: &self.creator_device_pubkey,
            payload: &self.payload,
        }
    }

    pub fn entry_type(&self) -> &'static str {
        self.payload.kind()
    }
}
