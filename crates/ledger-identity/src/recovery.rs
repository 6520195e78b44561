use ledger_core::entry::RecoveryCoSignatureBody;
use ledger_core::{to_canonical_bytes, GroupId, PublicKey, RecoveryCoSignature};
use ledger_crypto::KeyPair;

use crate::error::IdentityError;

/// Root-sign an endorsement of rotating `previous_root_pubkey` to
/// `new_root_pubkey` within `group_id`.
pub fn co_sign_rotation(
    signer: &KeyPair,
    previous_root_pubkey: &PublicKey,
    new_root_pubkey: &PublicKey,
    group_id: &GroupId,
) -> Result<RecoveryCoSignature, IdentityError> {
    let body_bytes = to_canonical_bytes(&RecoveryCoSignatureBody {
        previous_root_pubkey,
        new_root_pubkey,
        group_id,
    })?;
    Ok(RecoveryCoSignature {
        signer_root_pubkey: signer.public_key,
        signature: signer.sign(&body_bytes),
    })
}

/// Verify one co-signature against the rotation it claims to endorse.
pub fn verify_co_signature(
    co_sig: &RecoveryCoSignature,
    previous_root_pubkey: &PublicKey,
    new_root_pubkey: &PublicKey,
    group_id: &GroupId,
) -> Result<(), IdentityError> {
    let body_bytes = to_canonical_bytes(&RecoveryCoSignatureBody {
        previous_root_pubkey,
        new_root_pubkey,
        group_id,
    })?;
    ledger_crypto::verify_signature(&co_sig.signer_root_pubkey, &body_bytes, &co_sig.signature)
        .map_err(|_| IdentityError::InvalidSignature)
}

/// The minimum number of valid, unique, non-self co-signatures required to
/// rotate a root key, given `active_members` currently-active members
/// (the rotating member itself excluded): `floor((A - 1) / 2) + 1`.
pub fn recovery_threshold(active_members: usize) -> usize {
    if active_members == 0 {
        return 1;
    }
    (active_members - 1) / 2 + 1
}
