use ledger_core::{to_canonical_bytes, GroupId, InviteToken, Timestamp};
use ledger_crypto::KeyPair;

use crate::error::IdentityError;

/// Root-sign a grant permitting the holder to join `group_id` before
/// `expires_at`.
pub fn issue_invite(
    inviter: &KeyPair,
    group_id: GroupId,
    expires_at: Timestamp,
) -> Result<InviteToken, IdentityError> {
    let unsigned = InviteToken {
        group_id,
        inviter_root_pubkey: inviter.public_key,
        expires_at,
        signature: ledger_core::Signature::from_bytes([0u8; 64]),
    };
    let body_bytes = to_canonical_bytes(&unsigned.body())?;
    let signature = inviter.sign(&body_bytes);
    Ok(InviteToken {
        signature,
        ..unsigned
    })
}

/// Verify that an `InviteToken` was genuinely signed by
/// `inviter_root_pubkey` over its canonical body. Does not check expiry —
/// expiry is a validation-time, entry-timestamp-relative concern handled by
/// `ledger-engine`.
pub fn verify_invite_token(token: &InviteToken) -> Result<(), IdentityError> {
    let body_bytes = to_canonical_bytes(&token.body())?;
    ledger_crypto::verify_signature(&token.inviter_root_pubkey, &body_bytes, &token.signature)
        .map_err(|_| IdentityError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trip() {
        let inviter = KeyPair::generate();
        let token = issue_invite(&inviter, GroupId::new(), 1_800_000_000_000).unwrap();
        assert!(verify_invite_token(&token).is_ok());
    }
}
