use ledger_core::{to_canonical_bytes, DeviceAuthorization, PublicKey, Timestamp};
use ledger_crypto::KeyPair;

use crate::error::IdentityError;

/// Root-sign a binding of `device_public_key` to `owner`'s root identity,
/// effective at `authorized_at`.
///
/// When embedded in a `DeviceAuthorized` entry, `authorized_at` MUST equal
/// the entry's own `timestamp` — that binding is enforced by the validator
/// in `ledger-engine`, not here.
pub fn authorize_device(
    owner: &KeyPair,
    device_public_key: PublicKey,
    authorized_at: Timestamp,
) -> Result<DeviceAuthorization, IdentityError> {
    let unsigned = DeviceAuthorization {
        device_public_key,
        root_public_key: owner.public_key,
        authorized_at,
        signature: ledger_core::Signature::from_bytes([0u8; 64]),
    };
    let body_bytes = to_canonical_bytes(&unsigned.body())?;
    let signature = owner.sign(&body_bytes);
    Ok(DeviceAuthorization {
        signature,
        ..unsigned
    })
}

/// Verify that a `DeviceAuthorization` was genuinely signed by
/// `root_public_key` over its canonical body.
pub fn verify_device_authorization(auth: &DeviceAuthorization) -> Result<(), IdentityError> {
    let body_bytes = to_canonical_bytes(&auth.body())?;
    ledger_crypto::verify_signature(&auth.root_public_key, &body_bytes, &auth.signature)
        .map_err(|_| IdentityError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_then_verify_round_trip() {
        let owner = KeyPair::generate();
        let device = KeyPair::generate();
        let auth = authorize_device(&owner, device.public_key, 1_700_000_000_000).unwrap();
        assert!(verify_device_authorization(&auth).is_ok());
    }

    #[test]
    fn tampered_authorized_at_fails() {
        let owner = KeyPair::generate();
        let device = KeyPair::generate();
        let mut auth = authorize_device(&owner, device.public_key, 1_700_000_000_000).unwrap();
        auth.authorized_at += 1;
        assert!(verify_device_authorization(&auth).is_err());
    }
}
