use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use ledger_core::{PublicKey, SecretKey, Signature};

use crate::error::CryptoError;

/// Sign `message` with an Ed25519 secret key. Returns a detached signature.
pub fn sign(secret_key: &SecretKey, message: &[u8]) -> Signature {
    let signing_key = SigningKey::from_bytes(secret_key.as_bytes());
    let sig = signing_key.sign(message);
    Signature::from_bytes(sig.to_bytes())
}

/// Verify a detached Ed25519 signature.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), CryptoError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = DalekSignature::from_bytes(signature.as_bytes());
    verifying_key
        .verify(message, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}
