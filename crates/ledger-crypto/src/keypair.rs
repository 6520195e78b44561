use ed25519_dalek::SigningKey;
use ledger_core::{PublicKey, SecretKey, Signature};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::sign;

/// An Ed25519 keypair — used for both root identities and device keys; which
/// role a given keypair plays is determined by where its public key appears
/// in the ledger, not by anything in this type.
///
/// The secret key is held in a `Zeroizing<[u8; 32]>` so it is wiped on drop.
pub struct KeyPair {
    pub public_key: PublicKey,
    secret_key: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    /// Generate a fresh Ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            public_key: PublicKey::from_bytes(signing_key.verifying_key().to_bytes()),
            secret_key: Zeroizing::new(signing_key.to_bytes()),
        }
    }

    /// Restore a keypair from raw bytes (e.g. loaded from a wallet file).
    pub fn from_secret_bytes(secret_key_bytes: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret_key_bytes);
        Self {
            public_key: PublicKey::from_bytes(signing_key.verifying_key().to_bytes()),
            secret_key: Zeroizing::new(secret_key_bytes),
        }
    }

    /// Sign `message` using this keypair's secret key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign::sign(&SecretKey::from_bytes(*self.secret_key), message)
    }

    /// Read-only view of the secret key bytes, for callers persisting a
    /// keypair (e.g. an identity store).
    pub fn secret_key_bytes(&self) -> &[u8; 32] {
        &self.secret_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {:?} }}", self.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_verifiable_keypair() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"hello");
        assert!(crate::sign::verify_signature(&kp.public_key, b"hello", &sig).is_ok());
    }
}
