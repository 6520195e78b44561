use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use ledger_core::GroupId;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::CryptoError;

const HKDF_INFO: &[u8] = b"splitledger-relay-encryption";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A derived per-group AEAD key. Opaque on purpose — callers never see the
/// raw bytes again once derived.
#[derive(Clone)]
pub struct GroupKey([u8; 32]);

/// Derive the per-group AEAD key: `HKDF-SHA256(ikm = shared_secret,
/// salt = utf8(group_id), info = "splitledger-relay-encryption", len = 32)`.
///
/// Deterministic in `shared_secret` and `group_id`: the same pair always
/// yields the same key, and either input changing changes the output.
pub fn derive_group_key(shared_secret: &[u8], group_id: &GroupId) -> GroupKey {
    let salt = group_id.to_string();
    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), shared_secret);
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .expect("32-byte okm is within HKDF-SHA256's output range");
    GroupKey(okm)
}

/// Encrypt `plaintext` under `key`, producing `nonce(12) || ciphertext+tag`.
/// A fresh random nonce is drawn for every call — nonces are never reused.
pub fn encrypt(key: &GroupKey, plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .expect("AES-256-GCM encryption of a bounded plaintext is infallible");
    let mut frame = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    frame.extend_from_slice(&nonce_bytes);
    frame.extend_from_slice(&ciphertext);
    frame
}

/// Decrypt a `nonce(12) || ciphertext+tag` frame produced by [`encrypt`].
/// Never distinguishes *why* decryption failed (short frame, bad tag, wrong
/// key) beyond the two error variants below — that information would leak to
/// an untrusted relay observing error responses.
pub fn decrypt(key: &GroupKey, frame: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if frame.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::CiphertextTooShort {
            min: NONCE_LEN + TAG_LEN,
            got: frame.len(),
        });
    }
    let (nonce_bytes, ciphertext) = frame.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}
