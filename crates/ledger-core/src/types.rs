use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Signed integer in minor currency units (e.g. cents). No floating point is
/// ever introduced into balance arithmetic.
pub type Amount = i64;

/// Wall-clock milliseconds since the Unix epoch. Advisory only — ordering is
/// primarily driven by `lamport_clock`.
pub type Timestamp = i64;

/// A per-group monotonic logical counter. Values may repeat across devices
/// and are disambiguated by the ordering tiebreak in `ledger-engine`.
pub type LamportClock = u64;

// ── GroupId ──────────────────────────────────────────────────────────────────

/// Opaque group identifier (UUID v4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub uuid::Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

// ── PublicKey ────────────────────────────────────────────────────────────────

/// An Ed25519 public key — a root identity or a device key, depending on
/// where it appears in an entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexLengthError> {
        decode_fixed(s, "PublicKey").map(Self)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}…)", &self.to_hex()[..8])
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ── SecretKey ────────────────────────────────────────────────────────────────

/// An Ed25519 secret key. Never serialized by derive — callers that need to
/// persist one must go through `ledger-crypto`'s explicit export path.
#[derive(Clone)]
pub struct SecretKey(pub Zeroizing<[u8; 32]>);

impl SecretKey {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(Zeroizing::new(b))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

// ── Signature ────────────────────────────────────────────────────────────────

/// An Ed25519 signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "hex_signature")] pub [u8; 64]);

impl Signature {
    pub fn from_bytes(b: [u8; 64]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexLengthError> {
        decode_fixed_64(s, "Signature").map(Self)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &self.to_hex()[..8])
    }
}

mod hex_signature {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_fixed_64(&s, "Signature").map_err(serde::de::Error::custom)
    }
}

// ── Hash ─────────────────────────────────────────────────────────────────────

/// A SHA-256 digest, used as an `entry_id` and as a `previous_hash` reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex_hash")] pub [u8; 32]);

mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_fixed(&s, "Hash").map_err(serde::de::Error::custom)
    }
}

impl Hash {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexLengthError> {
        decode_fixed(s, "Hash").map(Self)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}…)", &self.to_hex()[..8])
    }
}

// ── shared hex-decoding helpers ──────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("invalid {what} hex: expected {expected} bytes, got {got}")]
pub struct HexLengthError {
    what: &'static str,
    expected: usize,
    got: usize,
}

fn decode_fixed(s: &str, what: &'static str) -> Result<[u8; 32], HexLengthError> {
    let bytes = hex::decode(s).map_err(|_| HexLengthError {
        what,
        expected: 32,
        got: s.len() / 2,
    })?;
    if bytes.len() != 32 {
        return Err(HexLengthError {
            what,
            expected: 32,
            got: bytes.len(),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

fn decode_fixed_64(s: &str, what: &'static str) -> Result<[u8; 64], HexLengthError> {
    let bytes = hex::decode(s).map_err(|_| HexLengthError {
        what,
        expected: 64,
        got: s.len() / 2,
    })?;
    if bytes.len() != 64 {
        return Err(HexLengthError {
            what,
            expected: 64,
            got: bytes.len(),
        });
    }
    let mut arr = [0u8; 64];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
