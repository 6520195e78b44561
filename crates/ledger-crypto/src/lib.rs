pub mod cipher;
pub mod error;
pub mod hash;
pub mod keypair;
pub mod sign;

pub use cipher::{decrypt, derive_group_key, encrypt, GroupKey};
pub use error::CryptoError;
pub use hash::{hash_to_id, sha256};
pub use keypair::KeyPair;
pub use sign::{sign, verify_signature};
