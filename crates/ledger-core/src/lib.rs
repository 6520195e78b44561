pub mod canonical;
pub mod entry;
pub mod error;
pub mod fields;
pub mod types;

pub use canonical::{to_canonical_bytes, to_canonical_json};
pub use entry::{
    DeviceAuthorization, Entry, EntryBody, EntryPayload, ExpensePayload, InviteToken,
    RecoveryCoSignature,
};
pub use error::CoreError;
pub use types::{
    Amount, GroupId, Hash, HexLengthError, LamportClock, PublicKey, SecretKey, Signature,
    Timestamp,
};
