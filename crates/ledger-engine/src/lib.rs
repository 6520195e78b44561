pub mod builder;
pub mod error;
pub mod order;
pub mod replay;
pub mod state;
pub mod validate;

pub use builder::{build_genesis, entry_id_of, verify_entry_integrity, EntryBuilder};
pub use error::{EngineError, EntryValidationError, IssueKind, ValidationIssue};
pub use order::{order_entries, ordered, sort_key};
pub use replay::{apply_entry, validate_and_replay_chain, ReplayResult};
pub use state::{GroupState, Member};
pub use validate::{into_chain_error, validate_entry, EntryValidation};
