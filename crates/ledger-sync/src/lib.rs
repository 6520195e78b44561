pub mod error;
pub mod events;
pub mod manager;

pub use error::SyncError;
pub use events::{RejectionReason, SyncEvent, SyncEventHandler};
pub use manager::{SyncManager, DEFAULT_BACKGROUND_SYNC_INTERVAL};
