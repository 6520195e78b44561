pub mod composite;
pub mod config;
pub mod error;
pub mod peer;
pub mod registry;
pub mod relay;
pub mod traits;
pub mod wire;

pub use composite::CompositeTransport;
pub use config::{CompositeConfig, PeerConfig, RelayConfig};
pub use error::TransportError;
pub use peer::PeerTransport;
pub use relay::RelayTransport;
pub use traits::{ConnectionState, ConnectionStateHandler, EntryHandler, Transport};
pub use wire::{ClientMessage, ServerMessage, TransportEntry, WireEntry};
