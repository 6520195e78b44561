use std::time::Duration;

/// Configuration for the relay transport's WebSocket client.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base relay URL, e.g. `wss://relay.example/ws`. The active group's
    /// `groupId` query parameter is appended on connect.
    pub url: String,
    /// Per-request timeout for `GET_ENTRIES_AFTER`/`GET_FULL_LEDGER` (§5).
    pub request_timeout: Duration,
    /// Delay before attempting to reconnect after an unexpected disconnect.
    pub reconnect_delay: Duration,
    /// Interval between keepalive `PING` frames.
    pub keepalive_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "wss://relay.splitledger.example/ws".to_string(),
            request_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

/// Configuration for the best-effort peer transport.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Channel depth for the local broadcast fan-out (§4.7 implementation
    /// note: no WebRTC stack is required by the spec, so the peer transport
    /// is a same-process best-effort broadcast suitable for test harnesses
    /// and as the shape a real WebRTC-backed transport would fill in).
    pub channel_capacity: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

/// Configuration for the composite transport's seen-set dedup (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct CompositeConfig {
    pub seen_set_capacity: usize,
    pub seen_set_trim_chunk: usize,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            seen_set_capacity: 10_000,
            seen_set_trim_chunk: 1_000,
        }
    }
}
