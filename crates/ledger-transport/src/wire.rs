use ledger_core::{GroupId, LamportClock, PublicKey};
use serde::{Deserialize, Serialize};

/// One entry as carried over a transport, before the sync manager decrypts
/// and deserializes it into a real `Entry`. The ciphertext is base64-encoded
/// here so it round-trips cleanly through JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportEntry {
    pub encrypted_entry_base64: String,
    pub lamport_clock: LamportClock,
    pub sender_device_key: PublicKey,
}

/// Client → relay messages (§6 relay wire protocol).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "PUBLISH_ENTRY")]
    PublishEntry {
        group_id: GroupId,
        lamport_clock: LamportClock,
        sender_pubkey: PublicKey,
        encrypted_entry: String,
    },
    #[serde(rename = "GET_ENTRIES_AFTER")]
    GetEntriesAfter {
        group_id: GroupId,
        after_lamport_clock: LamportClock,
    },
    #[serde(rename = "GET_FULL_LEDGER")]
    GetFullLedger { group_id: GroupId },
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "SIGNAL_OFFER")]
    SignalOffer {
        group_id: GroupId,
        from_peer_id: String,
        to_peer_id: String,
        sdp: String,
    },
    #[serde(rename = "SIGNAL_ANSWER")]
    SignalAnswer {
        group_id: GroupId,
        from_peer_id: String,
        to_peer_id: String,
        sdp: String,
    },
    #[serde(rename = "SIGNAL_ICE")]
    SignalIce {
        group_id: GroupId,
        from_peer_id: String,
        to_peer_id: String,
        candidate: String,
    },
}

/// Relay → client messages.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "NEW_ENTRY")]
    NewEntry {
        group_id: GroupId,
        encrypted_entry: String,
        lamport_clock: LamportClock,
        sender_pubkey: PublicKey,
    },
    #[serde(rename = "ENTRIES_RESPONSE")]
    EntriesResponse {
        group_id: GroupId,
        entries: Vec<WireEntry>,
    },
    #[serde(rename = "FULL_LEDGER")]
    FullLedger {
        group_id: GroupId,
        entries: Vec<WireEntry>,
    },
    #[serde(rename = "PONG")]
    Pong,
    #[serde(rename = "ERROR")]
    Error { code: String, message: String },
}

/// An entry as it appears inside `ENTRIES_RESPONSE`/`FULL_LEDGER` —
/// structurally identical to `TransportEntry` but named for the wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireEntry {
    pub encrypted_entry: String,
    pub lamport_clock: LamportClock,
    pub sender_pubkey: PublicKey,
}

impl From<WireEntry> for TransportEntry {
    fn from(w: WireEntry) -> Self {
        TransportEntry {
            encrypted_entry_base64: w.encrypted_entry,
            lamport_clock: w.lamport_clock,
            sender_device_key: w.sender_pubkey,
        }
    }
}

impl From<TransportEntry> for WireEntry {
    fn from(t: TransportEntry) -> Self {
        WireEntry {
            encrypted_entry: t.encrypted_entry_base64,
            lamport_clock: t.lamport_clock,
            sender_pubkey: t.sender_device_key,
        }
    }
}
