use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ledger_core::{GroupId, PublicKey, Signature, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LinkError;

/// The `t` (token) object inside an invite link — the root-signed invite
/// grant itself, in wire form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InviteLinkToken {
    pub g: GroupId,
    pub i: PublicKey,
    pub e: Timestamp,
    pub s: Signature,
}

/// A full invite link payload: the invite token plus optional out-of-band
/// hints (relay URL, group shared secret) a convenience client can embed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InviteLinkData {
    pub t: InviteLinkToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

/// Encode an invite link payload as URL-safe, unpadded base64 of its JSON
/// serialization.
pub fn encode_invite_link(data: &InviteLinkData) -> String {
    let json = serde_json::to_vec(data).expect("InviteLinkData is always representable as JSON");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode an invite link payload, accepting either the raw base64 payload or
/// a full URL of the form `…?token=<payload>`.
pub fn decode_invite_link(input: &str) -> Result<InviteLinkData, LinkError> {
    let payload = extract_token(input);

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| LinkError::InvalidBase64)?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|_| LinkError::InvalidJson)?;

    let t = value.get("t").ok_or(LinkError::MissingField("t"))?;
    for field in ["g", "i", "e", "s"] {
        if t.get(field).is_none() {
            return Err(LinkError::MissingField(field_name(field)));
        }
    }

    serde_json::from_value(value).map_err(|_| LinkError::InvalidJson)
}

fn field_name(short: &str) -> &'static str {
    match short {
        "g" => "t.g",
        "i" => "t.i",
        "e" => "t.e",
        "s" => "t.s",
        _ => "t.?",
    }
}

/// If `input` looks like a URL carrying a `token` query parameter, return
/// just that parameter's value; otherwise treat `input` as the raw payload.
fn extract_token(input: &str) -> &str {
    if let Some(query_start) = input.find('?') {
        let query = &input[query_start + 1..];
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("token=") {
                return value;
            }
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_crypto::KeyPair;

    fn sample() -> InviteLinkData {
        let inviter = KeyPair::generate();
        InviteLinkData {
            t: InviteLinkToken {
                g: GroupId::new(),
                i: inviter.public_key,
                e: 1_800_000_000_000,
                s: inviter.sign(b"whatever"),
            },
            r: Some("wss://relay.example".to_string()),
            k: None,
        }
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let data = sample();
        let encoded = encode_invite_link(&data);
        let decoded = decode_invite_link(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_with_all_optional_fields_present() {
        let mut data = sample();
        data.k = Some("deadbeef".to_string());
        let encoded = encode_invite_link(&data);
        assert_eq!(decode_invite_link(&encoded).unwrap(), data);
    }

    #[test]
    fn accepts_url_with_token_query_param() {
        let data = sample();
        let encoded = encode_invite_link(&data);
        let url = format!("https://app.example/join?token={encoded}");
        assert_eq!(decode_invite_link(&url).unwrap(), data);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_invite_link("not valid base64!!"),
            Err(LinkError::InvalidBase64)
        ));
    }

    #[test]
    fn rejects_invalid_json() {
        let encoded = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(matches!(
            decode_invite_link(&encoded),
            Err(LinkError::InvalidJson)
        ));
    }

    #[test]
    fn rejects_missing_token_fields() {
        let encoded = URL_SAFE_NO_PAD.encode(br#"{"t":{"g":"x"}}"#);
        assert!(matches!(
            decode_invite_link(&encoded),
            Err(LinkError::MissingField(_))
        ));
    }
}
