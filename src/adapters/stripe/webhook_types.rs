//! Stripe-specific types for webhook handling.
//!
//! These types represent Stripe API objects as they arrive in webhook
//! payloads: the signature header, the event envelope, and the payment
//! intent object the pipeline cares about.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty or missing.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// Missing v1 signature component.
    MissingV1Signature,
    /// Invalid timestamp format.
    InvalidTimestamp,
    /// Invalid signature format (not valid hex).
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed Stripe-Signature header components.
///
/// The header format is: `t=timestamp,v1=signature[,v0=legacy_signature]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe generated the event.
    pub timestamp: i64,

    /// Primary v1 signature (HMAC-SHA256, hex-encoded).
    pub v1_signature: Vec<u8>,

    /// Legacy v0 signature (deprecated, may be absent).
    pub v0_signature: Option<Vec<u8>>,
}

impl SignatureHeader {
    /// Parse a Stripe-Signature header into components.
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;
        let mut v0_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex_decode(value.trim())
                            .ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                "v0" => {
                    v0_signature = Some(
                        hex_decode(value.trim())
                            .ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureParseError::MissingTimestamp)?,
            v1_signature: v1_signature.ok_or(SignatureParseError::MissingV1Signature)?,
            v0_signature,
        })
    }
}

/// Decode a hex string to bytes.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}

/// Encode bytes to hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Event Types
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Stripe webhook event as received from the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: StripeEventData,

    /// Whether this is a live or test event.
    pub livemode: bool,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,
}

/// Stripe PaymentIntent object, reduced to what reconciliation needs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    /// Intent identifier (pi_...).
    pub id: String,

    /// Amount in minor units.
    pub amount: i64,

    /// Amount actually captured, present on succeeded intents.
    #[serde(default)]
    pub amount_received: Option<i64>,

    /// Lowercase ISO currency code.
    pub currency: String,

    /// Client secret for driving the payment UI.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Intent status (requires_payment_method, succeeded, ...).
    #[serde(default)]
    pub status: Option<String>,
}

impl StripePaymentIntent {
    /// The amount the provider actually captured: `amount_received` when
    /// present, otherwise the authorized amount.
    pub fn captured_amount(&self) -> i64 {
        self.amount_received.unwrap_or(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_signature_header() {
        let header = "t=1704067200,v1=deadbeef,v0=cafe";
        let parsed = SignatureHeader::parse(header).unwrap();
        assert_eq!(parsed.timestamp, 1704067200);
        assert_eq!(parsed.v1_signature, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(parsed.v0_signature, Some(vec![0xca, 0xfe]));
    }

    #[test]
    fn rejects_empty_header() {
        assert_eq!(
            SignatureHeader::parse(""),
            Err(SignatureParseError::MissingHeader)
        );
    }

    #[test]
    fn rejects_header_without_v1() {
        assert_eq!(
            SignatureHeader::parse("t=1704067200"),
            Err(SignatureParseError::MissingV1Signature)
        );
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert_eq!(
            SignatureHeader::parse("t=1704067200,v1=zzzz"),
            Err(SignatureParseError::InvalidSignatureFormat)
        );
    }

    #[test]
    fn ignores_unknown_header_fields() {
        let parsed = SignatureHeader::parse("t=5,v1=ab,v2=future").unwrap();
        assert_eq!(parsed.timestamp, 5);
    }

    #[test]
    fn hex_roundtrip() {
        let bytes = vec![0x00, 0x7f, 0xff];
        assert_eq!(hex_decode(&hex_encode(&bytes)), Some(bytes));
    }

    #[test]
    fn payment_intent_prefers_amount_received() {
        let intent: StripePaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "amount": 2500,
            "amount_received": 2500,
            "currency": "eur"
        }))
        .unwrap();
        assert_eq!(intent.captured_amount(), 2500);
    }

    #[test]
    fn payment_intent_falls_back_to_amount() {
        let intent: StripePaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "amount": 1200,
            "currency": "jod"
        }))
        .unwrap();
        assert_eq!(intent.captured_amount(), 1200);
    }
}
