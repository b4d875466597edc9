//! Message Protocol
//!
//! Defines the envelope every outgoing payload is wrapped in before it is
//! written to the channel as a JSON text frame.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Envelope around a caller-supplied payload.
///
/// On the wire this is `{"data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedMessage<T> {
    pub data: T,
}

impl<T> WrappedMessage<T> {
    /// Wrap a payload
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Take the payload back out
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: Serialize> WrappedMessage<T> {
    /// Serialize the envelope to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<T: DeserializeOwned> WrappedMessage<T> {
    /// Deserialize an envelope from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u64,
        symbol: String,
        tags: Vec<String>,
        limit: Option<f64>,
    }

    #[test]
    fn test_envelope_shape() {
        let json = WrappedMessage::new("hello").to_json().unwrap();
        assert_eq!(json, r#"{"data":"hello"}"#);
    }

    #[test]
    fn test_struct_payload_round_trip() {
        let order = Order {
            id: 42,
            symbol: "ABC".to_string(),
            tags: vec!["fast".to_string(), "limit".to_string()],
            limit: Some(12.5),
        };

        let json = WrappedMessage::new(&order).to_json().unwrap();
        let decoded = WrappedMessage::<Order>::from_json(&json).unwrap();
        assert_eq!(decoded.into_inner(), order);
    }

    #[test]
    fn test_dynamic_payload_round_trip() {
        let payload = json!({
            "op": "subscribe",
            "channels": ["ticker", "trades"],
            "nested": { "depth": 3, "null": null }
        });

        let json = WrappedMessage::new(payload.clone()).to_json().unwrap();
        let decoded = WrappedMessage::<serde_json::Value>::from_json(&json).unwrap();
        assert_eq!(decoded.data, payload);
    }

    #[test]
    fn test_from_json_rejects_missing_data() {
        let result = WrappedMessage::<String>::from_json(r#"{"payload":"x"}"#);
        assert!(result.is_err());
    }
}
