//! Opaque save/restore blob identifying a persistent anchor to the backend

use crate::validation::error::AnchorError;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Immutable payload bytes; compared by value only
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AnchorPayload {
    data: Vec<u8>,
}

impl AnchorPayload {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { data: bytes.into() }
    }

    /// Decode a payload previously produced by [`AnchorPayload::to_base64`].
    ///
    /// The input is decoded exactly as given; surrounding whitespace is an error.
    pub fn from_base64(encoded: &str) -> Result<Self, AnchorError> {
        general_purpose::STANDARD
            .decode(encoded)
            .map(Self::from_bytes)
            .map_err(|e| AnchorError::MalformedPayload {
                reason: e.to_string(),
            })
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Payloads can be several kilobytes; keep logs readable.
impl fmt::Debug for AnchorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnchorPayload({})", self)
    }
}

impl fmt::Display for AnchorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.data.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        write!(f, "{} bytes [{}..]", self.data.len(), head)
    }
}

impl Serialize for AnchorPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for AnchorPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        AnchorPayload::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_encoding() {
        let payload = AnchorPayload::from_bytes(b"anchor".to_vec());
        assert_eq!(payload.to_base64(), "YW5jaG9y");
        assert_eq!(AnchorPayload::from_base64("YW5jaG9y").unwrap(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let payload = AnchorPayload::from_bytes(Vec::new());
        assert!(payload.is_empty());
        assert_eq!(payload.to_base64(), "");
        assert!(AnchorPayload::from_base64("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_base64_is_rejected() {
        let err = AnchorPayload::from_base64("not base64!!").unwrap_err();
        assert!(matches!(err, AnchorError::MalformedPayload { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_whitespace_is_not_stripped() {
        assert!(AnchorPayload::from_base64(" YW5jaG9y").is_err());
        assert!(AnchorPayload::from_base64("YW5jaG9y\n").is_err());
    }

    #[test]
    fn test_debug_does_not_dump_bytes() {
        let payload = AnchorPayload::from_bytes(vec![0xab; 4096]);
        let rendered = format!("{:?}", payload);
        assert!(rendered.contains("4096 bytes"));
        assert!(rendered.len() < 64);
    }

    #[test]
    fn test_serde_uses_base64_string() {
        let payload = AnchorPayload::from_bytes(vec![1, 2, 3]);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "\"AQID\"");
        let back: AnchorPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    proptest! {
        #[test]
        fn prop_base64_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = AnchorPayload::from_bytes(bytes.clone()).to_base64();
            let decoded = AnchorPayload::from_base64(&encoded).unwrap();
            prop_assert_eq!(decoded.as_bytes(), bytes.as_slice());
        }
    }
}
