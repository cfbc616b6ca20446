//! Codec configuration

use serde::{Deserialize, Serialize};
use typed_asn1_core::EncodingRules;

/// Context configuration
///
/// Deserializable from any serde format, missing keys take the defaults:
///
/// ```toml
/// encoding = "der"
/// decoding = "ber"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Rules applied when producing bytes
    pub encoding: EncodingRules,
    /// Rules applied when reading bytes
    pub decoding: EncodingRules,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingRules::Der,
            decoding: EncodingRules::Der,
        }
    }
}

impl ContextConfig {
    /// Lenient profile: BER on both directions
    pub fn ber() -> Self {
        Self {
            encoding: EncodingRules::Ber,
            decoding: EncodingRules::Ber,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error as ValueError, MapDeserializer};
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ContextConfig::default();
        assert!(config.encoding.is_der());
        assert!(config.decoding.is_der());
        assert!(!ContextConfig::ber().decoding.is_der());
    }

    #[test]
    fn test_deserialize_partial() {
        let mut map = HashMap::new();
        map.insert("decoding", "ber");
        let config =
            ContextConfig::deserialize(MapDeserializer::<_, ValueError>::new(map.into_iter()))
                .unwrap();
        assert_eq!(config.encoding, EncodingRules::Der);
        assert_eq!(config.decoding, EncodingRules::Ber);
    }

    #[test]
    fn test_deserialize_rejects_unknown_rules() {
        let mut map = HashMap::new();
        map.insert("encoding", "xer");
        let result =
            ContextConfig::deserialize(MapDeserializer::<_, ValueError>::new(map.into_iter()));
        assert!(result.is_err());
    }
}
