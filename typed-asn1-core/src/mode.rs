//! Encoding rule selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoding rules applied by a codec direction
///
/// - **BER**: permissive, several encodings per value, indefinite lengths
/// - **DER**: canonical subset of BER, exactly one encoding per value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingRules {
    Ber,
    #[default]
    Der,
}

impl EncodingRules {
    /// Build from a DER flag
    pub fn from_der(der: bool) -> Self {
        if der {
            EncodingRules::Der
        } else {
            EncodingRules::Ber
        }
    }

    pub fn is_der(self) -> bool {
        self == EncodingRules::Der
    }
}

impl fmt::Display for EncodingRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingRules::Ber => f.write_str("BER"),
            EncodingRules::Der => f.write_str("DER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_der() {
        assert!(EncodingRules::default().is_der());
        assert_eq!(EncodingRules::from_der(false), EncodingRules::Ber);
        assert_eq!(EncodingRules::Ber.to_string(), "BER");
    }
}
