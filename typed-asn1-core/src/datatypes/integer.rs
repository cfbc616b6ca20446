//! Unbounded integers

use serde::{Deserialize, Deserializer, Serialize};
use serde_bytes::ByteBuf;
use std::fmt;

/// An arbitrary precision ASN.1 INTEGER
///
/// The value is kept as its big-endian two's complement byte sequence in
/// the shortest possible form, which is also its DER content. Zero is
/// stored as an empty sequence so that `Integer::default()` is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Integer {
    #[serde(serialize_with = "serde_bytes::serialize", deserialize_with = "deserialize_minimal")]
    bytes: Vec<u8>,
}

fn deserialize_minimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let bytes = ByteBuf::deserialize(deserializer)?;
    Ok(minimal(&bytes))
}

impl Integer {
    /// Create an integer from big-endian two's complement bytes
    ///
    /// Redundant leading `0x00`/`0xFF` octets are stripped. An empty slice
    /// is zero.
    pub fn from_signed_bytes_be(bytes: &[u8]) -> Self {
        Self {
            bytes: minimal(bytes),
        }
    }

    /// Create a non-negative integer from a big-endian magnitude
    pub fn from_unsigned_bytes_be(magnitude: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(magnitude.len() + 1);
        bytes.push(0x00);
        bytes.extend_from_slice(magnitude);
        Self::from_signed_bytes_be(&bytes)
    }

    /// Minimal two's complement content octets; zero is `[0x00]`
    pub fn to_signed_bytes_be(&self) -> Vec<u8> {
        if self.bytes.is_empty() {
            vec![0x00]
        } else {
            self.bytes.clone()
        }
    }

    /// Returns whether the number is zero.
    pub fn is_zero(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns whether the number is negative.
    pub fn is_negative(&self) -> bool {
        self.bytes.first().is_some_and(|b| b & 0x80 != 0)
    }

    /// Convert to `i128` if the value fits
    pub fn to_i128(&self) -> Option<i128> {
        if self.bytes.len() > 16 {
            return None;
        }
        let fill = if self.is_negative() { 0xFF } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - self.bytes.len()..].copy_from_slice(&self.bytes);
        Some(i128::from_be_bytes(buf))
    }

    /// Convert to `i64` if the value fits
    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|v| i64::try_from(v).ok())
    }
}

/// Strip redundant sign octets: the leftmost nine bits must not be all
/// zero or all one.
fn minimal(bytes: &[u8]) -> Vec<u8> {
    let mut start = 0;
    while start + 1 < bytes.len() {
        let redundant = match bytes[start] {
            0x00 => bytes[start + 1] & 0x80 == 0,
            0xFF => bytes[start + 1] & 0x80 != 0,
            _ => false,
        };
        if !redundant {
            break;
        }
        start += 1;
    }
    let rest = &bytes[start..];
    if rest == [0x00] {
        Vec::new()
    } else {
        rest.to_vec()
    }
}

impl From<i128> for Integer {
    fn from(value: i128) -> Self {
        Self::from_signed_bytes_be(&value.to_be_bytes())
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Self::from_signed_bytes_be(&value.to_be_bytes())
    }
}

impl From<u64> for Integer {
    fn from(value: u64) -> Self {
        Self::from_unsigned_bytes_be(&value.to_be_bytes())
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_i128() {
            Some(v) => write!(f, "{}", v),
            None => {
                f.write_str("0x")?;
                for b in &self.bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_minimal_form() {
        assert_eq!(Integer::from(0i64).to_signed_bytes_be(), vec![0x00]);
        assert_eq!(Integer::from(127i64).to_signed_bytes_be(), vec![0x7F]);
        assert_eq!(Integer::from(128i64).to_signed_bytes_be(), vec![0x00, 0x80]);
        assert_eq!(Integer::from(-1i64).to_signed_bytes_be(), vec![0xFF]);
        assert_eq!(Integer::from(-129i64).to_signed_bytes_be(), vec![0xFF, 0x7F]);
    }

    #[test]
    fn test_integer_strips_redundant_octets() {
        let int = Integer::from_signed_bytes_be(&[0x00, 0x00, 0x7F]);
        assert_eq!(int.to_i64(), Some(127));
        assert!(Integer::from_signed_bytes_be(&[]).is_zero());
        assert_eq!(Integer::from_signed_bytes_be(&[0x00, 0x00]), Integer::default());
    }

    #[test]
    fn test_integer_unsigned_magnitude() {
        let int = Integer::from(u64::MAX);
        assert!(!int.is_negative());
        assert_eq!(int.to_signed_bytes_be().len(), 9);
        assert_eq!(int.to_i128(), Some(u64::MAX as i128));
        assert_eq!(int.to_i64(), None);
    }

    #[test]
    fn test_integer_deserialize_normalizes() {
        use serde::de::value::{Error as ValueError, MapDeserializer};

        let redundant: &[u8] = &[0x00, 0x00];
        let map = MapDeserializer::<_, ValueError>::new(std::iter::once(("bytes", redundant)));
        let int = Integer::deserialize(map).unwrap();
        assert!(int.is_zero());
        assert_eq!(int, Integer::default());

        let padded: &[u8] = &[0xFF, 0xFF, 0x80];
        let map = MapDeserializer::<_, ValueError>::new(std::iter::once(("bytes", padded)));
        assert_eq!(Integer::deserialize(map).unwrap(), Integer::from(-128i64));
    }

    #[test]
    fn test_integer_display() {
        assert_eq!(Integer::from(-42i64).to_string(), "-42");
        let big = Integer::from_unsigned_bytes_be(&[0x7F; 20]);
        assert!(big.to_string().starts_with("0x7f7f"));
    }
}
