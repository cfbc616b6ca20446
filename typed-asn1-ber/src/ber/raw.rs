//! Raw tag-length-value triplets
//!
//! A [`RawValue`] is one parsed TLV with its content bytes left
//! uninterpreted. The reader is independent of the encoding rules: it
//! accepts indefinite lengths and leaves their rejection to the caller.

use crate::ber::types::{BerLength, BerTag, TagClass};
use typed_asn1_core::{Asn1Error, Asn1Result};

/// Nesting limit for walking indefinite length content
const MAX_INDEFINITE_DEPTH: usize = 64;

/// Nesting limit for decoding constructed values into typed targets
pub(crate) const MAX_NESTING_DEPTH: usize = 64;

/// A single parsed TLV triplet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub class: TagClass,
    pub tag: u32,
    pub constructed: bool,
    pub indefinite: bool,
    pub content: Vec<u8>,
    /// Number of constructed values enclosing this one
    pub(crate) depth: usize,
}

impl RawValue {
    pub fn new(class: TagClass, tag: u32, constructed: bool, content: Vec<u8>) -> Self {
        Self {
            class,
            tag,
            constructed,
            indefinite: false,
            content,
            depth: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Read one TLV from the start of `input`
    ///
    /// # Returns
    /// Returns the raw value and the number of bytes consumed, including
    /// the end-of-contents marker of an indefinite length value.
    ///
    /// # Error Handling
    /// Returns a parse error if:
    /// - The tag or length encoding is malformed
    /// - The declared length exceeds the remaining bytes
    /// - An indefinite length is used on a primitive value
    /// - The end-of-contents marker is missing
    pub fn read(input: &[u8]) -> Asn1Result<(Self, usize)> {
        Self::read_nested(input, 0)
    }

    fn read_nested(input: &[u8], depth: usize) -> Asn1Result<(Self, usize)> {
        let (tag, tag_len) = BerTag::decode(input)?;
        let (length, length_len) = BerLength::decode(&input[tag_len..])?;
        let start = tag_len + length_len;

        match length.value() {
            Some(len) => {
                let available = input.len() - start;
                if len > available {
                    return Err(Asn1Error::parse(format!(
                        "length {} exceeds remaining {} bytes",
                        len, available
                    )));
                }
                let value = Self::new(
                    tag.class(),
                    tag.number(),
                    tag.is_constructed(),
                    input[start..start + len].to_vec(),
                );
                Ok((value, start + len))
            }
            None => {
                if !tag.is_constructed() {
                    return Err(Asn1Error::parse(
                        "indefinite length on a primitive value",
                    ));
                }
                if depth >= MAX_INDEFINITE_DEPTH {
                    return Err(Asn1Error::parse("indefinite length nesting too deep"));
                }

                let mut pos = start;
                loop {
                    let rest = &input[pos..];
                    if rest.starts_with(&[0x00, 0x00]) {
                        break;
                    }
                    if rest.is_empty() {
                        return Err(Asn1Error::parse("missing end-of-contents marker"));
                    }
                    let (_, used) = Self::read_nested(rest, depth + 1)?;
                    pos += used;
                }

                let value = Self {
                    class: tag.class(),
                    tag: tag.number(),
                    constructed: true,
                    indefinite: true,
                    content: input[start..pos].to_vec(),
                    depth: 0,
                };
                Ok((value, pos + 2))
            }
        }
    }

    /// Split a buffer into consecutive raw values
    pub fn read_all(mut input: &[u8]) -> Asn1Result<Vec<Self>> {
        let mut values = Vec::new();
        while !input.is_empty() {
            let (value, used) = Self::read(input)?;
            values.push(value);
            input = &input[used..];
        }
        Ok(values)
    }

    /// Encode the triplet
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.content.len() + 8);
        self.write_to(&mut out);
        out
    }

    /// Append the encoded triplet to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&BerTag::new(self.class, self.constructed, self.tag).encode());
        if self.indefinite {
            out.extend_from_slice(&BerLength::Indefinite.encode());
            out.extend_from_slice(&self.content);
            out.extend_from_slice(&[0x00, 0x00]);
        } else {
            out.extend_from_slice(&BerLength::new(self.content.len()).encode());
            out.extend_from_slice(&self.content);
        }
    }

    /// `[class tag]` label used in error messages
    pub fn label(&self) -> String {
        tag_label(self.class, self.tag)
    }
}

pub(crate) fn tag_label(class: TagClass, tag: u32) -> String {
    format!("[{} {}]", class, tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_definite() {
        let data = [0x02, 0x01, 0x05, 0xFF];
        let (raw, used) = RawValue::read(&data).unwrap();
        assert_eq!(used, 3);
        assert_eq!(raw.class, TagClass::Universal);
        assert_eq!(raw.tag, 2);
        assert!(!raw.constructed);
        assert!(!raw.indefinite);
        assert_eq!(raw.content, vec![0x05]);
    }

    #[test]
    fn test_read_length_exceeds_input() {
        let err = RawValue::read(&[0x04, 0x05, 0x01, 0x02]).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_read_indefinite() {
        // SEQUENCE (indefinite) { INTEGER 1, SEQUENCE (indefinite) { NULL } }
        let data = [
            0x30, 0x80, 0x02, 0x01, 0x01, 0x30, 0x80, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0xAA,
        ];
        let (raw, used) = RawValue::read(&data).unwrap();
        assert_eq!(used, 13);
        assert!(raw.indefinite);
        assert_eq!(
            raw.content,
            vec![0x02, 0x01, 0x01, 0x30, 0x80, 0x05, 0x00, 0x00, 0x00]
        );
        assert_eq!(raw.to_bytes(), data[..13].to_vec());
    }

    #[test]
    fn test_read_indefinite_errors() {
        assert!(RawValue::read(&[0x04, 0x80, 0x00, 0x00]).is_err());
        assert!(RawValue::read(&[0x30, 0x80, 0x02, 0x01, 0x01]).is_err());
    }

    #[test]
    fn test_read_all() {
        let values = RawValue::read_all(&[0x01, 0x01, 0xFF, 0x05, 0x00]).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].tag, 5);
        assert!(RawValue::read_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_write_long_content() {
        let raw = RawValue::new(TagClass::ContextSpecific, 31, false, vec![0xAB; 200]);
        let bytes = raw.to_bytes();
        assert_eq!(&bytes[..4], &[0x9F, 0x1F, 0x81, 200]);
        let (decoded, used) = RawValue::read(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(decoded, raw);
    }
}
