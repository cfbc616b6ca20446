//! Identifier and length octets

use std::fmt;
use typed_asn1_core::{Asn1Error, Asn1Result};

/// Class bits of an identifier octet
///
/// The derived ordering (universal < application < context < private) is
/// the canonical order of SET members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagClass {
    /// `00`: types defined by X.680
    Universal = 0,
    /// `01`
    Application = 1,
    /// `10`: tags local to an enclosing SEQUENCE/SET/CHOICE
    ContextSpecific = 2,
    /// `11`
    Private = 3,
}

impl TagClass {
    /// Class from the two high bits of an identifier octet
    pub fn from_bits(octet: u8) -> Self {
        match octet >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    /// Class bits positioned for an identifier octet
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

impl fmt::Display for TagClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagClass::Universal => "universal",
            TagClass::Application => "application",
            TagClass::ContextSpecific => "context",
            TagClass::Private => "private",
        };
        f.write_str(name)
    }
}

/// Identifier octets: class, form and tag number
///
/// ```text
/// low tag number (0..=30):   CC F NNNNN
/// high tag number (>= 31):   CC F 11111  1NNNNNNN ... 0NNNNNNN
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BerTag {
    class: TagClass,
    constructed: bool,
    number: u32,
}

impl BerTag {
    pub fn new(class: TagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    pub fn universal(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Universal, constructed, number)
    }

    pub fn context_specific(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::ContextSpecific, constructed, number)
    }

    pub fn class(&self) -> TagClass {
        self.class
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Identifier octets of the tag
    pub fn encode(&self) -> Vec<u8> {
        let leading = self.class.to_bits() | if self.constructed { 0x20 } else { 0x00 };

        if self.number < 0x1F {
            return vec![leading | self.number as u8];
        }

        // base-128 groups, most significant first
        let significant_bits = 32 - self.number.leading_zeros() as usize;
        let groups = significant_bits.div_ceil(7);
        let mut out = Vec::with_capacity(groups + 1);
        out.push(leading | 0x1F);
        for index in (0..groups).rev() {
            let group = ((self.number >> (index * 7)) & 0x7F) as u8;
            out.push(if index == 0 { group } else { group | 0x80 });
        }
        out
    }

    /// Parse identifier octets
    ///
    /// # Returns
    /// Returns `Ok((BerTag, bytes_consumed))` if successful
    ///
    /// # Error Handling
    /// Returns a parse error if:
    /// - The buffer is empty or a high tag number is truncated
    /// - The tag number does not fit in 32 bits
    pub fn decode(data: &[u8]) -> Asn1Result<(Self, usize)> {
        let Some(&leading) = data.first() else {
            return Err(Asn1Error::parse("empty buffer for tag decoding"));
        };

        let class = TagClass::from_bits(leading);
        let constructed = leading & 0x20 != 0;

        if leading & 0x1F != 0x1F {
            return Ok((Self::new(class, constructed, u32::from(leading & 0x1F)), 1));
        }

        let mut number = 0u32;
        for (index, &octet) in data[1..].iter().enumerate() {
            if number > (u32::MAX >> 7) {
                return Err(Asn1Error::parse("tag number too large"));
            }
            number = (number << 7) | u32::from(octet & 0x7F);
            if octet & 0x80 == 0 {
                return Ok((Self::new(class, constructed, number), index + 2));
            }
        }

        Err(Asn1Error::parse("incomplete extended tag encoding"))
    }
}

/// Length octets
///
/// - `Short`: lengths below 128 in a single octet
/// - `Long`: `0x80 | n` followed by `n` big-endian octets
/// - `Indefinite`: `0x80`, the content ends with two zero octets
///   (constructed values only, not allowed in DER)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerLength {
    Short(u8),
    Long(usize),
    Indefinite,
}

impl BerLength {
    /// Definite length in its shortest form
    pub fn new(length: usize) -> Self {
        match u8::try_from(length) {
            Ok(short) if short < 0x80 => BerLength::Short(short),
            _ => BerLength::Long(length),
        }
    }

    /// Number of content octets, `None` for the indefinite form
    pub fn value(&self) -> Option<usize> {
        match *self {
            BerLength::Short(length) => Some(usize::from(length)),
            BerLength::Long(length) => Some(length),
            BerLength::Indefinite => None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            BerLength::Short(length) => vec![length],
            BerLength::Long(length) => {
                let octets = length.to_be_bytes();
                let skip = octets.iter().take_while(|&&b| b == 0).count();
                // zero still takes one octet
                let significant = &octets[skip.min(octets.len() - 1)..];
                let mut out = Vec::with_capacity(significant.len() + 1);
                out.push(0x80 | significant.len() as u8);
                out.extend_from_slice(significant);
                out
            }
            BerLength::Indefinite => vec![0x80],
        }
    }

    /// Parse length octets
    ///
    /// # Returns
    /// Returns `Ok((BerLength, bytes_consumed))` if successful
    ///
    /// # Error Handling
    /// Returns a parse error if:
    /// - The buffer is too short
    /// - The reserved octet `0xFF` is used
    /// - The long form uses more than 4 length octets
    pub fn decode(data: &[u8]) -> Asn1Result<(Self, usize)> {
        let Some(&leading) = data.first() else {
            return Err(Asn1Error::parse("empty buffer for length decoding"));
        };

        if leading < 0x80 {
            return Ok((BerLength::Short(leading), 1));
        }

        let count = usize::from(leading & 0x7F);
        match count {
            0 => return Ok((BerLength::Indefinite, 1)),
            0x7F => return Err(Asn1Error::parse("reserved length encoding 0xFF")),
            5.. => {
                return Err(Asn1Error::parse(format!(
                    "length encoding too large: {} bytes (max 4)",
                    count
                )));
            }
            _ => {}
        }

        let Some(octets) = data.get(1..=count) else {
            return Err(Asn1Error::parse(format!(
                "buffer too short for long form length: need {} bytes, got {}",
                count + 1,
                data.len()
            )));
        };

        let length = octets
            .iter()
            .fold(0usize, |length, &octet| (length << 8) | usize::from(octet));
        Ok((BerLength::Long(length), count + 1))
    }
}
