use crate::error::{Asn1Error, Asn1Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

static DOTTED_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)*$").expect("valid OID pattern"));

/// ASN.1 OBJECT IDENTIFIER
///
/// An object identifier is a sequence of non-negative integers (arcs),
/// usually written in dotted form such as `1.2.840.113549`.
///
/// The empty identifier is representable: it is what an empty content
/// field decodes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    arcs: Vec<u64>,
}

impl Oid {
    /// Create an OID from its arcs
    pub fn new(arcs: impl Into<Vec<u64>>) -> Self {
        Self { arcs: arcs.into() }
    }

    /// Parse an OID from dotted form
    ///
    /// # Arguments
    ///
    /// * `s` - Dotted representation, e.g. `"2.5.4.3"`. The empty string
    ///   yields the empty OID.
    ///
    /// # Returns
    ///
    /// Returns `Err(Asn1Error::Syntax)` if the string is not a dotted list
    /// of decimal numbers or an arc does not fit in 64 bits.
    pub fn from_string(s: &str) -> Asn1Result<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        if !DOTTED_FORM.is_match(s) {
            return Err(Asn1Error::syntax(format!(
                "invalid object identifier: {:?}",
                s
            )));
        }

        let arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| {
                    Asn1Error::syntax(format!("object identifier arc out of range: {}", part))
                })
            })
            .collect::<Asn1Result<Vec<_>>>()?;

        Ok(Self { arcs })
    }

    /// Get the arcs
    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }
}

impl From<Vec<u64>> for Oid {
    fn from(arcs: Vec<u64>) -> Self {
        Self { arcs }
    }
}

impl<const N: usize> From<[u64; N]> for Oid {
    fn from(arcs: [u64; N]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }
}

impl FromStr for Oid {
    type Err = Asn1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Oid::from_string(&s).map_err(serde::de::Error::custom)
    }
}
