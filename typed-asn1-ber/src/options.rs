//! Per-field decode/encode directives
//!
//! Directives are written as a comma separated list of tokens:
//!
//! | token | meaning |
//! |---|---|
//! | `universal` | class of `tag:` is universal |
//! | `application` | class of `tag:` is application |
//! | `explicit` | wrap the element in an explicit `tag:` |
//! | `indefinite` | encode with indefinite length (BER only) |
//! | `optional` | the element may be absent |
//! | `set` | encode a SEQUENCE type as a SET |
//! | `tag:<n>` | override the tag number (context-specific by default) |
//! | `default:<n>` | integer value assumed when the element is absent |
//! | `choice:<name>` | resolve the element through a registered choice group |

use std::str::FromStr;
use typed_asn1_core::{Asn1Error, Asn1Result};

/// Parsed directives of one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub universal: bool,
    pub application: bool,
    pub explicit: bool,
    pub indefinite: bool,
    pub optional: bool,
    pub set: bool,
    pub tag: Option<u32>,
    pub default_value: Option<i64>,
    pub choice: Option<String>,
}

impl FieldOptions {
    /// Parse a directive string
    ///
    /// # Error Handling
    /// Returns `Asn1Error::Syntax` for unknown tokens, malformed numbers,
    /// repeated valued tokens and invalid combinations (see [`validate`]).
    ///
    /// [`validate`]: FieldOptions::validate
    pub fn parse(s: &str) -> Asn1Result<Self> {
        let mut opts = Self::default();
        if s.trim().is_empty() {
            return Ok(opts);
        }

        for token in s.split(',').map(str::trim) {
            match token {
                "universal" => opts.universal = true,
                "application" => opts.application = true,
                "explicit" => opts.explicit = true,
                "indefinite" => opts.indefinite = true,
                "optional" => opts.optional = true,
                "set" => opts.set = true,
                _ => opts.parse_valued(token)?,
            }
        }

        opts.validate()?;
        Ok(opts)
    }

    fn parse_valued(&mut self, token: &str) -> Asn1Result<()> {
        let Some((key, value)) = token.split_once(':') else {
            return Err(Asn1Error::syntax(format!("invalid option: {:?}", token)));
        };

        match key {
            "tag" => {
                let tag = value.parse::<u32>().map_err(|_| {
                    Asn1Error::syntax(format!("invalid tag number: {:?}", value))
                })?;
                if self.tag.replace(tag).is_some() {
                    return Err(Asn1Error::syntax("tag specified more than once"));
                }
            }
            "default" => {
                let default = value.parse::<i64>().map_err(|_| {
                    Asn1Error::syntax(format!("invalid default value: {:?}", value))
                })?;
                if self.default_value.replace(default).is_some() {
                    return Err(Asn1Error::syntax("default specified more than once"));
                }
            }
            "choice" => {
                if value.is_empty() {
                    return Err(Asn1Error::syntax("choice name must not be empty"));
                }
                if self.choice.replace(value.to_string()).is_some() {
                    return Err(Asn1Error::syntax("choice specified more than once"));
                }
            }
            _ => return Err(Asn1Error::syntax(format!("invalid option: {:?}", token))),
        }
        Ok(())
    }

    /// Check combinations of directives
    pub fn validate(&self) -> Asn1Result<()> {
        if self.universal && self.application {
            return Err(Asn1Error::syntax(
                "universal and application are mutually exclusive",
            ));
        }
        if (self.universal || self.application) && self.tag.is_none() {
            return Err(Asn1Error::syntax(
                "universal or application require a tag number",
            ));
        }
        if self.explicit && self.tag.is_none() {
            return Err(Asn1Error::syntax("explicit requires a tag number"));
        }
        Ok(())
    }

    /// Options for the inner element of an explicit tag
    ///
    /// The outer tag must not be applied again to the inner element, and
    /// an `indefinite` directive belongs to the outer wrapper.
    pub fn without_explicit(&self) -> Self {
        Self {
            universal: false,
            application: false,
            explicit: false,
            indefinite: false,
            tag: None,
            ..self.clone()
        }
    }
}

impl FromStr for FieldOptions {
    type Err = Asn1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
