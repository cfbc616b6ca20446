use thiserror::Error;

/// Main error type for ASN.1 encoding and decoding
///
/// Decoding failures fall into two categories:
/// - [`Asn1Error::Syntax`]: problems discoverable without looking at any
///   input byte (bad directive strings, invalid type/option combinations,
///   registry misuse)
/// - [`Asn1Error::Parse`]: everything that depends on the input bytes
///
/// Encoding a value that has no valid representation yields
/// [`Asn1Error::Encode`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    #[error("asn1: syntax error: {0}")]
    Syntax(String),

    #[error("asn1: parse error: {0}")]
    Parse(String),

    #[error("asn1: encoding error: {0}")]
    Encode(String),
}

impl Asn1Error {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Asn1Error::Syntax(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Asn1Error::Parse(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Asn1Error::Encode(msg.into())
    }

    /// Returns true for errors raised before any input byte was examined
    pub fn is_syntax(&self) -> bool {
        matches!(self, Asn1Error::Syntax(_))
    }

    /// Returns true for errors caused by the input bytes
    pub fn is_parse(&self) -> bool {
        matches!(self, Asn1Error::Parse(_))
    }

    pub fn is_encode(&self) -> bool {
        matches!(self, Asn1Error::Encode(_))
    }
}

/// Result type alias for ASN.1 operations
pub type Asn1Result<T> = Result<T, Asn1Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Asn1Error::parse("missing value for [universal 2]");
        assert_eq!(
            err.to_string(),
            "asn1: parse error: missing value for [universal 2]"
        );
        assert!(err.is_parse());
        assert!(!err.is_syntax());
    }

    #[test]
    fn test_error_categories() {
        assert!(Asn1Error::syntax("invalid option: foo").is_syntax());
        assert!(!Asn1Error::encode("bad oid").is_parse());
    }
}
