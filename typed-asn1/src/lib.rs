//! typed-asn1 - type-driven ASN.1 BER/DER codec
//!
//! Decode BER/DER bytes straight into Rust values, and encode them back,
//! with the ASN.1 structure described by the Rust types.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `typed-asn1-core`: error type, universal tags, encoding rules and the
//!   value types OBJECT IDENTIFIER, NULL and arbitrary precision INTEGER
//! - `typed-asn1-ber`: TLV reader/writer, tag resolution, the context with
//!   its choice registry, and the codecs for every supported type
//!
//! # Usage
//!
//! ```no_run
//! use typed_asn1::{asn1_struct, Choice, ChoiceAlternative, Context, Oid};
//!
//! asn1_struct! {
//!     #[derive(Debug, Default, Clone, PartialEq)]
//!     pub struct Attribute {
//!         pub kind: Oid,
//!         #[asn1("choice:value")]
//!         pub value: Choice,
//!     }
//! }
//!
//! # fn main() -> typed_asn1::Asn1Result<()> {
//! let mut ctx = Context::new();
//! ctx.add_choice("value", vec![
//!     ChoiceAlternative::of::<i64>("tag:0"),
//!     ChoiceAlternative::of::<String>("tag:1"),
//! ])?;
//!
//! let attribute = Attribute {
//!     kind: "2.5.4.3".parse()?,
//!     value: Choice::new(String::from("example")),
//! };
//! let encoded = ctx.encode(&attribute)?;
//! let (decoded, rest) = ctx.decode_value::<Attribute>(&encoded)?;
//! assert!(rest.is_empty());
//! assert_eq!(decoded, attribute);
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use typed_asn1_core::{tags, Asn1Error, Asn1Result, EncodingRules, Integer, Null, Oid};

// Re-export the codec
pub use typed_asn1_ber::{
    asn1_struct, Asn1, Asn1Struct, Choice, ChoiceAlternative, ChoiceValue, Context,
    ContextConfig, FieldOptions,
};

// Lower level building blocks
pub mod ber {
    pub use typed_asn1_ber::ber::*;
    pub use typed_asn1_ber::element::{
        decode_element, encode_element, resolve, resolve_tag, ElementTag, Resolved, Visited,
    };
    pub use typed_asn1_ber::schema::{Field, Schema};
}
