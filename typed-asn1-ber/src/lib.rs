//! Type-driven BER/DER codec
//!
//! Values are decoded into (and encoded from) ordinary Rust types. The
//! shape of the ASN.1 data is given by the type itself through the
//! [`Asn1`] trait, and by per-field directives on structs declared with
//! [`asn1_struct!`]:
//!
//! ```ignore
//! asn1_struct! {
//!     #[derive(Debug, Default)]
//!     pub struct Message {
//!         pub id: i64,
//!         #[asn1("tag:0,optional")]
//!         pub note: String,
//!     }
//! }
//!
//! let ctx = Context::new();
//! let (message, rest) = ctx.decode_value::<Message>(&data)?;
//! ```
//!
//! # Modules
//!
//! - [`ber`]: tag/length encoding and raw TLV triplets
//! - [`options`]: field directive parsing
//! - [`context`]: encoding rules, choice registry, entry points
//! - [`element`]: the [`Asn1`] trait and tag resolution
//! - [`primitive`]: BOOLEAN, INTEGER, OCTET STRING, OBJECT IDENTIFIER, NULL
//! - [`aggregate`]: SEQUENCE, SET, SEQUENCE OF, SET OF
//! - [`schema`]: struct schemas and the [`asn1_struct!`] macro
//! - [`choice`]: CHOICE values

pub mod aggregate;
pub mod ber;
pub mod choice;
pub mod config;
pub mod context;
pub mod element;
pub mod options;
pub mod primitive;
pub mod schema;

pub use ber::{BerLength, BerTag, RawValue, TagClass};
pub use choice::{Choice, ChoiceAlternative, ChoiceValue};
pub use config::ContextConfig;
pub use context::{ChoiceEntry, Context};
pub use element::{
    decode_element, encode_element, resolve, resolve_tag, Asn1, ElementTag, Resolved, Visited,
};
pub use options::FieldOptions;
pub use schema::{Asn1Struct, Field, Schema};
pub use typed_asn1_core::{tags, Asn1Error, Asn1Result, EncodingRules, Integer, Null, Oid};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}
