//! BER (Basic Encoding Rules) wire layer
//!
//! Each ASN.1 value is encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag Encoding
//!
//! - **Class** (2 bits): Universal (00), Application (01), Context-specific (10), Private (11)
//! - **Constructed/Primitive** (1 bit): 0 = Primitive, 1 = Constructed
//! - **Tag Number** (5 bits): 0-30, or 11111 followed by base-128 continuation bytes
//!
//! ## Length Encoding
//!
//! - **Short form**: one byte, lengths 0-127
//! - **Long form**: `0x80 | n`, then `n` big-endian bytes
//! - **Indefinite form**: `0x80`, content closed by `00 00` (BER only)
//!
//! This module only deals with the framing. Interpreting content bytes is
//! the job of the type-driven codec in the crate root.

pub mod raw;
pub mod types;

pub use raw::RawValue;
pub use types::{BerLength, BerTag, TagClass};
