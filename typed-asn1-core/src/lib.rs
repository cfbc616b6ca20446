//! Core types for the typed ASN.1 codec
//!
//! This crate provides the error type, universal tag numbers, encoding
//! rule selection and the value types that have a fixed ASN.1 meaning
//! (OBJECT IDENTIFIER, NULL, arbitrary precision INTEGER).

pub mod datatypes;
pub mod error;
pub mod mode;
pub mod tags;

pub use datatypes::{Integer, Null, Oid};
pub use error::{Asn1Error, Asn1Result};
pub use mode::EncodingRules;
