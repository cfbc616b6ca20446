//! ASN.1 value types with a reserved universal tag

pub mod integer;
pub mod null;
pub mod oid;

pub use integer::Integer;
pub use null::Null;
pub use oid::Oid;
